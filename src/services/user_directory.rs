// src/services/user_directory.rs

use std::{
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::common::error::AppError;

pub const UNKNOWN_USER: &str = "Usuário desconhecido";

/// Diretório id -> nome dos usuários, com validade.
///
/// Uma única fonte de nomes para todas as telas. Recarregado quando vence
/// ou quando alguém chama `invalidate` (usuário criado ou alterado).
#[derive(Clone)]
pub struct UserDirectory {
    names: Arc<DashMap<Uuid, String>>,
    loaded_at: Arc<Mutex<Option<Instant>>>,
    ttl: Duration,
}

impl UserDirectory {
    pub fn new(ttl: Duration) -> Self {
        Self {
            names: Arc::new(DashMap::new()),
            loaded_at: Arc::new(Mutex::new(None)),
            ttl,
        }
    }

    /// Recarrega com `load` se vencido. Carregamentos concorrentes esperam o
    /// primeiro terminar em vez de ir todos ao banco.
    pub async fn ensure_fresh<F, Fut>(&self, load: F) -> Result<(), AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<(Uuid, String)>, AppError>>,
    {
        let mut loaded_at = self.loaded_at.lock().await;
        if loaded_at.is_some_and(|at| at.elapsed() < self.ttl) {
            return Ok(());
        }

        let entries = load().await?;
        self.names.clear();
        for (id, name) in entries {
            self.names.insert(id, name);
        }
        *loaded_at = Some(Instant::now());
        tracing::debug!("Diretório de usuários recarregado ({} nomes)", self.names.len());
        Ok(())
    }

    pub async fn invalidate(&self) {
        *self.loaded_at.lock().await = None;
    }

    /// Nome conhecido, `Usuário {id}` para id desconhecido, ou
    /// `Usuário desconhecido` quando não há id.
    pub fn name_of(&self, id: Option<Uuid>) -> String {
        match id {
            Some(id) => self
                .names
                .get(&id)
                .map(|name| name.value().clone())
                .unwrap_or_else(|| format!("Usuário {}", id)),
            None => UNKNOWN_USER.to_string(),
        }
    }

    pub fn entries(&self) -> Vec<(Uuid, String)> {
        self.names.iter().map(|e| (*e.key(), e.value().clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn lookup_contract() {
        let dir = UserDirectory::new(Duration::from_secs(60));
        let ana = Uuid::new_v4();
        dir.ensure_fresh(|| async move { Ok(vec![(ana, "Ana Souza".to_string())]) })
            .await
            .unwrap();

        let stranger = Uuid::new_v4();
        assert_eq!(dir.name_of(Some(ana)), "Ana Souza");
        assert_eq!(dir.name_of(Some(stranger)), format!("Usuário {}", stranger));
        assert_eq!(dir.name_of(None), "Usuário desconhecido");
    }

    #[tokio::test]
    async fn loads_once_until_invalidated() {
        let dir = UserDirectory::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            dir.ensure_fresh(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![])
            })
            .await
            .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        dir.invalidate().await;
        let id = Uuid::new_v4();
        dir.ensure_fresh(|| async move { Ok(vec![(id, "Bruno".to_string())]) })
            .await
            .unwrap();
        assert_eq!(dir.name_of(Some(id)), "Bruno");
    }

    #[tokio::test]
    async fn zero_ttl_always_reloads_and_drops_removed_users() {
        let dir = UserDirectory::new(Duration::ZERO);
        let id = Uuid::new_v4();

        dir.ensure_fresh(|| async move { Ok(vec![(id, "Carla".to_string())]) })
            .await
            .unwrap();
        dir.ensure_fresh(|| async { Ok(vec![]) }).await.unwrap();

        assert!(dir.entries().is_empty());
        assert_eq!(dir.name_of(Some(id)), format!("Usuário {}", id));
    }

    #[tokio::test]
    async fn failed_load_keeps_cache_stale() {
        let dir = UserDirectory::new(Duration::from_secs(60));
        let err = dir
            .ensure_fresh(|| async { Err(AppError::InternalServerError(anyhow::anyhow!("fora do ar"))) })
            .await;
        assert!(err.is_err());

        let id = Uuid::new_v4();
        dir.ensure_fresh(|| async move { Ok(vec![(id, "Davi".to_string())]) })
            .await
            .unwrap();
        assert_eq!(dir.name_of(Some(id)), "Davi");
    }
}
