// src/services/user_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_audited, error::AppError},
    db::UserRepository,
    models::auth::{PageAccess, User, UserRole},
    services::{auth::AuthService, user_directory::UserDirectory},
};

/// Campos alteráveis de um usuário. `None` mantém o valor atual.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub page_access: Option<PageAccess>,
}

impl UserChanges {
    fn apply(self, mut user: User) -> User {
        if let Some(name) = self.name {
            user.name = name.trim().to_string();
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(active) = self.is_active {
            user.is_active = active;
        }
        if let Some(access) = self.page_access {
            user.page_access = access;
        }
        user
    }
}

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    directory: UserDirectory,
    pool: PgPool,
}

impl UserService {
    pub fn new(user_repo: UserRepository, directory: UserDirectory, pool: PgPool) -> Self {
        Self { user_repo, directory, pool }
    }

    pub async fn create_user(
        &self,
        actor: Uuid,
        name: &str,
        email: &str,
        password: &str,
        role: UserRole,
        page_access: Option<PageAccess>,
    ) -> Result<User, AppError> {
        let hashed = AuthService::hash_password(password).await?;
        let access = page_access.unwrap_or_else(|| PageAccess::for_role(role));

        let mut tx = begin_audited(&self.pool, actor).await?;
        let user = self
            .user_repo
            .create(&mut *tx, name.trim(), email.trim(), &hashed, role, access)
            .await?;
        tx.commit().await?;

        self.directory.invalidate().await;
        tracing::info!("Usuário {} criado por {}", user.id, actor);
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.user_repo.list().await
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User, AppError> {
        self.user_repo.find_by_id(id).await?.ok_or(AppError::UserNotFound)
    }

    pub async fn update_user(
        &self,
        actor: Uuid,
        id: Uuid,
        version: i32,
        changes: UserChanges,
    ) -> Result<User, AppError> {
        let current = self.get_user(id).await?;
        if current.version != version {
            return Err(AppError::StaleVersion);
        }
        let desired = changes.apply(current);

        let mut tx = begin_audited(&self.pool, actor).await?;
        let updated = self
            .user_repo
            .update(&mut *tx, &desired)
            .await?
            .ok_or(AppError::StaleVersion)?;
        tx.commit().await?;

        self.directory.invalidate().await;
        tracing::info!("Usuário {} atualizado por {}", id, actor);
        Ok(updated)
    }

    /// Diretório atualizado, recarregando do banco se venceu.
    pub async fn directory(&self) -> Result<&UserDirectory, AppError> {
        let repo = self.user_repo.clone();
        self.directory
            .ensure_fresh(|| async move { repo.list_names().await })
            .await?;
        Ok(&self.directory)
    }
}
