// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{MovementRepository, ProductRepository, ScheduleRepository, UserRepository},
    services::{
        auth::AuthService, movement_service::MovementService, product_service::ProductService,
        schedule_service::ScheduleService, user_directory::UserDirectory, user_service::UserService,
    },
};

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub user_name_cache_ttl: Duration,
    pub jwt_ttl_days: i64,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{} deve ser definida", key))
}

fn optional<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} tem valor inválido: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            server_addr: optional("SERVER_ADDR", "0.0.0.0:3000".to_string())?,
            db_max_connections: optional("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(optional("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            user_name_cache_ttl: Duration::from_secs(optional("USER_NAME_CACHE_TTL_SECS", 300)?),
            jwt_ttl_days: optional("JWT_TTL_DAYS", 7)?,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub i18n_store: Arc<I18nStore>,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub product_service: ProductService,
    pub schedule_service: ScheduleService,
    pub movement_service: MovementService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let i18n_store = Arc::new(I18nStore::load()?);

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let product_repo = ProductRepository::new(db_pool.clone());
        let schedule_repo = ScheduleRepository::new(db_pool.clone());
        let movement_repo = MovementRepository::new(db_pool.clone());

        let directory = UserDirectory::new(config.user_name_cache_ttl);

        let auth_service = AuthService::new(
            user_repo.clone(),
            config.jwt_secret.clone(),
            config.jwt_ttl_days,
            db_pool.clone(),
        );
        let user_service = UserService::new(user_repo, directory, db_pool.clone());
        let product_service = ProductService::new(product_repo.clone(), db_pool.clone());
        let schedule_service = ScheduleService::new(
            schedule_repo,
            product_repo.clone(),
            user_service.clone(),
            db_pool.clone(),
        );
        let movement_service = MovementService::new(
            movement_repo,
            product_repo,
            user_service.clone(),
            db_pool.clone(),
        );

        Ok(Self {
            db_pool,
            config: Arc::new(config),
            i18n_store,
            auth_service,
            user_service,
            product_service,
            schedule_service,
            movement_service,
        })
    }
}
