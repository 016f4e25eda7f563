// src/db/user_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{PageAccess, User, UserRole},
};

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu e-mail
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Pares (id, nome) para o diretório de nomes.
    pub async fn list_names(&self) -> Result<Vec<(Uuid, String)>, AppError> {
        let names = sqlx::query_as::<_, (Uuid, String)>("SELECT id, name FROM users")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    // Cria um novo usuário.
    // Com tratamento de erro específico para e-mails duplicados.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        name: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
        page_access: PageAccess,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, role, page_access)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(Json(page_access))
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
                    return AppError::EmailAlreadyExists;
                }
            }
            e.into()
        })
    }

    /// Grava nome, papel, situação e páginas se a versão ainda for a lida.
    /// `None` = alguém alterou antes (ou o usuário sumiu).
    pub async fn update<'e, E>(&self, executor: E, user: &User) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $3, role = $4, is_active = $5, page_access = $6,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(user.version)
        .bind(&user.name)
        .bind(user.role)
        .bind(user.is_active)
        .bind(Json(user.page_access))
        .fetch_optional(executor)
        .await?;
        Ok(updated)
    }

    pub async fn touch_last_login<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
