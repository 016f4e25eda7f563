// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{AuthResponse, Claims, User},
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    token_ttl: Duration,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, token_ttl_days: i64, pool: PgPool) -> Self {
        Self {
            user_repo,
            jwt_secret,
            token_ttl: Duration::days(token_ttl_days),
            pool,
        }
    }

    /// Hash bcrypt fora do runtime assíncrono.
    pub async fn hash_password(password: &str) -> Result<String, AppError> {
        let password_clone = password.to_owned();
        let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
        Ok(hashed)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }
        // Senha certa, mas conta desativada
        if !user.is_active {
            return Err(AppError::InactiveUser);
        }

        self.user_repo.touch_last_login(&self.pool, user.id).await?;
        tracing::info!("Login do usuário {}", user.id);

        let token = create_token(&self.jwt_secret, user.id, Utc::now(), self.token_ttl)?;
        let user = User { last_login: Some(Utc::now()), ..user };
        Ok(AuthResponse { token, user })
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = decode_token(&self.jwt_secret, token)?;

        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if !user.is_active {
            return Err(AppError::InactiveUser);
        }
        Ok(user)
    }
}

fn create_token(secret: &str, user_id: Uuid, now: DateTime<Utc>, ttl: Duration) -> Result<String, AppError> {
    let expires_at = now + ttl;

    let claims = Claims {
        sub: user_id,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_subject() {
        let id = Uuid::new_v4();
        let token = create_token("segredo", id, Utc::now(), Duration::days(7)).unwrap();
        let claims = decode_token("segredo", &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn wrong_secret_or_expired_token_is_invalid() {
        let id = Uuid::new_v4();
        let token = create_token("segredo", id, Utc::now(), Duration::days(7)).unwrap();
        assert!(matches!(decode_token("outro", &token), Err(AppError::InvalidToken)));

        let old = create_token("segredo", id, Utc::now() - Duration::days(10), Duration::days(7)).unwrap();
        assert!(matches!(decode_token("segredo", &old), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn hashed_password_verifies() {
        let hashed = AuthService::hash_password("senha123").await.unwrap();
        assert!(verify("senha123", &hashed).unwrap());
        assert!(!verify("senha124", &hashed).unwrap());
    }
}
