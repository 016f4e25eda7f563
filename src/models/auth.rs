// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use utoipa::ToSchema;

// --- Papéis (admin > manager > operator > viewer) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    Operator,
    Viewer,
}

/// Páginas que o front-end libera para o usuário.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageAccess {
    pub dashboard: bool,
    pub products: bool,
    pub movements: bool,
    pub loans: bool,
    pub inventory_scheduling: bool,
    pub operator: bool,
    pub users: bool,
    pub suppliers: bool,
    pub settings: bool,
    pub reports: bool,
}

impl PageAccess {
    /// Acesso padrão de cada papel, usado quando o admin não define um explicitamente.
    pub fn for_role(role: UserRole) -> Self {
        match role {
            UserRole::Admin => Self {
                dashboard: true,
                products: true,
                movements: true,
                loans: true,
                inventory_scheduling: true,
                operator: true,
                users: true,
                suppliers: true,
                settings: true,
                reports: true,
            },
            UserRole::Manager => Self {
                dashboard: true,
                products: true,
                movements: true,
                loans: true,
                inventory_scheduling: true,
                operator: true,
                users: false,
                suppliers: true,
                settings: false,
                reports: true,
            },
            UserRole::Operator | UserRole::Viewer => Self {
                dashboard: false,
                products: true,
                movements: true,
                loans: true,
                inventory_scheduling: true,
                operator: true,
                users: false,
                suppliers: false,
                settings: false,
                reports: false,
            },
        }
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "Maria Silva")]
    pub name: String,
    #[schema(example = "maria@almoxarifado.com")]
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    pub role: UserRole,
    pub is_active: bool,
    #[sqlx(json)]
    pub page_access: PageAccess,
    pub last_login: Option<DateTime<Utc>>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "maria@almoxarifado.com")]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// Cadastro feito por um administrador
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    pub role: UserRole,
    pub page_access: Option<PageAccess>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub page_access: Option<PageAccess>,
    /// Versão lida pelo cliente; a gravação falha se outra edição chegou antes.
    pub version: i32,
}

/// Entrada do diretório de nomes.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserName {
    pub id: Uuid,
    #[schema(example = "Maria Silva")]
    pub name: String,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_cannot_reach_user_or_settings_pages() {
        let access = PageAccess::for_role(UserRole::Manager);
        assert!(access.reports);
        assert!(!access.users);
        assert!(!access.settings);
    }

    #[test]
    fn operator_and_viewer_share_the_same_defaults() {
        assert_eq!(
            PageAccess::for_role(UserRole::Operator),
            PageAccess::for_role(UserRole::Viewer)
        );
        assert!(!PageAccess::for_role(UserRole::Viewer).dashboard);
    }

    #[test]
    fn page_access_serializes_in_camel_case() {
        let json = serde_json::to_value(PageAccess::for_role(UserRole::Admin)).unwrap();
        assert_eq!(json["inventoryScheduling"], true);
    }
}
