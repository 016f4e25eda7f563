// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::UserRole,
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
    /// Papéis que têm a permissão.
    fn roles() -> &'static [UserRole];

    fn allows(role: UserRole) -> bool {
        Self::roles().contains(&role)
    }
}

/// 2. O Extractor (Guardião)
pub struct RequirePermission<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers);

        // A. Extrai Usuário
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        // B. Confere o papel
        if !T::allows(user.0.role) {
            tracing::warn!("Usuário {} sem a permissão '{}'", user.0.id, T::slug());
            return Err(AppError::Forbidden(T::slug()).to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

use UserRole::{Admin, Manager, Operator};

pub struct PermSchedulesWrite;
impl PermissionDef for PermSchedulesWrite {
    fn slug() -> &'static str { "schedules:write" }
    fn roles() -> &'static [UserRole] { &[Admin, Manager] }
}

pub struct PermSchedulesExecute;
impl PermissionDef for PermSchedulesExecute {
    fn slug() -> &'static str { "schedules:execute" }
    fn roles() -> &'static [UserRole] { &[Admin, Manager, Operator] }
}

pub struct PermMovementsWrite;
impl PermissionDef for PermMovementsWrite {
    fn slug() -> &'static str { "movements:write" }
    fn roles() -> &'static [UserRole] { &[Admin, Manager, Operator] }
}

pub struct PermMovementsApprove;
impl PermissionDef for PermMovementsApprove {
    fn slug() -> &'static str { "movements:approve" }
    fn roles() -> &'static [UserRole] { &[Admin] }
}

pub struct PermProductsWrite;
impl PermissionDef for PermProductsWrite {
    fn slug() -> &'static str { "products:write" }
    fn roles() -> &'static [UserRole] { &[Admin, Manager] }
}

pub struct PermUsersManage;
impl PermissionDef for PermUsersManage {
    fn slug() -> &'static str { "users:manage" }
    fn roles() -> &'static [UserRole] { &[Admin] }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_has_no_write_permission() {
        assert!(!PermSchedulesWrite::allows(UserRole::Viewer));
        assert!(!PermSchedulesExecute::allows(UserRole::Viewer));
        assert!(!PermMovementsWrite::allows(UserRole::Viewer));
        assert!(!PermProductsWrite::allows(UserRole::Viewer));
    }

    #[test]
    fn only_admin_approves_and_manages_users() {
        for role in [UserRole::Manager, UserRole::Operator, UserRole::Viewer] {
            assert!(!PermMovementsApprove::allows(role));
            assert!(!PermUsersManage::allows(role));
        }
        assert!(PermMovementsApprove::allows(UserRole::Admin));
    }

    #[test]
    fn operator_executes_but_does_not_plan() {
        assert!(PermSchedulesExecute::allows(UserRole::Operator));
        assert!(PermMovementsWrite::allows(UserRole::Operator));
        assert!(!PermSchedulesWrite::allows(UserRole::Operator));
    }
}
