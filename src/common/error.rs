use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// SQLSTATE do Postgres para "insufficient_privilege"
const PG_INSUFFICIENT_PRIVILEGE: &str = "42501";

// Nosso tipo de erro de domínio, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // --- Regras de negócio (sempre antes de qualquer escrita) ---
    #[error("Classificação desbalanceada: {classified} de {expected}")]
    UnbalancedClassification { classified: i32, expected: i32 },

    #[error("Quantidade classificada negativa")]
    NegativeClassification,

    #[error("Motivo de rejeição vazio")]
    RejectionReasonRequired,

    #[error("Data do agendamento no passado")]
    ScheduleDateInPast,

    #[error("Agendamento encerrado")]
    ScheduleClosed,

    #[error("Estoque insuficiente: {available} disponível, {requested} solicitado")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("Índice de atividade inválido: {0}")]
    ActivityIndexOutOfRange(usize),

    #[error("Transferência para o mesmo armazém")]
    SameWarehouseTransfer,

    #[error("Transferência sem armazéns")]
    TransferWarehousesRequired,

    #[error("Transferência não está pendente")]
    TransferNotDispatchable,

    #[error("Movimentação não é transferência")]
    NotATransfer,

    // --- Não encontrados ---
    #[error("Agendamento não encontrado")]
    ScheduleNotFound,

    #[error("Movimentação não encontrada")]
    MovementNotFound,

    #[error("Produto não encontrado")]
    ProductNotFound,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Contagem não encontrada")]
    CountNotFound,

    // --- Conflitos ---
    #[error("Versão desatualizada")]
    StaleVersion,

    #[error("Movimentação já resolvida")]
    MovementAlreadyResolved,

    #[error("Transferência já resolvida")]
    TransferAlreadyResolved,

    #[error("Código de agendamento já existe: {0}")]
    ScheduleCodeAlreadyExists(String),

    #[error("SKU já existe no armazém")]
    SkuAlreadyExists,

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    // --- Autenticação / autorização ---
    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário inativo")]
    InactiveUser,

    #[error("Permissão ausente: {0}")]
    Forbidden(&'static str),

    // O banco recusou a escrita. Nunca é mascarado como sucesso.
    #[error("Permissão negada pelo banco de dados")]
    PermissionDenied,

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some(PG_INSUFFICIENT_PRIVILEGE) {
                return AppError::PermissionDenied;
            }
        }
        AppError::DatabaseError(e)
    }
}

/// Erro já pronto para virar resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    /// Erro de validação de um único campo, no mesmo formato do `validator`.
    pub fn invalid_field(field: &'static str, code: &'static str, message: &'static str) -> Self {
        let mut err = validator::ValidationError::new(code);
        err.message = Some(message.into());
        let mut errors = validator::ValidationErrors::new();
        errors.add(field, err);
        AppError::ValidationError(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::UnbalancedClassification { .. }
            | AppError::NegativeClassification
            | AppError::RejectionReasonRequired
            | AppError::ScheduleDateInPast
            | AppError::InsufficientStock { .. }
            | AppError::ActivityIndexOutOfRange(_)
            | AppError::SameWarehouseTransfer
            | AppError::TransferWarehousesRequired
            | AppError::NotATransfer => StatusCode::UNPROCESSABLE_ENTITY,

            AppError::ScheduleNotFound
            | AppError::MovementNotFound
            | AppError::ProductNotFound
            | AppError::UserNotFound
            | AppError::CountNotFound => StatusCode::NOT_FOUND,

            AppError::StaleVersion
            | AppError::ScheduleClosed
            | AppError::TransferNotDispatchable
            | AppError::MovementAlreadyResolved
            | AppError::TransferAlreadyResolved
            | AppError::ScheduleCodeAlreadyExists(_)
            | AppError::SkuAlreadyExists
            | AppError::EmailAlreadyExists => StatusCode::CONFLICT,

            AppError::InvalidCredentials | AppError::InvalidToken | AppError::InactiveUser => {
                StatusCode::UNAUTHORIZED
            }

            AppError::Forbidden(_) | AppError::PermissionDenied => StatusCode::FORBIDDEN,

            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Chave do catálogo de mensagens + argumentos de substituição.
    fn message(&self) -> (&'static str, Vec<(&'static str, String)>) {
        match self {
            AppError::ValidationError(_) => ("validation.invalid_fields", vec![]),
            AppError::UnbalancedClassification { classified, expected } => (
                "classification.unbalanced",
                vec![("classified", classified.to_string()), ("expected", expected.to_string())],
            ),
            AppError::NegativeClassification => ("classification.negative", vec![]),
            AppError::RejectionReasonRequired => ("rejection.reason_required", vec![]),
            AppError::ScheduleDateInPast => ("schedule.date_in_past", vec![]),
            AppError::ScheduleClosed => ("schedule.closed", vec![]),
            AppError::InsufficientStock { available, requested } => (
                "stock.insufficient",
                vec![("available", available.to_string()), ("requested", requested.to_string())],
            ),
            AppError::ActivityIndexOutOfRange(index) => {
                ("activity.index_out_of_range", vec![("index", index.to_string())])
            }
            AppError::SameWarehouseTransfer => ("transfer.same_warehouse", vec![]),
            AppError::TransferWarehousesRequired => ("transfer.warehouses_required", vec![]),
            AppError::TransferNotDispatchable => ("transfer.not_dispatchable", vec![]),
            AppError::NotATransfer => ("movement.not_a_transfer", vec![]),
            AppError::ScheduleNotFound => ("schedule.not_found", vec![]),
            AppError::MovementNotFound => ("movement.not_found", vec![]),
            AppError::ProductNotFound => ("product.not_found", vec![]),
            AppError::UserNotFound => ("user.not_found", vec![]),
            AppError::CountNotFound => ("count.not_found", vec![]),
            AppError::StaleVersion => ("conflict.stale_version", vec![]),
            AppError::MovementAlreadyResolved => ("movement.already_resolved", vec![]),
            AppError::TransferAlreadyResolved => ("transfer.already_resolved", vec![]),
            AppError::ScheduleCodeAlreadyExists(code) => {
                ("schedule.code_exists", vec![("code", code.clone())])
            }
            AppError::SkuAlreadyExists => ("product.sku_exists", vec![]),
            AppError::EmailAlreadyExists => ("user.email_exists", vec![]),
            AppError::InvalidCredentials => ("auth.invalid_credentials", vec![]),
            AppError::InvalidToken => ("auth.invalid_token", vec![]),
            AppError::InactiveUser => ("auth.inactive_user", vec![]),
            AppError::Forbidden(permission) => {
                ("auth.forbidden", vec![("permission", permission.to_string())])
            }
            AppError::PermissionDenied => ("store.permission_denied", vec![]),
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => ("internal", vec![]),
        }
    }

    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let status = self.status();

        match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Erro Interno do Servidor: {}", self);
            }
            StatusCode::FORBIDDEN if matches!(self, AppError::PermissionDenied) => {
                tracing::warn!("Escrita recusada pelo banco de dados: {}", self);
            }
            _ => {}
        }

        let (key, args) = self.message();
        let error = i18n.translate(&locale.0, key, &args);

        // Retorna todos os detalhes da validação, campo a campo.
        let details = match self {
            AppError::ValidationError(errors) => {
                let mut fields = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    fields.insert(field.to_string(), json!(messages));
                }
                Some(serde_json::Value::Object(fields))
            }
            _ => None,
        };

        ApiError { status, error, details }
    }
}
