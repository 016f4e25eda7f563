// src/handlers/movements.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::products::{validate_not_blank, validate_not_negative},
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermMovementsApprove, PermMovementsWrite, RequirePermission},
    },
    models::movement::{
        ApprovalStatus, ClassificationChange, ClassificationInput, ClassificationPreview,
        MovementDetails, MovementType, StockMovement,
    },
    services::{classification, movement_service::MovementRequest},
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovementPayload {
    #[serde(rename = "type")]
    pub movement_type: MovementType,

    pub product_id: Uuid,

    #[validate(range(min = 1, message = "A quantidade deve ser maior que zero."))]
    pub quantity: i32,

    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "Compra")]
    pub reason: String,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,

    pub notes: Option<String>,
    pub batch: Option<String>,
    pub obra: Option<String>,
    pub nota_fiscal: Option<String>,

    #[serde(default)]
    pub attachments: Vec<String>,

    // Só para transferências
    pub from_warehouse: Option<String>,
    pub to_warehouse: Option<String>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub transport_notes: Option<String>,
}

impl From<CreateMovementPayload> for MovementRequest {
    fn from(p: CreateMovementPayload) -> Self {
        MovementRequest {
            movement_type: p.movement_type,
            product_id: p.product_id,
            quantity: p.quantity,
            reason: p.reason,
            price: p.price,
            notes: p.notes,
            batch: p.batch,
            obra: p.obra,
            nota_fiscal: p.nota_fiscal,
            attachments: p.attachments,
            from_warehouse: p.from_warehouse,
            to_warehouse: p.to_warehouse,
            expected_delivery_date: p.expected_delivery_date,
            transport_notes: p.transport_notes,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MovementFilter {
    /// pending | approved | rejected
    pub status: Option<ApprovalStatus>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveMovementPayload {
    #[serde(default)]
    #[validate(range(min = 0, message = "A quantidade de reemprego não pode ser negativa."))]
    pub reemprego_quantity: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "A quantidade de sucata não pode ser negativa."))]
    pub sucata_quantity: i32,
    pub reemprego_notes: Option<String>,
    pub sucata_notes: Option<String>,
    pub notes: Option<String>,
    pub version: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectMovementPayload {
    #[validate(custom(function = "validate_not_blank"))]
    pub notes: String,
    pub version: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPayload {
    #[validate(range(min = 0, message = "A quantidade não pode ser negativa."))]
    pub quantity: i32,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub reemprego: i32,
    #[serde(default)]
    pub sucata: i32,
    pub change: Option<ClassificationChange>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferActionPayload {
    pub notes: Option<String>,
    pub version: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectTransferPayload {
    #[validate(custom(function = "validate_not_blank"))]
    pub reason: String,
    pub notes: Option<String>,
    pub version: Option<i32>,
}

// ---
// Handlers
// ---

// POST /api/movements
#[utoipa::path(
    post,
    path = "/api/movements",
    tag = "Movements",
    request_body = CreateMovementPayload,
    responses(
        (status = 201, description = "Movimentação registrada (pendente de aprovação)", body = StockMovement),
        (status = 422, description = "Estoque insuficiente, motivo em branco ou transferência inválida"),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_movement(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _perm: RequirePermission<PermMovementsWrite>,
    Json(payload): Json<CreateMovementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let movement = app_state
        .movement_service
        .create_movement(actor.id, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(movement)))
}

// GET /api/movements?status=pending
#[utoipa::path(
    get,
    path = "/api/movements",
    tag = "Movements",
    params(MovementFilter),
    responses((status = 200, description = "Movimentações com nomes dos envolvidos", body = Vec<MovementDetails>)),
    security(("api_jwt" = []))
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<MovementFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let movements = app_state
        .movement_service
        .list_movements(filter.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(movements))
}

// GET /api/movements/{id}
#[utoipa::path(
    get,
    path = "/api/movements/{id}",
    tag = "Movements",
    params(("id" = Uuid, Path, description = "ID da movimentação")),
    responses(
        (status = 200, description = "Movimentação", body = MovementDetails),
        (status = 404, description = "Movimentação não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_movement(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let movement = app_state
        .movement_service
        .get_movement(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(movement))
}

// POST /api/movements/{id}/approve
#[utoipa::path(
    post,
    path = "/api/movements/{id}/approve",
    tag = "Approvals",
    request_body = ApproveMovementPayload,
    params(("id" = Uuid, Path, description = "ID da movimentação")),
    responses(
        (status = 200, description = "Movimentação aprovada", body = StockMovement),
        (status = 422, description = "Classificação negativa ou que não fecha com a quantidade"),
        (status = 409, description = "Movimentação já resolvida")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_movement(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _perm: RequirePermission<PermMovementsApprove>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApproveMovementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let input = ClassificationInput {
        reemprego_quantity: payload.reemprego_quantity,
        sucata_quantity: payload.sucata_quantity,
        reemprego_notes: payload.reemprego_notes,
        sucata_notes: payload.sucata_notes,
    };

    let movement = app_state
        .movement_service
        .approve_movement(actor.id, id, payload.version, input, payload.notes)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(movement))
}

// POST /api/movements/{id}/reject
#[utoipa::path(
    post,
    path = "/api/movements/{id}/reject",
    tag = "Approvals",
    request_body = RejectMovementPayload,
    params(("id" = Uuid, Path, description = "ID da movimentação")),
    responses(
        (status = 200, description = "Movimentação rejeitada", body = StockMovement),
        (status = 409, description = "Movimentação já resolvida")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_movement(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _perm: RequirePermission<PermMovementsApprove>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectMovementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let movement = app_state
        .movement_service
        .reject_movement(actor.id, id, payload.version, &payload.notes)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(movement))
}

// POST /api/movements/classification/preview
#[utoipa::path(
    post,
    path = "/api/movements/classification/preview",
    tag = "Approvals",
    request_body = PreviewPayload,
    responses((status = 200, description = "Estado do formulário após a mudança", body = ClassificationPreview)),
    security(("api_jwt" = []))
)]
pub async fn preview_classification(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<PreviewPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let preview = classification::preview(
        payload.quantity,
        &payload.reason,
        payload.reemprego,
        payload.sucata,
        payload.change,
    );
    Ok(Json(preview))
}

// POST /api/movements/{id}/transfer/dispatch
#[utoipa::path(
    post,
    path = "/api/movements/{id}/transfer/dispatch",
    tag = "Transfers",
    request_body = TransferActionPayload,
    params(("id" = Uuid, Path, description = "ID da transferência")),
    responses(
        (status = 200, description = "Transferência em trânsito", body = StockMovement),
        (status = 409, description = "Transferência não está pendente")
    ),
    security(("api_jwt" = []))
)]
pub async fn dispatch_transfer(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _perm: RequirePermission<PermMovementsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransferActionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let movement = app_state
        .movement_service
        .dispatch_transfer(actor.id, id, payload.version)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(movement))
}

// POST /api/movements/{id}/transfer/receive
#[utoipa::path(
    post,
    path = "/api/movements/{id}/transfer/receive",
    tag = "Transfers",
    request_body = TransferActionPayload,
    params(("id" = Uuid, Path, description = "ID da transferência")),
    responses(
        (status = 200, description = "Transferência recebida; estoque do destino atualizado", body = StockMovement),
        (status = 409, description = "Transferência já resolvida")
    ),
    security(("api_jwt" = []))
)]
pub async fn receive_transfer(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _perm: RequirePermission<PermMovementsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransferActionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let movement = app_state
        .movement_service
        .receive_transfer(actor.id, id, payload.version, payload.notes)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(movement))
}

// POST /api/movements/{id}/transfer/reject
#[utoipa::path(
    post,
    path = "/api/movements/{id}/transfer/reject",
    tag = "Transfers",
    request_body = RejectTransferPayload,
    params(("id" = Uuid, Path, description = "ID da transferência")),
    responses(
        (status = 200, description = "Transferência rejeitada", body = StockMovement),
        (status = 409, description = "Transferência já resolvida")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_transfer(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _perm: RequirePermission<PermMovementsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectTransferPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let movement = app_state
        .movement_service
        .reject_transfer(actor.id, id, payload.version, &payload.reason, payload.notes)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(movement))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transfer_payload_maps_to_request() {
        let payload: CreateMovementPayload = serde_json::from_value(json!({
            "type": "transfer",
            "productId": Uuid::nil(),
            "quantity": 4,
            "reason": "Transferência",
            "fromWarehouse": "Central",
            "toWarehouse": "Filial Norte"
        }))
        .unwrap();
        assert!(payload.validate().is_ok());

        let req: MovementRequest = payload.into();
        assert_eq!(req.movement_type, MovementType::Transfer);
        assert_eq!(req.to_warehouse.as_deref(), Some("Filial Norte"));
        assert!(req.attachments.is_empty());
    }

    #[test]
    fn zero_quantity_and_blank_reason_fail_validation() {
        let payload: CreateMovementPayload = serde_json::from_value(json!({
            "type": "exit",
            "productId": Uuid::nil(),
            "quantity": 0,
            "reason": ""
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("quantity"));
        assert!(fields.contains_key("reason"));
    }

    #[test]
    fn whitespace_reason_fails_validation() {
        let payload: CreateMovementPayload = serde_json::from_value(json!({
            "type": "exit",
            "productId": Uuid::nil(),
            "quantity": 2,
            "reason": "   "
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("reason"));
    }

    #[test]
    fn negative_approval_quantities_fail_validation() {
        let payload: ApproveMovementPayload = serde_json::from_value(json!({
            "reempregoQuantity": -1,
            "sucataQuantity": 11
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn preview_change_uses_action_tag() {
        let payload: PreviewPayload = serde_json::from_value(json!({
            "quantity": 10,
            "reason": "Devolução",
            "reemprego": 7,
            "change": { "action": "set_sucata", "value": 5 }
        }))
        .unwrap();

        let preview = classification::preview(
            payload.quantity,
            &payload.reason,
            payload.reemprego,
            payload.sucata,
            payload.change,
        );
        assert_eq!(preview.reemprego, 7);
        assert_eq!(preview.sucata, 3);
        assert!(preview.balanced);
    }
}
