// src/handlers/schedules.rs

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::products::validate_not_blank,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermSchedulesExecute, PermSchedulesWrite, RequirePermission},
    },
    models::{
        report::InventoryReport,
        schedule::{
            ActivityProgress, ActivityStatus, CountMetadata, ExpectedProduct, Geolocation,
            InventorySchedule, ScheduleDetails, ValidationVerdict,
        },
    },
    services::{
        activities::Completion,
        schedule_service::{NewSchedule, ScheduleChanges},
    },
};

fn validate_expected_products(items: &[ExpectedProduct]) -> Result<(), ValidationError> {
    if items.iter().any(|e| e.expected_quantity < 0) {
        let mut err = ValidationError::new("range");
        err.message = Some("A quantidade esperada não pode ser negativa.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchedulePayload {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,

    /// Se omitido, gera `INV-AAAAMMDD-HHMM`.
    pub code: Option<String>,

    pub scheduled_date: DateTime<Utc>,

    #[validate(custom(function = "validate_not_blank"))]
    pub location: String,

    #[validate(custom(function = "validate_not_blank"))]
    pub sector: String,

    pub notes: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "validate_expected_products"))]
    pub expected_products: Vec<ExpectedProduct>,

    #[serde(default)]
    pub activities: Vec<String>,

    #[serde(default)]
    pub assigned_users: Vec<Uuid>,

    #[serde(default)]
    #[schema(value_type = Object)]
    pub user_roles: HashMap<Uuid, String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSchedulePayload {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub code: Option<String>,
    pub scheduled_date: Option<DateTime<Utc>>,
    #[validate(custom(function = "validate_not_blank"))]
    pub location: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub sector: Option<String>,
    pub notes: Option<String>,
    #[validate(custom(function = "validate_expected_products"))]
    pub expected_products: Option<Vec<ExpectedProduct>>,
    pub activities: Option<Vec<String>>,
    pub assigned_users: Option<Vec<Uuid>>,
    #[schema(value_type = Option<Object>)]
    pub user_roles: Option<HashMap<Uuid, String>>,
    /// Versão lida pelo cliente.
    pub version: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VersionPayload {
    pub version: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToggleActivityPayload {
    pub completed: bool,
    pub geolocation: Option<Geolocation>,
    pub address: Option<String>,
    pub version: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressPayload {
    pub activities: Vec<ActivityStatus>,
    pub version: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordCountPayload {
    pub product_id: Uuid,
    #[validate(range(min = 0, message = "A quantidade contada não pode ser negativa."))]
    pub counted_quantity: i32,
    pub notes: Option<String>,
    pub metadata: Option<CountMetadata>,
    pub version: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCountPayload {
    pub verdict: ValidationVerdict,
    /// Obrigatório na reprovação.
    pub notes: Option<String>,
    pub version: Option<i32>,
}

// ---
// Handlers
// ---

// POST /api/schedules
#[utoipa::path(
    post,
    path = "/api/schedules",
    tag = "Schedules",
    request_body = CreateSchedulePayload,
    responses(
        (status = 201, description = "Agendamento criado", body = InventorySchedule),
        (status = 422, description = "Data no passado ou dados inválidos"),
        (status = 409, description = "Código já em uso")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_schedule(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _perm: RequirePermission<PermSchedulesWrite>,
    Json(payload): Json<CreateSchedulePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let input = NewSchedule {
        name: payload.name,
        code: payload.code,
        scheduled_date: payload.scheduled_date,
        location: payload.location,
        sector: payload.sector,
        notes: payload.notes,
        expected_products: payload.expected_products,
        activities: payload.activities,
        assigned_users: payload.assigned_users,
        user_roles: payload.user_roles,
    };

    let schedule = app_state
        .schedule_service
        .create_schedule(actor.id, input)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(schedule)))
}

// GET /api/schedules
#[utoipa::path(
    get,
    path = "/api/schedules",
    tag = "Schedules",
    responses((status = 200, description = "Agendamentos com progresso e nomes", body = Vec<ScheduleDetails>)),
    security(("api_jwt" = []))
)]
pub async fn list_schedules(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let schedules = app_state
        .schedule_service
        .list_schedules(actor.id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(schedules))
}

// GET /api/schedules/{id}
#[utoipa::path(
    get,
    path = "/api/schedules/{id}",
    tag = "Schedules",
    params(("id" = Uuid, Path, description = "ID do agendamento")),
    responses(
        (status = 200, description = "Detalhes do agendamento", body = ScheduleDetails),
        (status = 404, description = "Agendamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_schedule(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let schedule = app_state
        .schedule_service
        .get_schedule(actor.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(schedule))
}

// PUT /api/schedules/{id}
#[utoipa::path(
    put,
    path = "/api/schedules/{id}",
    tag = "Schedules",
    request_body = UpdateSchedulePayload,
    params(("id" = Uuid, Path, description = "ID do agendamento")),
    responses(
        (status = 200, description = "Agendamento atualizado", body = InventorySchedule),
        (status = 409, description = "Versão desatualizada ou código em uso")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_schedule(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _perm: RequirePermission<PermSchedulesWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSchedulePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let changes = ScheduleChanges {
        name: payload.name,
        code: payload.code,
        scheduled_date: payload.scheduled_date,
        location: payload.location,
        sector: payload.sector,
        notes: payload.notes,
        expected_products: payload.expected_products,
        activities: payload.activities,
        assigned_users: payload.assigned_users,
        user_roles: payload.user_roles,
    };

    let schedule = app_state
        .schedule_service
        .update_schedule(actor.id, id, payload.version, changes)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(schedule))
}

// POST /api/schedules/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/schedules/{id}/cancel",
    tag = "Schedules",
    request_body = VersionPayload,
    params(("id" = Uuid, Path, description = "ID do agendamento")),
    responses(
        (status = 200, description = "Agendamento cancelado", body = InventorySchedule),
        (status = 409, description = "Agendamento já encerrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_schedule(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _perm: RequirePermission<PermSchedulesWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VersionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let schedule = app_state
        .schedule_service
        .cancel_schedule(actor.id, id, payload.version)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(schedule))
}

// DELETE /api/schedules/{id}
#[utoipa::path(
    delete,
    path = "/api/schedules/{id}",
    tag = "Schedules",
    params(("id" = Uuid, Path, description = "ID do agendamento")),
    responses(
        (status = 204, description = "Agendamento excluído"),
        (status = 404, description = "Agendamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_schedule(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _perm: RequirePermission<PermSchedulesWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .schedule_service
        .delete_schedule(actor.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// PUT /api/schedules/{id}/activities/{index}
#[utoipa::path(
    put,
    path = "/api/schedules/{id}/activities/{index}",
    tag = "Schedules",
    request_body = ToggleActivityPayload,
    params(
        ("id" = Uuid, Path, description = "ID do agendamento"),
        ("index" = usize, Path, description = "Posição da atividade")
    ),
    responses(
        (status = 200, description = "Atividade atualizada", body = ScheduleDetails),
        (status = 422, description = "Índice fora da lista"),
        (status = 409, description = "Agendamento encerrado ou versão desatualizada")
    ),
    security(("api_jwt" = []))
)]
pub async fn toggle_activity(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _perm: RequirePermission<PermSchedulesExecute>,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(payload): Json<ToggleActivityPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let completion = Completion {
        actor: actor.id,
        at: Utc::now(),
        geolocation: payload.geolocation,
        address: payload.address,
    };

    let schedule = app_state
        .schedule_service
        .toggle_activity(actor.id, id, index, payload.completed, completion, payload.version)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(schedule))
}

// PUT /api/schedules/{id}/progress
#[utoipa::path(
    put,
    path = "/api/schedules/{id}/progress",
    tag = "Schedules",
    request_body = SaveProgressPayload,
    params(("id" = Uuid, Path, description = "ID do agendamento")),
    responses(
        (status = 200, description = "Checklist gravado", body = ScheduleDetails),
        (status = 409, description = "Agendamento encerrado ou versão desatualizada")
    ),
    security(("api_jwt" = []))
)]
pub async fn save_progress(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _perm: RequirePermission<PermSchedulesExecute>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SaveProgressPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let schedule = app_state
        .schedule_service
        .save_progress(actor.id, id, payload.version, payload.activities)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(schedule))
}

// GET /api/schedules/{id}/progress
#[utoipa::path(
    get,
    path = "/api/schedules/{id}/progress",
    tag = "Schedules",
    params(("id" = Uuid, Path, description = "ID do agendamento")),
    responses((status = 200, description = "Progresso do checklist", body = ActivityProgress)),
    security(("api_jwt" = []))
)]
pub async fn get_progress(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let progress = app_state
        .schedule_service
        .progress(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(progress))
}

// POST /api/schedules/{id}/counts
#[utoipa::path(
    post,
    path = "/api/schedules/{id}/counts",
    tag = "Counts",
    request_body = RecordCountPayload,
    params(("id" = Uuid, Path, description = "ID do agendamento")),
    responses(
        (status = 200, description = "Contagem registrada", body = InventorySchedule),
        (status = 409, description = "Agendamento encerrado ou versão desatualizada")
    ),
    security(("api_jwt" = []))
)]
pub async fn record_count(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _perm: RequirePermission<PermSchedulesExecute>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordCountPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let schedule = app_state
        .schedule_service
        .record_count(
            actor.id,
            id,
            payload.product_id,
            payload.counted_quantity,
            payload.notes,
            payload.metadata,
            payload.version,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(schedule))
}

// POST /api/schedules/{id}/counts/{product_id}/review
#[utoipa::path(
    post,
    path = "/api/schedules/{id}/counts/{product_id}/review",
    tag = "Counts",
    request_body = ReviewCountPayload,
    params(
        ("id" = Uuid, Path, description = "ID do agendamento"),
        ("product_id" = Uuid, Path, description = "ID do produto contado")
    ),
    responses(
        (status = 200, description = "Contagem revisada", body = InventorySchedule),
        (status = 403, description = "Usuário não é validador"),
        (status = 404, description = "Produto sem contagem")
    ),
    security(("api_jwt" = []))
)]
pub async fn review_count(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path((id, product_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ReviewCountPayload>,
) -> Result<impl IntoResponse, ApiError> {
    // Papel global ou papel de Validador no próprio agendamento; conferido no serviço.
    let schedule = app_state
        .schedule_service
        .review_count(
            actor.id,
            actor.role,
            id,
            product_id,
            payload.verdict,
            payload.notes,
            payload.version,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(schedule))
}

// GET /api/schedules/{id}/report
#[utoipa::path(
    get,
    path = "/api/schedules/{id}/report",
    tag = "Counts",
    params(("id" = Uuid, Path, description = "ID do agendamento")),
    responses(
        (status = 200, description = "Relatório de divergências", body = InventoryReport),
        (status = 404, description = "Agendamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_report(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .schedule_service
        .report(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_payload_accepts_minimal_body() {
        let payload: CreateSchedulePayload = serde_json::from_value(json!({
            "name": "Inventário mensal",
            "scheduledDate": "2030-03-10T09:00:00Z",
            "location": "Central",
            "sector": "Geral"
        }))
        .unwrap();

        assert!(payload.validate().is_ok());
        assert!(payload.code.is_none());
        assert!(payload.activities.is_empty());
    }

    #[test]
    fn blank_name_location_or_sector_fail_validation() {
        let payload: CreateSchedulePayload = serde_json::from_value(json!({
            "name": "   ",
            "scheduledDate": "2030-03-10T09:00:00Z",
            "location": " ",
            "sector": "\t"
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        for field in ["name", "location", "sector"] {
            assert!(fields.contains_key(field), "faltou {}", field);
        }
    }

    #[test]
    fn blank_update_fields_fail_validation() {
        let payload: UpdateSchedulePayload = serde_json::from_value(json!({
            "name": "  ",
            "version": 3
        }))
        .unwrap();
        assert!(payload.validate().is_err());

        let payload: UpdateSchedulePayload = serde_json::from_value(json!({ "version": 3 })).unwrap();
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn negative_expected_quantity_fails_validation() {
        let payload: CreateSchedulePayload = serde_json::from_value(json!({
            "name": "Inventário",
            "scheduledDate": "2030-03-10T09:00:00Z",
            "location": "Central",
            "sector": "Geral",
            "expectedProducts": [
                { "productId": Uuid::nil(), "expectedQuantity": -1 }
            ]
        }))
        .unwrap();

        assert!(payload.validate().is_err());
    }

    #[test]
    fn negative_count_fails_validation() {
        let payload: RecordCountPayload = serde_json::from_value(json!({
            "productId": Uuid::nil(),
            "countedQuantity": -3
        }))
        .unwrap();

        assert!(payload.validate().is_err());
    }
}
