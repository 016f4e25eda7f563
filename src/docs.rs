// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,
        handlers::users::create_user,
        handlers::users::list_users,
        handlers::users::update_user,
        handlers::users::list_user_names,

        // --- Products ---
        handlers::products::create_product,
        handlers::products::list_products,
        handlers::products::get_product,

        // --- Schedules ---
        handlers::schedules::create_schedule,
        handlers::schedules::list_schedules,
        handlers::schedules::get_schedule,
        handlers::schedules::update_schedule,
        handlers::schedules::cancel_schedule,
        handlers::schedules::delete_schedule,
        handlers::schedules::toggle_activity,
        handlers::schedules::save_progress,
        handlers::schedules::get_progress,

        // --- Counts ---
        handlers::schedules::record_count,
        handlers::schedules::review_count,
        handlers::schedules::get_report,

        // --- Movements ---
        handlers::movements::create_movement,
        handlers::movements::list_movements,
        handlers::movements::get_movement,
        handlers::movements::approve_movement,
        handlers::movements::reject_movement,
        handlers::movements::preview_classification,
        handlers::movements::dispatch_transfer,
        handlers::movements::receive_transfer,
        handlers::movements::reject_transfer,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::PageAccess,
            models::auth::User,
            models::auth::UserName,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::CreateUserPayload,
            models::auth::UpdateUserPayload,

            // --- Products ---
            models::product::Product,
            models::product::ProductLocation,
            handlers::products::CreateProductPayload,
            handlers::products::LocationPayload,

            // --- Schedules ---
            models::schedule::ScheduleStatus,
            models::schedule::Geolocation,
            models::schedule::ActivityStatus,
            models::schedule::ActivityProgress,
            models::schedule::Priority,
            models::schedule::ExpectedProduct,
            models::schedule::InventorySchedule,
            models::schedule::ScheduleDetails,
            handlers::schedules::CreateSchedulePayload,
            handlers::schedules::UpdateSchedulePayload,
            handlers::schedules::VersionPayload,
            handlers::schedules::ToggleActivityPayload,
            handlers::schedules::SaveProgressPayload,

            // --- Counts ---
            models::schedule::CountStatus,
            models::schedule::ValidationStep,
            models::schedule::ValidationVerdict,
            models::schedule::CountValidation,
            models::schedule::DeviceInfo,
            models::schedule::CountLocation,
            models::schedule::CountMetadata,
            models::schedule::InventoryCount,
            models::report::InventoryReport,
            models::report::CountedItemDetail,
            handlers::schedules::RecordCountPayload,
            handlers::schedules::ReviewCountPayload,

            // --- Movements ---
            models::movement::MovementType,
            models::movement::ApprovalStatus,
            models::movement::ClassificationType,
            models::movement::MovementClassification,
            models::movement::TransferStatus,
            models::movement::TransferData,
            models::movement::StockMovement,
            models::movement::MovementDetails,
            models::movement::ClassificationInput,
            models::movement::ClassificationDraft,
            models::movement::ClassificationChange,
            models::movement::ClassificationPreview,
            handlers::movements::CreateMovementPayload,
            handlers::movements::ApproveMovementPayload,
            handlers::movements::RejectMovementPayload,
            handlers::movements::PreviewPayload,
            handlers::movements::TransferActionPayload,
            handlers::movements::RejectTransferPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação"),
        (name = "Users", description = "Usuários, papéis e acesso às páginas"),
        (name = "Products", description = "Cadastro de produtos e endereços"),
        (name = "Schedules", description = "Agendamentos de inventário e checklist de atividades"),
        (name = "Counts", description = "Contagens, revisão do Validador e relatório de divergências"),
        (name = "Movements", description = "Entradas, saídas, ajustes e transferências"),
        (name = "Approvals", description = "Aprovação e classificação (reemprego / sucata)"),
        (name = "Transfers", description = "Ciclo de vida das transferências entre armazéns")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_core_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/login",
            "/api/schedules/{id}/activities/{index}",
            "/api/movements/{id}/approve",
            "/api/movements/{id}/transfer/receive",
        ] {
            assert!(doc.paths.paths.contains_key(path), "faltou {}", path);
        }
    }

    fn responses(doc: &utoipa::openapi::OpenApi, path: &str, put: bool) -> Vec<String> {
        let item = &doc.paths.paths[path];
        let op = if put { item.put.as_ref() } else { item.post.as_ref() };
        op.map(|o| o.responses.responses.keys().cloned().collect()).unwrap_or_default()
    }

    #[test]
    fn rule_violations_are_documented_as_422() {
        let doc = ApiDoc::openapi();
        for (path, put) in [
            ("/api/schedules", false),
            ("/api/schedules/{id}/activities/{index}", true),
            ("/api/movements", false),
            ("/api/movements/{id}/approve", false),
        ] {
            let codes = responses(&doc, path, put);
            assert!(codes.iter().any(|c| c == "422"), "{} sem 422", path);
            assert!(!codes.iter().any(|c| c == "400"), "{} ainda com 400", path);
        }
    }
}
