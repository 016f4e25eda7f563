// src/models/schedule.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Ciclo de vida do agendamento ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "schedule_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    InProgress,
    Completed,
    Overdue,
    Cancelled,
}

impl ScheduleStatus {
    /// `completed` e `cancelled` não saem mais do lugar.
    pub fn is_terminal(self) -> bool {
        matches!(self, ScheduleStatus::Completed | ScheduleStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Geolocation {
    #[schema(example = -23.5505)]
    pub latitude: f64,
    #[schema(example = -46.6333)]
    pub longitude: f64,
}

// --- Uma etapa do checklist ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStatus {
    #[schema(example = "Contar corredor A")]
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub completed_by: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub geolocation: Option<Geolocation>,
    /// Endereço resolvido no momento da conclusão (ou um texto substituto).
    pub address: Option<String>,
}

impl ActivityStatus {
    pub fn pending(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: false,
            completed_by: None,
            completed_at: None,
            geolocation: None,
            address: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedProduct {
    pub product_id: Uuid,
    #[schema(example = 40)]
    pub expected_quantity: i32,
    #[serde(default)]
    pub current_stock: i32,
    #[serde(default)]
    pub priority: Priority,
}

// --- Contagem ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CountStatus {
    Pending,
    Counted,
    Validated,
    Approved,
    Rejected,
}

/// Fluxo: contagem (Apontador) -> revisão do Validador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStep {
    Counting,
    ValidadorReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValidationVerdict {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountValidation {
    pub step: ValidationStep,
    pub status: ValidationVerdict,
    pub validated_by: Uuid,
    pub validated_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub platform: String,
    pub language: String,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountMetadata {
    pub device_info: Option<DeviceInfo>,
    pub location: Option<CountLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCount {
    pub product_id: Uuid,
    #[schema(example = 38)]
    pub counted_quantity: i32,
    pub counted_by: Uuid,
    pub counted_at: DateTime<Utc>,
    pub notes: Option<String>,
    /// Contado menos esperado.
    #[schema(example = -2)]
    pub variance: i32,
    #[serde(default)]
    pub validations: Vec<CountValidation>,
    pub status: CountStatus,
    pub metadata: Option<CountMetadata>,
}

// --- O agendamento em si ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventorySchedule {
    pub id: Uuid,
    #[schema(example = "Inventário mensal - Central")]
    pub name: String,
    #[schema(example = "INV-20250310-0900")]
    pub code: String,
    pub scheduled_date: DateTime<Utc>,
    pub status: ScheduleStatus,
    #[schema(example = "Central")]
    pub location: String,
    #[schema(example = "Geral")]
    pub sector: String,
    pub notes: Option<String>,
    #[sqlx(json)]
    pub expected_products: Vec<ExpectedProduct>,
    #[sqlx(json)]
    pub counted_products: Vec<InventoryCount>,
    /// Formato antigo: só os textos das atividades.
    #[sqlx(json)]
    pub activities: Vec<String>,
    #[sqlx(json)]
    pub activity_status: Vec<ActivityStatus>,
    #[sqlx(json)]
    pub assigned_users: Vec<Uuid>,
    #[sqlx(json)]
    #[schema(value_type = Object, example = json!({"550e8400-e29b-41d4-a716-446655440000": "Apontador"}))]
    pub user_roles: HashMap<Uuid, String>,
    pub created_by: Uuid,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl InventorySchedule {
    pub fn role_of(&self, user_id: Uuid) -> Option<&str> {
        self.user_roles.get(&user_id).map(String::as_str)
    }

    pub fn count_for(&self, product_id: Uuid) -> Option<&InventoryCount> {
        self.counted_products.iter().find(|c| c.product_id == product_id)
    }

    pub fn expected_for(&self, product_id: Uuid) -> Option<&ExpectedProduct> {
        self.expected_products.iter().find(|e| e.product_id == product_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityProgress {
    pub total_activities: usize,
    pub completed_activities: usize,
    #[schema(example = 50)]
    pub percentage: i32,
}

/// Agendamento pronto para a tela de detalhes: atividades normalizadas,
/// progresso e os nomes de quem aparece nele.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDetails {
    #[serde(flatten)]
    pub schedule: InventorySchedule,
    pub progress: ActivityProgress,
    #[schema(value_type = Object, example = json!({"550e8400-e29b-41d4-a716-446655440000": "Maria Silva"}))]
    pub user_names: HashMap<Uuid, String>,
}
