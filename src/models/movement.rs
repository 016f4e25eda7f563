// src/models/movement.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "movement_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Entry,      // Entrada
    Exit,       // Saída
    Transfer,   // Transferência entre armazéns
    Adjustment, // Ajuste: a quantidade é o novo total
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "approval_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationType {
    Reemprego, // reaproveitamento
    Sucata,    // descarte
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovementClassification {
    #[serde(rename = "type")]
    pub kind: ClassificationType,
    #[schema(example = 7)]
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    InTransit,
    Received,
    Rejected,
}

impl TransferStatus {
    pub fn is_resolved(self) -> bool {
        matches!(self, TransferStatus::Received | TransferStatus::Rejected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferData {
    #[schema(example = "Central")]
    pub from_warehouse: String,
    #[schema(example = "Filial Norte")]
    pub to_warehouse: String,
    pub transfer_status: TransferStatus,
    pub sent_by: Uuid,
    pub sent_at: DateTime<Utc>,
    pub received_by: Option<Uuid>,
    pub received_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    #[schema(example = "TRF-550E8400")]
    pub tracking_code: String,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub transport_notes: Option<String>,
    pub receipt_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub product_id: Uuid,
    #[schema(example = 10)]
    pub quantity: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    #[schema(example = "Compra")]
    pub reason: String,
    pub price: Option<Decimal>,
    pub batch: Option<String>,
    pub obra: Option<String>,
    pub nota_fiscal: Option<String>,
    pub notes: Option<String>,
    pub user_id: Uuid,
    pub approval_status: ApprovalStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approval_notes: Option<String>,
    #[sqlx(json)]
    pub classifications: Vec<MovementClassification>,
    #[sqlx(json(nullable))]
    pub transfer_data: Option<TransferData>,
    /// Referências para os arquivos anexados.
    #[sqlx(json)]
    pub attachments: Vec<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

/// Dados de uma movimentação ainda não gravada.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub movement_type: MovementType,
    pub product_id: Uuid,
    pub quantity: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub reason: String,
    pub price: Option<Decimal>,
    pub batch: Option<String>,
    pub obra: Option<String>,
    pub nota_fiscal: Option<String>,
    pub notes: Option<String>,
    pub user_id: Uuid,
    pub attachments: Vec<String>,
}

// --- Classificação (reemprego / sucata) ---

/// Quantidades informadas pelo aprovador.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationInput {
    #[serde(default)]
    #[schema(example = 7)]
    pub reemprego_quantity: i32,
    #[serde(default)]
    #[schema(example = 3)]
    pub sucata_quantity: i32,
    pub reemprego_notes: Option<String>,
    pub sucata_notes: Option<String>,
}

/// Estado do formulário de balanceamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationDraft {
    pub total: i32,
    pub reemprego: i32,
    pub sucata: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClassificationChange {
    SetReemprego { value: i32 },
    SetSucata { value: i32 },
    AllReemprego,
    AllSucata,
    SplitHalf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationPreview {
    pub reemprego: i32,
    pub sucata: i32,
    pub classified: i32,
    pub remaining: i32,
    pub balanced: bool,
    /// Movimentação de compra: a classificação é dispensada.
    pub purchase: bool,
}

/// Movimentação pronta para a tela de detalhes, com os nomes dos envolvidos.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovementDetails {
    #[serde(flatten)]
    pub movement: StockMovement,
    #[schema(value_type = Object)]
    pub user_names: std::collections::HashMap<Uuid, String>,
}
