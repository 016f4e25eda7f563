// src/models/report.rs

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::schedule::{ExpectedProduct, InventoryCount};

/// Consolidado de um inventário: esperado x contado.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReport {
    pub schedule_id: Uuid,
    pub total_products: usize,
    pub counted_products: usize,
    pub not_found_products: usize,
    #[schema(example = 85)]
    pub inventory_percentage: i32,
    pub total_expected_value: Decimal,
    pub total_counted_value: Decimal,
    /// Positivo = sobra de valor, negativo = falta.
    pub variance: Decimal,
    pub counted_items: Vec<InventoryCount>,
    pub not_found_items: Vec<ExpectedProduct>,
    pub details: Vec<CountedItemDetail>,
}

/// Linha da tabela de detalhes do relatório.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountedItemDetail {
    pub product_id: Uuid,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub unit: Option<String>,
    pub expected_quantity: i32,
    pub counted_quantity: i32,
    pub variance: i32,
    #[schema(example = "-5.00")]
    pub variance_percentage: Decimal,
    pub unit_price: Decimal,
    pub expected_value: Decimal,
    pub counted_value: Decimal,
    pub value_difference: Decimal,
}
