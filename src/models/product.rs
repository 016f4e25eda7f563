// src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Endereço físico do produto dentro de um armazém.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductLocation {
    #[schema(example = "Central-A-3-2")]
    pub id: String,
    #[schema(example = "Central")]
    pub warehouse: String,
    #[schema(example = "A")]
    pub aisle: String,
    #[schema(example = "3")]
    pub shelf: String,
    pub position: Option<String>,
}

impl ProductLocation {
    /// Identificador derivado do endereço: `{armazém}-{corredor}-{prateleira}-{posição}`.
    pub fn derive_id(warehouse: &str, aisle: &str, shelf: &str, position: Option<&str>) -> String {
        format!("{}-{}-{}-{}", warehouse, aisle, shelf, position.unwrap_or(""))
    }

    /// Mesmo corredor/prateleira/posição, em outro armazém.
    pub fn moved_to(&self, warehouse: &str) -> Self {
        Self {
            id: Self::derive_id(warehouse, &self.aisle, &self.shelf, self.position.as_deref()),
            warehouse: warehouse.to_string(),
            aisle: self.aisle.clone(),
            shelf: self.shelf.clone(),
            position: self.position.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(example = "CAB-0042")]
    pub sku: String,
    #[schema(example = "Cabo de cobre 10mm")]
    pub name: String,
    #[schema(example = "UN")]
    pub unit: String,
    #[schema(example = "12.50")]
    pub purchase_price: Decimal,
    pub current_stock: i32,
    #[sqlx(json)]
    pub location: ProductLocation,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dados de um produto ainda não gravado.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub unit: String,
    pub purchase_price: Decimal,
    pub current_stock: i32,
    pub location: ProductLocation,
}
