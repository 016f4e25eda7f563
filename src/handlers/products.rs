// src/handlers/products.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermProductsWrite, RequirePermission},
    },
    models::product::{NewProduct, Product, ProductLocation},
};

pub(crate) fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

/// `length(min = 1)` aceita "   "; aqui só vale texto depois do trim.
pub(crate) fn validate_not_blank(val: &str) -> Result<(), ValidationError> {
    if val.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("O campo não pode ficar em branco.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationPayload {
    /// Se omitido, é derivado do endereço.
    pub id: Option<String>,
    #[validate(length(min = 1, message = "O armazém é obrigatório."))]
    pub warehouse: String,
    #[validate(length(min = 1, message = "O corredor é obrigatório."))]
    pub aisle: String,
    #[validate(length(min = 1, message = "A prateleira é obrigatória."))]
    pub shelf: String,
    pub position: Option<String>,
}

impl LocationPayload {
    fn into_location(self) -> ProductLocation {
        let warehouse = self.warehouse.trim().to_string();
        let aisle = self.aisle.trim().to_string();
        let shelf = self.shelf.trim().to_string();
        let position = self.position.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());

        let id = match self.id.map(|i| i.trim().to_string()).filter(|i| !i.is_empty()) {
            Some(id) => id,
            None => ProductLocation::derive_id(&warehouse, &aisle, &shelf, position.as_deref()),
        };

        ProductLocation { id, warehouse, aisle, shelf, position }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 1, message = "O SKU é obrigatório."))]
    pub sku: String,

    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,

    #[validate(length(min = 1, message = "A unidade é obrigatória."))]
    pub unit: String,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    #[schema(value_type = f64, example = 12.5)]
    pub purchase_price: Decimal,

    #[validate(range(min = 0, message = "O estoque inicial não pode ser negativo."))]
    #[serde(default)]
    pub current_stock: i32,

    #[validate(nested)]
    pub location: LocationPayload,
}

// POST /api/products
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Products",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto criado", body = Product),
        (status = 409, description = "SKU já existe neste armazém")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _perm: RequirePermission<PermProductsWrite>,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let new = NewProduct {
        sku: payload.sku.trim().to_string(),
        name: payload.name.trim().to_string(),
        unit: payload.unit.trim().to_string(),
        purchase_price: payload.purchase_price,
        current_stock: payload.current_stock,
        location: payload.location.into_location(),
    };

    let product = app_state
        .product_service
        .create_product(actor.id, new)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(product)))
}

// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    responses((status = 200, description = "Lista de produtos", body = Vec<Product>)),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let products = app_state
        .product_service
        .list_products()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(products))
}

// GET /api/products/{id}
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = app_state
        .product_service
        .get_product(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(product))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(id: Option<&str>, position: Option<&str>) -> LocationPayload {
        LocationPayload {
            id: id.map(String::from),
            warehouse: " Central ".into(),
            aisle: "A".into(),
            shelf: "3".into(),
            position: position.map(String::from),
        }
    }

    #[test]
    fn location_id_is_derived_when_missing() {
        let loc = location(None, Some("2")).into_location();
        assert_eq!(loc.id, "Central-A-3-2");
        assert_eq!(loc.warehouse, "Central");

        let loc = location(Some("   "), Some(" ")).into_location();
        assert_eq!(loc.id, "Central-A-3-");
        assert_eq!(loc.position, None);
    }

    #[test]
    fn explicit_location_id_is_kept() {
        let loc = location(Some("DOCA-01"), None).into_location();
        assert_eq!(loc.id, "DOCA-01");
    }

    #[test]
    fn whitespace_only_text_is_blank() {
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank(" A ").is_ok());
    }

    #[test]
    fn negative_price_is_rejected() {
        assert!(validate_not_negative(&Decimal::new(-1, 2)).is_err());
        assert!(validate_not_negative(&Decimal::ZERO).is_ok());
    }
}
