// src/services/product_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_audited, error::AppError},
    db::ProductRepository,
    models::product::{NewProduct, Product},
};

#[derive(Clone)]
pub struct ProductService {
    product_repo: ProductRepository,
    pool: PgPool,
}

impl ProductService {
    pub fn new(product_repo: ProductRepository, pool: PgPool) -> Self {
        Self { product_repo, pool }
    }

    pub async fn create_product(&self, actor: Uuid, new: NewProduct) -> Result<Product, AppError> {
        let mut tx = begin_audited(&self.pool, actor).await?;
        let product = self.product_repo.create(&mut *tx, &new).await?;
        tx.commit().await?;

        tracing::info!("Produto {} ({}) criado em {}", product.id, product.sku, product.location.warehouse);
        Ok(product)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        self.product_repo.list().await
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product, AppError> {
        self.product_repo.find_by_id(id).await?.ok_or(AppError::ProductNotFound)
    }
}
