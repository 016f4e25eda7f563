// src/db/product_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::product::{NewProduct, Product},
};

const SKU_WAREHOUSE_INDEX: &str = "idx_products_sku_warehouse";

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Leituras simples usam a pool principal.
    // ---

    pub async fn list(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    // ---
    // Dentro de transação: leitura com trava de linha.
    // ---

    pub async fn lock_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    /// Mesmo SKU no armazém informado, travado para atualização.
    pub async fn lock_by_sku_in_warehouse<'e, E>(
        &self,
        executor: E,
        sku: &str,
        warehouse: &str,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE sku = $1 AND location->>'warehouse' = $2 FOR UPDATE",
        )
        .bind(sku)
        .bind(warehouse)
        .fetch_optional(executor)
        .await?;
        Ok(product)
    }

    pub async fn create<'e, E>(&self, executor: E, new: &NewProduct) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (sku, name, unit, purchase_price, current_stock, location)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&new.sku)
        .bind(&new.name)
        .bind(&new.unit)
        .bind(new.purchase_price)
        .bind(new.current_stock)
        .bind(Json(&new.location))
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() && db_err.constraint() == Some(SKU_WAREHOUSE_INDEX) {
                    return AppError::SkuAlreadyExists;
                }
            }
            e.into()
        })
    }

    /// Troca o estoque se a versão ainda for a lida.
    pub async fn set_stock<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        expected_version: i32,
        new_stock: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET current_stock = $3, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(new_stock)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::StaleVersion);
        }
        Ok(())
    }
}
