// src/db/movement_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::movement::{ApprovalStatus, NewMovement, StockMovement, TransferData},
};

#[derive(Clone)]
pub struct MovementRepository {
    pool: PgPool,
}

impl MovementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Mais recentes primeiro, opcionalmente por situação de aprovação.
    pub async fn list(&self, status: Option<ApprovalStatus>) -> Result<Vec<StockMovement>, AppError> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE $1::approval_status IS NULL OR approval_status = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<StockMovement>, AppError> {
        let movement = sqlx::query_as::<_, StockMovement>("SELECT * FROM stock_movements WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(movement)
    }

    /// Lê a movimentação travando a linha até o fim da transação.
    pub async fn lock_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<StockMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement =
            sqlx::query_as::<_, StockMovement>("SELECT * FROM stock_movements WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(executor)
                .await?;
        Ok(movement)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        new: &NewMovement,
        transfer_data: Option<&TransferData>,
    ) -> Result<StockMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements (
                id, movement_type, product_id, quantity, previous_stock, new_stock,
                reason, price, batch, obra, nota_fiscal, notes, user_id,
                approval_status, transfer_data, attachments
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'pending', $14, $15)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(new.movement_type)
        .bind(new.product_id)
        .bind(new.quantity)
        .bind(new.previous_stock)
        .bind(new.new_stock)
        .bind(&new.reason)
        .bind(new.price)
        .bind(&new.batch)
        .bind(&new.obra)
        .bind(&new.nota_fiscal)
        .bind(&new.notes)
        .bind(new.user_id)
        .bind(transfer_data.map(Json))
        .bind(Json(&new.attachments))
        .fetch_one(executor)
        .await?;
        Ok(movement)
    }

    /// Grava aprovação, classificações e dados de transferência se a versão
    /// ainda for a lida.
    pub async fn update<'e, E>(&self, executor: E, m: &StockMovement) -> Result<StockMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, StockMovement>(
            r#"
            UPDATE stock_movements
            SET approval_status = $3, approved_by = $4, approved_at = $5, approval_notes = $6,
                classifications = $7, transfer_data = $8, attachments = $9,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(m.id)
        .bind(m.version)
        .bind(m.approval_status)
        .bind(m.approved_by)
        .bind(m.approved_at)
        .bind(&m.approval_notes)
        .bind(Json(&m.classifications))
        .bind(m.transfer_data.as_ref().map(Json))
        .bind(Json(&m.attachments))
        .fetch_optional(executor)
        .await?;

        updated.ok_or(AppError::StaleVersion)
    }
}
