// src/db/schedule_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::schedule::InventorySchedule};

const CODE_KEY: &str = "inventory_schedules_code_key";

#[derive(Clone)]
pub struct ScheduleRepository {
    pool: PgPool,
}

fn map_code_conflict(e: sqlx::Error, code: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() && db_err.constraint() == Some(CODE_KEY) {
            return AppError::ScheduleCodeAlreadyExists(code.to_string());
        }
    }
    e.into()
}

impl ScheduleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<InventorySchedule>, AppError> {
        let schedules = sqlx::query_as::<_, InventorySchedule>(
            "SELECT * FROM inventory_schedules ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(schedules)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<InventorySchedule>, AppError> {
        let schedule =
            sqlx::query_as::<_, InventorySchedule>("SELECT * FROM inventory_schedules WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(schedule)
    }

    /// Insere o agendamento. Versão e datas de criação vêm do banco.
    pub async fn create<'e, E>(&self, executor: E, s: &InventorySchedule) -> Result<InventorySchedule, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, InventorySchedule>(
            r#"
            INSERT INTO inventory_schedules (
                id, name, code, scheduled_date, status, location, sector, notes,
                expected_products, counted_products, activities, activity_status,
                assigned_users, user_roles, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(s.id)
        .bind(&s.name)
        .bind(&s.code)
        .bind(s.scheduled_date)
        .bind(s.status)
        .bind(&s.location)
        .bind(&s.sector)
        .bind(&s.notes)
        .bind(Json(&s.expected_products))
        .bind(Json(&s.counted_products))
        .bind(Json(&s.activities))
        .bind(Json(&s.activity_status))
        .bind(Json(&s.assigned_users))
        .bind(Json(&s.user_roles))
        .bind(s.created_by)
        .fetch_one(executor)
        .await
        .map_err(|e| map_code_conflict(e, &s.code))
    }

    /// Grava o agendamento inteiro se a versão ainda for a lida.
    /// Versão diferente vira `StaleVersion`: nada de "último a gravar vence".
    pub async fn update<'e, E>(&self, executor: E, s: &InventorySchedule) -> Result<InventorySchedule, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, InventorySchedule>(
            r#"
            UPDATE inventory_schedules
            SET name = $3, code = $4, scheduled_date = $5, status = $6, location = $7,
                sector = $8, notes = $9, expected_products = $10, counted_products = $11,
                activities = $12, activity_status = $13, assigned_users = $14,
                user_roles = $15, completed_at = $16,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(s.id)
        .bind(s.version)
        .bind(&s.name)
        .bind(&s.code)
        .bind(s.scheduled_date)
        .bind(s.status)
        .bind(&s.location)
        .bind(&s.sector)
        .bind(&s.notes)
        .bind(Json(&s.expected_products))
        .bind(Json(&s.counted_products))
        .bind(Json(&s.activities))
        .bind(Json(&s.activity_status))
        .bind(Json(&s.assigned_users))
        .bind(Json(&s.user_roles))
        .bind(s.completed_at)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_code_conflict(e, &s.code))?;

        updated.ok_or(AppError::StaleVersion)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM inventory_schedules WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ScheduleNotFound);
        }
        Ok(())
    }
}
