// src/common/db_utils.rs

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::error::AppError;

// ---
// Helper de auditoria
// ---
/// Abre uma transação marcada com o usuário que está escrevendo
/// (`app.user_id`), para os gatilhos de auditoria do banco.
pub(crate) async fn begin_audited(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Transaction<'static, Postgres>, AppError> {
    let mut tx = pool.begin().await?;

    // `true` = vale só até o fim da transação
    sqlx::query("SELECT set_config('app.user_id', $1, true)")
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
