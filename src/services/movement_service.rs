// src/services/movement_service.rs

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_audited, error::AppError},
    db::{MovementRepository, ProductRepository},
    models::movement::{
        ApprovalStatus, ClassificationInput, MovementDetails, MovementType, NewMovement,
        StockMovement,
    },
    services::{
        classification,
        transfer::{self, ReceiptPlan},
        user_directory::UserDirectory,
        user_service::UserService,
    },
};

/// Dados de uma movimentação nova, já validados no formato.
#[derive(Debug, Clone)]
pub struct MovementRequest {
    pub movement_type: MovementType,
    pub product_id: Uuid,
    pub quantity: i32,
    pub reason: String,
    pub price: Option<Decimal>,
    pub notes: Option<String>,
    pub batch: Option<String>,
    pub obra: Option<String>,
    pub nota_fiscal: Option<String>,
    pub attachments: Vec<String>,
    pub from_warehouse: Option<String>,
    pub to_warehouse: Option<String>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub transport_notes: Option<String>,
}

/// Estoque depois da movimentação.
///
/// Entrada soma, saída e transferência subtraem (sem ficar negativo) e
/// ajuste troca pelo valor informado.
pub fn next_stock(kind: MovementType, previous: i32, quantity: i32) -> Result<i32, AppError> {
    let insufficient = || AppError::InsufficientStock { available: previous, requested: quantity };
    match kind {
        MovementType::Entry => previous
            .checked_add(quantity)
            .ok_or_else(|| anyhow::anyhow!("Estoque estourou o limite").into()),
        MovementType::Exit | MovementType::Transfer => {
            let next = previous.checked_sub(quantity).ok_or_else(insufficient)?;
            if next < 0 {
                return Err(insufficient());
            }
            Ok(next)
        }
        MovementType::Adjustment => Ok(quantity),
    }
}

/// Motivo sem espaços nas pontas. Motivo em branco ou quantidade não positiva
/// voltam como erro de validação do campo.
pub fn checked_reason(req: &MovementRequest) -> Result<String, AppError> {
    let reason = req.reason.trim();
    if reason.is_empty() {
        return Err(AppError::invalid_field("reason", "required", "O motivo é obrigatório."));
    }
    if req.quantity <= 0 {
        return Err(AppError::invalid_field("quantity", "range", "A quantidade deve ser maior que zero."));
    }
    Ok(reason.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn referenced_users(movement: &StockMovement) -> BTreeSet<Uuid> {
    let mut ids = BTreeSet::new();
    ids.insert(movement.user_id);
    ids.extend(movement.approved_by);
    if let Some(data) = &movement.transfer_data {
        ids.insert(data.sent_by);
        ids.extend(data.received_by);
        ids.extend(data.rejected_by);
    }
    ids
}

pub fn details(mut movement: StockMovement, directory: &UserDirectory) -> MovementDetails {
    if movement.movement_type == MovementType::Transfer && movement.transfer_data.is_none() {
        movement.transfer_data = transfer::transfer_data_or_default(&movement).ok();
    }
    let user_names = referenced_users(&movement)
        .into_iter()
        .map(|id| (id, directory.name_of(Some(id))))
        .collect();
    MovementDetails { movement, user_names }
}

#[derive(Clone)]
pub struct MovementService {
    movement_repo: MovementRepository,
    product_repo: ProductRepository,
    users: UserService,
    pool: PgPool,
}

impl MovementService {
    pub fn new(
        movement_repo: MovementRepository,
        product_repo: ProductRepository,
        users: UserService,
        pool: PgPool,
    ) -> Self {
        Self { movement_repo, product_repo, users, pool }
    }

    pub async fn create_movement(&self, actor: Uuid, req: MovementRequest) -> Result<StockMovement, AppError> {
        let reason = checked_reason(&req)?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        let transfer_data = match req.movement_type {
            MovementType::Transfer => Some(transfer::new_transfer_data(
                id,
                req.from_warehouse.as_deref().unwrap_or_default(),
                req.to_warehouse.as_deref().unwrap_or_default(),
                actor,
                now,
                req.expected_delivery_date,
                non_empty(req.transport_notes),
            )?),
            _ => None,
        };

        // --- INÍCIO DA TRANSAÇÃO: estoque + movimentação juntos ---
        let mut tx = begin_audited(&self.pool, actor).await?;

        let product = self
            .product_repo
            .lock_by_id(&mut *tx, req.product_id)
            .await?
            .ok_or(AppError::ProductNotFound)?;

        let new_stock = next_stock(req.movement_type, product.current_stock, req.quantity)?;
        self.product_repo
            .set_stock(&mut *tx, product.id, product.version, new_stock)
            .await?;

        let new = NewMovement {
            movement_type: req.movement_type,
            product_id: product.id,
            quantity: req.quantity,
            previous_stock: product.current_stock,
            new_stock,
            reason,
            price: req.price,
            batch: non_empty(req.batch),
            obra: non_empty(req.obra),
            nota_fiscal: non_empty(req.nota_fiscal),
            notes: non_empty(req.notes),
            user_id: actor,
            attachments: req.attachments,
        };
        let movement = self
            .movement_repo
            .create(&mut *tx, id, &new, transfer_data.as_ref())
            .await?;

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        tracing::info!(
            "Movimentação {} ({:?}) do produto {}: {} -> {}",
            movement.id,
            movement.movement_type,
            movement.product_id,
            movement.previous_stock,
            movement.new_stock
        );
        Ok(movement)
    }

    pub async fn list_movements(&self, status: Option<ApprovalStatus>) -> Result<Vec<MovementDetails>, AppError> {
        let movements = self.movement_repo.list(status).await?;
        let directory = self.users.directory().await?;
        Ok(movements.into_iter().map(|m| details(m, directory)).collect())
    }

    pub async fn get_movement(&self, id: Uuid) -> Result<MovementDetails, AppError> {
        let movement = self
            .movement_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::MovementNotFound)?;
        Ok(details(movement, self.users.directory().await?))
    }

    /// Abre a transação e trava a movimentação.
    async fn lock(
        &self,
        actor: Uuid,
        id: Uuid,
        expected_version: Option<i32>,
    ) -> Result<(Transaction<'static, Postgres>, StockMovement), AppError> {
        let mut tx = begin_audited(&self.pool, actor).await?;
        let movement = self
            .movement_repo
            .lock_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::MovementNotFound)?;
        if expected_version.is_some_and(|v| v != movement.version) {
            return Err(AppError::StaleVersion);
        }
        Ok((tx, movement))
    }

    pub async fn approve_movement(
        &self,
        actor: Uuid,
        id: Uuid,
        expected_version: Option<i32>,
        input: ClassificationInput,
        notes: Option<String>,
    ) -> Result<StockMovement, AppError> {
        let (mut tx, mut movement) = self.lock(actor, id, expected_version).await?;

        classification::approve(&mut movement, actor, Utc::now(), &input, notes.as_deref())?;
        let saved = self.movement_repo.update(&mut *tx, &movement).await?;
        tx.commit().await?;

        tracing::info!(
            "Movimentação {} aprovada por {} ({} classificações)",
            id,
            actor,
            saved.classifications.len()
        );
        Ok(saved)
    }

    pub async fn reject_movement(
        &self,
        actor: Uuid,
        id: Uuid,
        expected_version: Option<i32>,
        notes: &str,
    ) -> Result<StockMovement, AppError> {
        let (mut tx, mut movement) = self.lock(actor, id, expected_version).await?;

        classification::reject(&mut movement, actor, Utc::now(), notes)?;
        let saved = self.movement_repo.update(&mut *tx, &movement).await?;
        tx.commit().await?;

        tracing::info!("Movimentação {} rejeitada por {}", id, actor);
        Ok(saved)
    }

    pub async fn dispatch_transfer(
        &self,
        actor: Uuid,
        id: Uuid,
        expected_version: Option<i32>,
    ) -> Result<StockMovement, AppError> {
        let (mut tx, mut movement) = self.lock(actor, id, expected_version).await?;

        let mut data = transfer::transfer_data_or_default(&movement)?;
        transfer::dispatch(&mut data)?;
        movement.transfer_data = Some(data);

        let saved = self.movement_repo.update(&mut *tx, &movement).await?;
        tx.commit().await?;

        tracing::info!("Transferência {} despachada por {}", id, actor);
        Ok(saved)
    }

    /// Recebimento: estoque do destino e situação da transferência na mesma
    /// transação. Transferência já resolvida não mexe em estoque.
    pub async fn receive_transfer(
        &self,
        actor: Uuid,
        id: Uuid,
        expected_version: Option<i32>,
        notes: Option<String>,
    ) -> Result<StockMovement, AppError> {
        let (mut tx, mut movement) = self.lock(actor, id, expected_version).await?;

        let mut data = transfer::transfer_data_or_default(&movement)?;
        transfer::mark_received(&mut data, actor, Utc::now(), notes.as_deref())?;

        let source = self
            .product_repo
            .lock_by_id(&mut *tx, movement.product_id)
            .await?
            .ok_or(AppError::ProductNotFound)?;
        let destination = self
            .product_repo
            .lock_by_sku_in_warehouse(&mut *tx, &source.sku, &data.to_warehouse)
            .await?;

        match transfer::plan_receipt(&source, destination.as_ref(), movement.quantity, &data.to_warehouse)? {
            ReceiptPlan::IncrementStock { product_id, version, new_stock } => {
                self.product_repo
                    .set_stock(&mut *tx, product_id, version, new_stock)
                    .await?;
                tracing::info!("Produto {} no destino agora com {} unidades", product_id, new_stock);
            }
            ReceiptPlan::CreateProduct(new) => {
                let created = self.product_repo.create(&mut *tx, &new).await?;
                tracing::info!(
                    "Produto {} criado em {} com {} unidades",
                    created.id,
                    created.location.warehouse,
                    created.current_stock
                );
            }
        }

        movement.transfer_data = Some(data);
        let saved = self.movement_repo.update(&mut *tx, &movement).await?;
        tx.commit().await?;

        tracing::info!("Transferência {} recebida por {}", id, actor);
        Ok(saved)
    }

    /// Rejeição não devolve o estoque de origem.
    pub async fn reject_transfer(
        &self,
        actor: Uuid,
        id: Uuid,
        expected_version: Option<i32>,
        reason: &str,
        notes: Option<String>,
    ) -> Result<StockMovement, AppError> {
        let (mut tx, mut movement) = self.lock(actor, id, expected_version).await?;

        let mut data = transfer::transfer_data_or_default(&movement)?;
        transfer::mark_rejected(&mut data, actor, Utc::now(), reason, notes.as_deref())?;
        movement.transfer_data = Some(data);

        let saved = self.movement_repo.update(&mut *tx, &movement).await?;
        tx.commit().await?;

        tracing::info!("Transferência {} rejeitada por {}", id, actor);
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::movement::TransferStatus, services::classification::tests::movement};

    #[test]
    fn stock_rules_per_movement_type() {
        assert_eq!(next_stock(MovementType::Entry, 10, 5).unwrap(), 15);
        assert_eq!(next_stock(MovementType::Exit, 10, 4).unwrap(), 6);
        assert_eq!(next_stock(MovementType::Transfer, 10, 10).unwrap(), 0);
        assert_eq!(next_stock(MovementType::Adjustment, 10, 3).unwrap(), 3);
    }

    #[test]
    fn exits_cannot_drive_stock_negative() {
        for kind in [MovementType::Exit, MovementType::Transfer] {
            let err = next_stock(kind, 3, 4).unwrap_err();
            assert!(matches!(err, AppError::InsufficientStock { available: 3, requested: 4 }));
        }
    }

    fn request(quantity: i32, reason: &str) -> MovementRequest {
        MovementRequest {
            movement_type: MovementType::Exit,
            product_id: Uuid::new_v4(),
            quantity,
            reason: reason.into(),
            price: None,
            notes: None,
            batch: None,
            obra: None,
            nota_fiscal: None,
            attachments: vec![],
            from_warehouse: None,
            to_warehouse: None,
            expected_delivery_date: None,
            transport_notes: None,
        }
    }

    #[test]
    fn blank_reason_is_a_client_error() {
        let err = checked_reason(&request(2, "   ")).unwrap_err();
        assert!(matches!(&err, AppError::ValidationError(e) if e.field_errors().contains_key("reason")));
        assert_eq!(err.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);

        let err = checked_reason(&request(0, "Venda")).unwrap_err();
        assert!(matches!(&err, AppError::ValidationError(e) if e.field_errors().contains_key("quantity")));

        assert_eq!(checked_reason(&request(2, " Venda ")).unwrap(), "Venda");
    }

    #[test]
    fn entry_overflow_is_an_error_not_a_wrap() {
        assert!(next_stock(MovementType::Entry, i32::MAX, 1).is_err());
    }

    #[test]
    fn legacy_transfer_details_get_placeholder_data() {
        let m = movement(MovementType::Transfer, 3, "Reposição");
        let directory = UserDirectory::new(std::time::Duration::from_secs(60));

        let view = details(m.clone(), &directory);

        let data = view.movement.transfer_data.unwrap();
        assert_eq!(data.to_warehouse, transfer::UNKNOWN_DESTINATION);
        assert_eq!(data.transfer_status, TransferStatus::Pending);
        assert_eq!(
            view.user_names.get(&m.user_id).cloned(),
            Some(format!("Usuário {}", m.user_id))
        );
    }

    #[test]
    fn non_transfer_details_have_no_transfer_data() {
        let m = movement(MovementType::Exit, 3, "Obra");
        let directory = UserDirectory::new(std::time::Duration::from_secs(60));
        assert!(details(m, &directory).movement.transfer_data.is_none());
    }
}
