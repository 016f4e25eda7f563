// src/services/transfer.rs

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        movement::{MovementType, StockMovement, TransferData, TransferStatus},
        product::{NewProduct, Product},
    },
};

pub const UNKNOWN_ORIGIN: &str = "Origem não especificada";
pub const UNKNOWN_DESTINATION: &str = "Destino não especificado";

/// "TRF-" + 8 primeiros caracteres do id da movimentação.
pub fn tracking_code(movement_id: Uuid) -> String {
    let id = movement_id.simple().to_string();
    format!("TRF-{}", id[..8].to_uppercase())
}

/// Dados iniciais de uma transferência recém-criada.
pub fn new_transfer_data(
    movement_id: Uuid,
    from_warehouse: &str,
    to_warehouse: &str,
    sent_by: Uuid,
    sent_at: DateTime<Utc>,
    expected_delivery_date: Option<DateTime<Utc>>,
    transport_notes: Option<String>,
) -> Result<TransferData, AppError> {
    let from = from_warehouse.trim();
    let to = to_warehouse.trim();
    if from.is_empty() || to.is_empty() {
        return Err(AppError::TransferWarehousesRequired);
    }
    if from == to {
        return Err(AppError::SameWarehouseTransfer);
    }

    Ok(TransferData {
        from_warehouse: from.to_string(),
        to_warehouse: to.to_string(),
        transfer_status: TransferStatus::Pending,
        sent_by,
        sent_at,
        received_by: None,
        received_at: None,
        rejected_by: None,
        rejected_at: None,
        rejection_reason: None,
        tracking_code: tracking_code(movement_id),
        expected_delivery_date,
        actual_delivery_date: None,
        transport_notes,
        receipt_notes: None,
    })
}

/// Transferências antigas podem não ter `transfer_data`: monta um padrão
/// pendente em vez de falhar.
pub fn transfer_data_or_default(movement: &StockMovement) -> Result<TransferData, AppError> {
    if movement.movement_type != MovementType::Transfer {
        return Err(AppError::NotATransfer);
    }
    if let Some(data) = &movement.transfer_data {
        return Ok(data.clone());
    }

    tracing::warn!("Transferência {} sem dados de transferência; usando padrão", movement.id);
    Ok(TransferData {
        from_warehouse: UNKNOWN_ORIGIN.to_string(),
        to_warehouse: UNKNOWN_DESTINATION.to_string(),
        transfer_status: TransferStatus::Pending,
        sent_by: movement.user_id,
        sent_at: movement.created_at,
        received_by: None,
        received_at: None,
        rejected_by: None,
        rejected_at: None,
        rejection_reason: None,
        tracking_code: tracking_code(movement.id),
        expected_delivery_date: None,
        actual_delivery_date: None,
        transport_notes: None,
        receipt_notes: None,
    })
}

fn ensure_open(data: &TransferData) -> Result<(), AppError> {
    if data.transfer_status.is_resolved() {
        return Err(AppError::TransferAlreadyResolved);
    }
    Ok(())
}

/// pending -> in_transit
pub fn dispatch(data: &mut TransferData) -> Result<(), AppError> {
    ensure_open(data)?;
    if data.transfer_status != TransferStatus::Pending {
        return Err(AppError::TransferNotDispatchable);
    }
    data.transfer_status = TransferStatus::InTransit;
    Ok(())
}

/// O que fazer com o estoque do armazém de destino.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiptPlan {
    /// Já existe o mesmo SKU no destino: soma a quantidade.
    IncrementStock {
        product_id: Uuid,
        version: i32,
        new_stock: i32,
    },
    /// Não existe: cria uma cópia do produto de origem no destino.
    CreateProduct(NewProduct),
}

pub fn plan_receipt(
    source: &Product,
    destination: Option<&Product>,
    quantity: i32,
    to_warehouse: &str,
) -> Result<ReceiptPlan, AppError> {
    match destination {
        Some(existing) => {
            let new_stock = existing
                .current_stock
                .checked_add(quantity)
                .ok_or_else(|| anyhow::anyhow!("Estoque do produto {} estourou", existing.id))?;
            Ok(ReceiptPlan::IncrementStock {
                product_id: existing.id,
                version: existing.version,
                new_stock,
            })
        }
        None => Ok(ReceiptPlan::CreateProduct(NewProduct {
            sku: source.sku.clone(),
            name: source.name.clone(),
            unit: source.unit.clone(),
            purchase_price: source.purchase_price,
            current_stock: quantity,
            location: source.location.moved_to(to_warehouse),
        })),
    }
}

fn trimmed(notes: Option<&str>) -> Option<String> {
    notes.map(str::trim).filter(|n| !n.is_empty()).map(String::from)
}

pub fn mark_received(
    data: &mut TransferData,
    actor: Uuid,
    now: DateTime<Utc>,
    notes: Option<&str>,
) -> Result<(), AppError> {
    ensure_open(data)?;
    data.transfer_status = TransferStatus::Received;
    data.received_by = Some(actor);
    data.received_at = Some(now);
    data.actual_delivery_date = Some(now);
    data.receipt_notes = trimmed(notes);
    Ok(())
}

/// O estoque de origem não é devolvido aqui.
pub fn mark_rejected(
    data: &mut TransferData,
    actor: Uuid,
    now: DateTime<Utc>,
    reason: &str,
    notes: Option<&str>,
) -> Result<(), AppError> {
    ensure_open(data)?;
    let reason = trimmed(Some(reason)).ok_or(AppError::RejectionReasonRequired)?;

    data.transfer_status = TransferStatus::Rejected;
    data.rejected_by = Some(actor);
    data.rejected_at = Some(now);
    data.rejection_reason = Some(reason);
    data.receipt_notes = trimmed(notes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{classification::tests::movement, variance::tests::product};
    use rust_decimal::Decimal;

    fn pending_transfer() -> StockMovement {
        let mut m = movement(MovementType::Transfer, 4, "Reposição");
        let data = new_transfer_data(m.id, "Central", "Filial Norte", m.user_id, m.created_at, None, None)
            .unwrap();
        m.transfer_data = Some(data);
        m
    }

    #[test]
    fn tracking_code_uses_movement_prefix() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(tracking_code(id), "TRF-550E8400");
    }

    #[test]
    fn warehouses_must_be_present_and_distinct() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        assert!(matches!(
            new_transfer_data(id, "Central", " Central ", id, now, None, None),
            Err(AppError::SameWarehouseTransfer)
        ));
        assert!(matches!(
            new_transfer_data(id, "", "Filial", id, now, None, None),
            Err(AppError::TransferWarehousesRequired)
        ));
    }

    #[test]
    fn legacy_transfer_gets_placeholder_data() {
        let m = movement(MovementType::Transfer, 4, "Reposição");
        let data = transfer_data_or_default(&m).unwrap();

        assert_eq!(data.from_warehouse, UNKNOWN_ORIGIN);
        assert_eq!(data.to_warehouse, UNKNOWN_DESTINATION);
        assert_eq!(data.transfer_status, TransferStatus::Pending);
        assert_eq!(data.sent_by, m.user_id);
    }

    #[test]
    fn non_transfer_has_no_transfer_data() {
        let m = movement(MovementType::Exit, 4, "Obra");
        assert!(matches!(transfer_data_or_default(&m), Err(AppError::NotATransfer)));
    }

    #[test]
    fn existing_destination_product_is_incremented() {
        let source = product(Decimal::new(1250, 2));
        let mut dest = product(Decimal::new(1250, 2));
        dest.current_stock = 6;
        dest.version = 3;

        let plan = plan_receipt(&source, Some(&dest), 4, "Filial Norte").unwrap();
        assert_eq!(
            plan,
            ReceiptPlan::IncrementStock { product_id: dest.id, version: 3, new_stock: 10 }
        );
    }

    #[test]
    fn missing_destination_product_is_cloned_with_transferred_stock() {
        let mut source = product(Decimal::new(1250, 2));
        source.current_stock = 30;
        source.location.position = Some("2".into());

        let ReceiptPlan::CreateProduct(new) = plan_receipt(&source, None, 4, "Filial Norte").unwrap()
        else {
            panic!("esperava criação de produto");
        };

        assert_eq!(new.sku, source.sku);
        assert_eq!(new.current_stock, 4);
        assert_eq!(new.location.warehouse, "Filial Norte");
        assert_eq!(new.location.id, "Filial Norte-A-1-2");
    }

    #[test]
    fn receiving_twice_is_refused() {
        let m = pending_transfer();
        let mut data = transfer_data_or_default(&m).unwrap();
        let actor = Uuid::new_v4();

        mark_received(&mut data, actor, Utc::now(), Some(" tudo certo ")).unwrap();
        assert_eq!(data.transfer_status, TransferStatus::Received);
        assert_eq!(data.received_by, Some(actor));
        assert!(data.actual_delivery_date.is_some());
        assert_eq!(data.receipt_notes.as_deref(), Some("tudo certo"));

        let snapshot = data.clone();
        let err = mark_received(&mut data, actor, Utc::now(), None).unwrap_err();
        assert!(matches!(err, AppError::TransferAlreadyResolved));
        assert_eq!(data, snapshot);
    }

    #[test]
    fn rejection_requires_reason_and_is_terminal() {
        let m = pending_transfer();
        let mut data = transfer_data_or_default(&m).unwrap();

        assert!(matches!(
            mark_rejected(&mut data, Uuid::new_v4(), Utc::now(), "  ", None),
            Err(AppError::RejectionReasonRequired)
        ));
        assert_eq!(data.transfer_status, TransferStatus::Pending);

        mark_rejected(&mut data, Uuid::new_v4(), Utc::now(), "Material avariado", None).unwrap();
        assert_eq!(data.rejection_reason.as_deref(), Some("Material avariado"));
        assert!(matches!(
            mark_received(&mut data, Uuid::new_v4(), Utc::now(), None),
            Err(AppError::TransferAlreadyResolved)
        ));
    }

    #[test]
    fn dispatch_only_from_pending() {
        let m = pending_transfer();
        let mut data = transfer_data_or_default(&m).unwrap();

        dispatch(&mut data).unwrap();
        assert_eq!(data.transfer_status, TransferStatus::InTransit);
        assert!(matches!(dispatch(&mut data), Err(AppError::TransferNotDispatchable)));

        // Em trânsito ainda pode ser recebida.
        mark_received(&mut data, Uuid::new_v4(), Utc::now(), None).unwrap();
        assert!(matches!(dispatch(&mut data), Err(AppError::TransferAlreadyResolved)));
    }
}
