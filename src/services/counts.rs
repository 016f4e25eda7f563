// src/services/counts.rs

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::schedule::{
        CountMetadata, CountStatus, CountValidation, InventoryCount, InventorySchedule,
        ValidationStep, ValidationVerdict,
    },
    services::variance::item_variance,
};

/// Papel, dentro do agendamento, de quem revisa as contagens.
pub const VALIDATOR_ROLE: &str = "Validador";
/// Papel dado ao criador do agendamento.
pub const COUNTER_ROLE: &str = "Apontador";

fn ensure_open(schedule: &InventorySchedule) -> Result<(), AppError> {
    if schedule.status.is_terminal() {
        return Err(AppError::ScheduleClosed);
    }
    Ok(())
}

/// Registra (ou refaz) a contagem de um produto. Fica uma entrada por produto.
pub fn record_count(
    schedule: &mut InventorySchedule,
    product_id: Uuid,
    counted_quantity: i32,
    counted_by: Uuid,
    now: DateTime<Utc>,
    notes: Option<String>,
    metadata: Option<CountMetadata>,
) -> Result<(), AppError> {
    ensure_open(schedule)?;

    let expected = schedule
        .expected_for(product_id)
        .map(|e| e.expected_quantity)
        .unwrap_or(0);

    let entry = InventoryCount {
        product_id,
        counted_quantity,
        counted_by,
        counted_at: now,
        notes: notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        variance: item_variance(expected, counted_quantity),
        validations: vec![CountValidation {
            step: ValidationStep::Counting,
            status: ValidationVerdict::Approved,
            validated_by: counted_by,
            validated_at: now,
            notes: None,
        }],
        status: CountStatus::Counted,
        metadata,
    };

    match schedule.counted_products.iter_mut().find(|c| c.product_id == product_id) {
        Some(existing) => *existing = entry,
        None => schedule.counted_products.push(entry),
    }
    Ok(())
}

/// Revisão do Validador sobre uma contagem já registrada.
pub fn review_count(
    schedule: &mut InventorySchedule,
    product_id: Uuid,
    verdict: ValidationVerdict,
    validated_by: Uuid,
    now: DateTime<Utc>,
    notes: Option<&str>,
) -> Result<(), AppError> {
    ensure_open(schedule)?;

    let notes = notes.map(str::trim).filter(|n| !n.is_empty()).map(String::from);
    if verdict == ValidationVerdict::Rejected && notes.is_none() {
        return Err(AppError::RejectionReasonRequired);
    }

    let count = schedule
        .counted_products
        .iter_mut()
        .find(|c| c.product_id == product_id)
        .ok_or(AppError::CountNotFound)?;

    count.validations.push(CountValidation {
        step: ValidationStep::ValidadorReview,
        status: verdict,
        validated_by,
        validated_at: now,
        notes,
    });
    count.status = match verdict {
        ValidationVerdict::Approved => CountStatus::Approved,
        ValidationVerdict::Rejected => CountStatus::Rejected,
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schedule::{ExpectedProduct, Priority, ScheduleStatus};
    use crate::services::variance::tests::schedule;

    fn with_expected(product_id: Uuid, qty: i32) -> InventorySchedule {
        let mut s = schedule();
        s.expected_products = vec![ExpectedProduct {
            product_id,
            expected_quantity: qty,
            current_stock: qty,
            priority: Priority::High,
        }];
        s
    }

    #[test]
    fn count_stores_variance_and_counting_step() {
        let p = Uuid::new_v4();
        let counter = Uuid::new_v4();
        let mut s = with_expected(p, 40);

        record_count(&mut s, p, 38, counter, Utc::now(), Some("  caixa aberta ".into()), None).unwrap();

        let c = s.count_for(p).unwrap();
        assert_eq!(c.variance, -2);
        assert_eq!(c.status, CountStatus::Counted);
        assert_eq!(c.notes.as_deref(), Some("caixa aberta"));
        assert_eq!(c.validations.len(), 1);
        assert_eq!(c.validations[0].step, ValidationStep::Counting);
        assert_eq!(c.validations[0].validated_by, counter);
    }

    #[test]
    fn recount_replaces_previous_entry() {
        let p = Uuid::new_v4();
        let mut s = with_expected(p, 10);

        record_count(&mut s, p, 8, Uuid::new_v4(), Utc::now(), None, None).unwrap();
        record_count(&mut s, p, 10, Uuid::new_v4(), Utc::now(), None, None).unwrap();

        assert_eq!(s.counted_products.len(), 1);
        assert_eq!(s.counted_products[0].variance, 0);
    }

    #[test]
    fn unexpected_product_counts_against_zero() {
        let mut s = schedule();
        let p = Uuid::new_v4();
        record_count(&mut s, p, 3, Uuid::new_v4(), Utc::now(), None, None).unwrap();
        assert_eq!(s.count_for(p).unwrap().variance, 3);
    }

    #[test]
    fn closed_schedule_refuses_counts() {
        let p = Uuid::new_v4();
        let mut s = with_expected(p, 10);
        s.status = ScheduleStatus::Cancelled;
        let err = record_count(&mut s, p, 8, Uuid::new_v4(), Utc::now(), None, None).unwrap_err();
        assert!(matches!(err, AppError::ScheduleClosed));
    }

    #[test]
    fn review_appends_step_and_sets_status() {
        let p = Uuid::new_v4();
        let reviewer = Uuid::new_v4();
        let mut s = with_expected(p, 10);
        record_count(&mut s, p, 9, Uuid::new_v4(), Utc::now(), None, None).unwrap();

        review_count(&mut s, p, ValidationVerdict::Approved, reviewer, Utc::now(), None).unwrap();

        let c = s.count_for(p).unwrap();
        assert_eq!(c.status, CountStatus::Approved);
        assert_eq!(c.validations.last().unwrap().step, ValidationStep::ValidadorReview);
        assert_eq!(c.validations.last().unwrap().validated_by, reviewer);
    }

    #[test]
    fn review_rejection_needs_notes() {
        let p = Uuid::new_v4();
        let mut s = with_expected(p, 10);
        record_count(&mut s, p, 9, Uuid::new_v4(), Utc::now(), None, None).unwrap();

        let err = review_count(&mut s, p, ValidationVerdict::Rejected, Uuid::new_v4(), Utc::now(), Some(" "))
            .unwrap_err();
        assert!(matches!(err, AppError::RejectionReasonRequired));
        assert_eq!(s.count_for(p).unwrap().validations.len(), 1);

        review_count(&mut s, p, ValidationVerdict::Rejected, Uuid::new_v4(), Utc::now(), Some("Recontar"))
            .unwrap();
        assert_eq!(s.count_for(p).unwrap().status, CountStatus::Rejected);
    }

    #[test]
    fn reviewing_uncounted_product_is_not_found() {
        let mut s = schedule();
        let err = review_count(&mut s, Uuid::new_v4(), ValidationVerdict::Approved, Uuid::new_v4(), Utc::now(), None)
            .unwrap_err();
        assert!(matches!(err, AppError::CountNotFound));
    }
}
