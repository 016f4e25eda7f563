// src/services/classification.rs

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::movement::{
        ApprovalStatus, ClassificationChange, ClassificationDraft, ClassificationInput,
        ClassificationPreview, ClassificationType, MovementClassification, StockMovement,
    },
};

/// Compras não passam por classificação ("Compra", "COMPRA", ...).
pub fn is_purchase(reason: &str) -> bool {
    reason.trim().eq_ignore_ascii_case("compra")
}

impl ClassificationDraft {
    pub fn new(total: i32) -> Self {
        Self { total: total.max(0), reemprego: 0, sucata: 0 }
    }

    /// Ajusta o reemprego em [0, restante]: a soma nunca passa do total.
    pub fn set_reemprego(&mut self, value: i32) {
        self.reemprego = value.clamp(0, self.total - self.sucata);
    }

    pub fn set_sucata(&mut self, value: i32) {
        self.sucata = value.clamp(0, self.total - self.reemprego);
    }

    pub fn all_reemprego(&mut self) {
        self.reemprego = self.total;
        self.sucata = 0;
    }

    pub fn all_sucata(&mut self) {
        self.reemprego = 0;
        self.sucata = self.total;
    }

    /// Metade (arredondada para baixo) no reemprego, o resto na sucata.
    pub fn split_half(&mut self) {
        self.reemprego = self.total / 2;
        self.sucata = self.total - self.reemprego;
    }

    pub fn apply(&mut self, change: ClassificationChange) {
        match change {
            ClassificationChange::SetReemprego { value } => self.set_reemprego(value),
            ClassificationChange::SetSucata { value } => self.set_sucata(value),
            ClassificationChange::AllReemprego => self.all_reemprego(),
            ClassificationChange::AllSucata => self.all_sucata(),
            ClassificationChange::SplitHalf => self.split_half(),
        }
    }

    pub fn classified(&self) -> i32 {
        self.reemprego + self.sucata
    }

    pub fn is_balanced(&self) -> bool {
        self.classified() == self.total
    }
}

/// Aplica uma mudança ao formulário e devolve o novo estado.
pub fn preview(
    quantity: i32,
    reason: &str,
    reemprego: i32,
    sucata: i32,
    change: Option<ClassificationChange>,
) -> ClassificationPreview {
    let mut draft = ClassificationDraft::new(quantity);
    draft.set_reemprego(reemprego);
    draft.set_sucata(sucata);
    if let Some(change) = change {
        draft.apply(change);
    }

    let purchase = is_purchase(reason);
    ClassificationPreview {
        reemprego: draft.reemprego,
        sucata: draft.sucata,
        classified: draft.classified(),
        remaining: draft.total - draft.classified(),
        balanced: purchase || draft.is_balanced(),
        purchase,
    }
}

fn trimmed(notes: Option<&str>) -> Option<String> {
    notes.map(str::trim).filter(|n| !n.is_empty()).map(String::from)
}

/// Lista de classificações para a aprovação.
///
/// Compra: lista vazia, sem validar nada. Demais: reemprego + sucata tem
/// que fechar exatamente com a quantidade da movimentação.
pub fn build_classifications(
    movement: &StockMovement,
    input: &ClassificationInput,
) -> Result<Vec<MovementClassification>, AppError> {
    if is_purchase(&movement.reason) {
        return Ok(Vec::new());
    }

    if input.reemprego_quantity < 0 || input.sucata_quantity < 0 {
        return Err(AppError::NegativeClassification);
    }

    // Soma que estoura i32 nunca fecha com a quantidade.
    let classified = input
        .reemprego_quantity
        .checked_add(input.sucata_quantity)
        .ok_or(AppError::UnbalancedClassification {
            classified: i32::MAX,
            expected: movement.quantity,
        })?;
    if classified != movement.quantity {
        return Err(AppError::UnbalancedClassification {
            classified,
            expected: movement.quantity,
        });
    }

    let mut out = Vec::with_capacity(2);
    if input.reemprego_quantity > 0 {
        out.push(MovementClassification {
            kind: ClassificationType::Reemprego,
            quantity: input.reemprego_quantity,
            notes: trimmed(input.reemprego_notes.as_deref()),
        });
    }
    if input.sucata_quantity > 0 {
        out.push(MovementClassification {
            kind: ClassificationType::Sucata,
            quantity: input.sucata_quantity,
            notes: trimmed(input.sucata_notes.as_deref()),
        });
    }
    Ok(out)
}

fn ensure_pending(movement: &StockMovement) -> Result<(), AppError> {
    if movement.approval_status != ApprovalStatus::Pending {
        return Err(AppError::MovementAlreadyResolved);
    }
    Ok(())
}

/// Valida tudo antes de tocar na movimentação: em erro, nada muda.
pub fn approve(
    movement: &mut StockMovement,
    approver: Uuid,
    now: DateTime<Utc>,
    input: &ClassificationInput,
    notes: Option<&str>,
) -> Result<(), AppError> {
    ensure_pending(movement)?;
    let classifications = build_classifications(movement, input)?;

    movement.approval_status = ApprovalStatus::Approved;
    movement.approved_by = Some(approver);
    movement.approved_at = Some(now);
    movement.approval_notes = trimmed(notes);
    movement.classifications = classifications;
    Ok(())
}

pub fn reject(
    movement: &mut StockMovement,
    approver: Uuid,
    now: DateTime<Utc>,
    notes: &str,
) -> Result<(), AppError> {
    ensure_pending(movement)?;
    let notes = trimmed(Some(notes)).ok_or(AppError::RejectionReasonRequired)?;

    movement.approval_status = ApprovalStatus::Rejected;
    movement.approved_by = Some(approver);
    movement.approved_at = Some(now);
    movement.approval_notes = Some(notes);
    Ok(())
}
