// src/services/schedule_status.rs

use chrono::{DateTime, Utc};

use crate::models::schedule::{ActivityStatus, InventorySchedule, ScheduleStatus};

/// Próximo status automático, ou `None` quando nada muda.
///
/// `cancelled` nunca é automático e `completed` nunca sai do lugar.
pub fn next_status(
    current: ScheduleStatus,
    activities: &[ActivityStatus],
    scheduled_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<ScheduleStatus> {
    use ScheduleStatus::*;

    let total = activities.len();
    let done = activities.iter().filter(|a| a.completed).count();

    match current {
        Scheduled | InProgress | Overdue if total > 0 && done == total => Some(Completed),
        Scheduled | Overdue if done > 0 && done < total => Some(InProgress),
        Scheduled if scheduled_date < now && done == 0 => Some(Overdue),
        _ => None,
    }
}

/// Aplica a regra sobre o agendamento. Retorna `true` se algo mudou.
/// Rodar de novo sem mudanças nas atividades não altera nada.
pub fn apply_status_rules(schedule: &mut InventorySchedule, now: DateTime<Utc>) -> bool {
    let activities = schedule.normalized_activities();
    let Some(next) = next_status(schedule.status, &activities, schedule.scheduled_date, now) else {
        return false;
    };

    tracing::info!(
        "Agendamento {} mudou de status: {:?} -> {:?}",
        schedule.id,
        schedule.status,
        next
    );

    schedule.status = next;
    if next == ScheduleStatus::Completed {
        schedule.completed_at = Some(now);
    }
    true
}
