// src/services/activities.rs

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::schedule::{ActivityProgress, ActivityStatus, Geolocation, InventorySchedule},
    services::variance::rounded_percentage,
};

pub const ADDRESS_UNAVAILABLE: &str = "Endereço não disponível";
pub const LOCATION_NOT_AUTHORIZED: &str = "Localização não autorizada";

/// Forma canônica da lista de atividades.
///
/// `activity_status` preenchido vence; senão os textos antigos (`activities`)
/// viram atividades pendentes; senão a lista fica vazia.
pub fn normalize_activities(activity_status: &[ActivityStatus], legacy: &[String]) -> Vec<ActivityStatus> {
    if !activity_status.is_empty() {
        return activity_status.to_vec();
    }
    legacy.iter().map(|text| ActivityStatus::pending(text.as_str())).collect()
}

impl InventorySchedule {
    pub fn normalized_activities(&self) -> Vec<ActivityStatus> {
        normalize_activities(&self.activity_status, &self.activities)
    }

    pub fn progress(&self) -> ActivityProgress {
        progress(&self.normalized_activities())
    }
}

pub fn progress(activities: &[ActivityStatus]) -> ActivityProgress {
    let total = activities.len();
    let done = activities.iter().filter(|a| a.completed).count();
    ActivityProgress {
        total_activities: total,
        completed_activities: done,
        percentage: rounded_percentage(done, total),
    }
}

/// Monta a lista a partir dos textos do formulário, preservando o registro de
/// conclusão das atividades cujo texto não mudou.
pub fn rebuild_from_texts(texts: &[String], existing: &[ActivityStatus]) -> Vec<ActivityStatus> {
    texts
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|text| {
            existing
                .iter()
                .find(|a| a.text == text)
                .cloned()
                .unwrap_or_else(|| ActivityStatus::pending(text))
        })
        .collect()
}

/// Checklist enviado pelo cliente de uma vez.
///
/// Só o texto e a marcação vêm do cliente. Conclusão que já existia com o mesmo
/// texto é mantida; conclusão nova é carimbada com `actor` e `now`.
pub fn merge_progress(
    submitted: Vec<ActivityStatus>,
    existing: &[ActivityStatus],
    actor: Uuid,
    now: DateTime<Utc>,
) -> Vec<ActivityStatus> {
    submitted
        .into_iter()
        .filter(|a| !a.text.trim().is_empty())
        .map(|a| {
            let text = a.text.trim().to_string();
            if !a.completed {
                return ActivityStatus::pending(text);
            }
            if let Some(kept) = existing.iter().find(|e| e.completed && e.text == text) {
                return kept.clone();
            }
            let mut fresh = [ActivityStatus::pending(text)];
            let completion = Completion {
                actor,
                at: now,
                geolocation: a.geolocation,
                address: a.address,
            };
            // Índice 0 de uma lista de um item sempre existe.
            let _ = set_completion(&mut fresh, 0, true, completion);
            let [merged] = fresh;
            merged
        })
        .collect()
}

/// Quem concluiu, quando e onde.
#[derive(Debug, Clone)]
pub struct Completion {
    pub actor: Uuid,
    pub at: DateTime<Utc>,
    pub geolocation: Option<Geolocation>,
    pub address: Option<String>,
}

pub fn set_completion(
    activities: &mut [ActivityStatus],
    index: usize,
    completed: bool,
    completion: Completion,
) -> Result<(), AppError> {
    let activity = activities
        .get_mut(index)
        .ok_or(AppError::ActivityIndexOutOfRange(index))?;

    if !completed {
        *activity = ActivityStatus::pending(std::mem::take(&mut activity.text));
        return Ok(());
    }

    let address = match (completion.address, completion.geolocation) {
        (Some(addr), _) if !addr.trim().is_empty() => addr.trim().to_string(),
        (_, Some(_)) => ADDRESS_UNAVAILABLE.to_string(),
        (_, None) => LOCATION_NOT_AUTHORIZED.to_string(),
    };

    activity.completed = true;
    activity.completed_by = Some(completion.actor);
    activity.completed_at = Some(completion.at);
    activity.geolocation = completion.geolocation;
    activity.address = Some(address);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done(text: &str) -> ActivityStatus {
        ActivityStatus {
            completed: true,
            completed_by: Some(Uuid::nil()),
            completed_at: Some(Utc::now()),
            ..ActivityStatus::pending(text)
        }
    }

    fn completion(geolocation: Option<Geolocation>, address: Option<&str>) -> Completion {
        Completion {
            actor: Uuid::new_v4(),
            at: Utc::now(),
            geolocation,
            address: address.map(String::from),
        }
    }

    #[test]
    fn current_status_list_is_used_unmodified() {
        let status = vec![done("Contar corredor A")];
        let legacy = vec!["ignorado".to_string()];
        assert_eq!(normalize_activities(&status, &legacy), status);
    }

    #[test]
    fn legacy_texts_become_pending_activities() {
        let legacy = vec!["Contar corredor A".to_string(), "Contar corredor B".to_string()];
        let normalized = normalize_activities(&[], &legacy);

        assert_eq!(normalized.len(), 2);
        assert!(normalized.iter().all(|a| !a.completed));
        assert_eq!(normalized[1].text, "Contar corredor B");
    }

    #[test]
    fn nothing_at_all_yields_empty_list() {
        assert!(normalize_activities(&[], &[]).is_empty());
    }

    #[test]
    fn progress_rounds_and_guards_zero() {
        let activities = vec![done("a"), ActivityStatus::pending("b"), ActivityStatus::pending("c")];
        let p = progress(&activities);
        assert_eq!((p.total_activities, p.completed_activities, p.percentage), (3, 1, 33));
        assert_eq!(progress(&[]).percentage, 0);
    }

    #[test]
    fn rebuild_keeps_existing_completion_and_drops_blanks() {
        let existing = vec![done("Contar corredor A"), ActivityStatus::pending("Removida")];
        let texts = vec![" Contar corredor A ".to_string(), "  ".to_string(), "Nova".to_string()];

        let rebuilt = rebuild_from_texts(&texts, &existing);

        assert_eq!(rebuilt.len(), 2);
        assert!(rebuilt[0].completed);
        assert_eq!(rebuilt[1], ActivityStatus::pending("Nova"));
    }

    #[test]
    fn completing_stamps_actor_time_and_address() {
        let mut activities = vec![ActivityStatus::pending("a")];
        let geo = Geolocation { latitude: -23.5, longitude: -46.6 };
        let c = completion(Some(geo), Some("Rua das Flores, 10 - Centro"));
        let actor = c.actor;

        set_completion(&mut activities, 0, true, c).unwrap();

        assert!(activities[0].completed);
        assert_eq!(activities[0].completed_by, Some(actor));
        assert_eq!(activities[0].geolocation, Some(geo));
        assert_eq!(activities[0].address.as_deref(), Some("Rua das Flores, 10 - Centro"));
    }

    #[test]
    fn address_placeholders_degrade_gracefully() {
        let mut activities = vec![ActivityStatus::pending("a"), ActivityStatus::pending("b")];
        let geo = Geolocation { latitude: 0.0, longitude: 0.0 };

        set_completion(&mut activities, 0, true, completion(Some(geo), None)).unwrap();
        set_completion(&mut activities, 1, true, completion(None, Some("   "))).unwrap();

        assert_eq!(activities[0].address.as_deref(), Some(ADDRESS_UNAVAILABLE));
        assert_eq!(activities[1].address.as_deref(), Some(LOCATION_NOT_AUTHORIZED));
    }

    #[test]
    fn uncompleting_clears_every_completion_field() {
        let mut activities = vec![done("a")];
        set_completion(&mut activities, 0, false, completion(None, None)).unwrap();
        assert_eq!(activities[0], ActivityStatus::pending("a"));
    }

    #[test]
    fn submitted_progress_cannot_forge_completion() {
        let actor = Uuid::new_v4();
        let now = Utc::now();
        let previous = done("Contar corredor A");
        let forged = ActivityStatus {
            completed: true,
            completed_by: Some(Uuid::nil()),
            completed_at: None,
            ..ActivityStatus::pending(" Contar corredor B ")
        };
        let unchecked = ActivityStatus {
            completed_by: Some(Uuid::nil()),
            ..ActivityStatus::pending("Contar corredor C")
        };
        let submitted = vec![previous.clone(), forged, ActivityStatus::pending("   "), unchecked];

        let merged = merge_progress(submitted, &[previous.clone()], actor, now);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0], previous);
        assert_eq!(merged[1].text, "Contar corredor B");
        assert_eq!(merged[1].completed_by, Some(actor));
        assert_eq!(merged[1].completed_at, Some(now));
        assert_eq!(merged[1].address.as_deref(), Some(LOCATION_NOT_AUTHORIZED));
        assert_eq!(merged[2], ActivityStatus::pending("Contar corredor C"));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut activities = vec![ActivityStatus::pending("a")];
        let err = set_completion(&mut activities, 3, true, completion(None, None)).unwrap_err();
        assert!(matches!(err, AppError::ActivityIndexOutOfRange(3)));
    }
}
