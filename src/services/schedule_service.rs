// src/services/schedule_service.rs

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_audited, error::AppError},
    db::{ProductRepository, ScheduleRepository},
    models::{
        auth::UserRole,
        report::InventoryReport,
        schedule::{
            ActivityProgress, ActivityStatus, CountMetadata, ExpectedProduct, InventorySchedule,
            ScheduleDetails, ScheduleStatus, ValidationVerdict,
        },
    },
    services::{
        activities::{self, Completion},
        counts::{self, COUNTER_ROLE, VALIDATOR_ROLE},
        schedule_status::apply_status_rules,
        user_directory::UserDirectory,
        user_service::UserService,
        variance,
    },
};

/// Dados de um agendamento novo.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub name: String,
    pub code: Option<String>,
    pub scheduled_date: DateTime<Utc>,
    pub location: String,
    pub sector: String,
    pub notes: Option<String>,
    pub expected_products: Vec<ExpectedProduct>,
    pub activities: Vec<String>,
    pub assigned_users: Vec<Uuid>,
    pub user_roles: HashMap<Uuid, String>,
}

/// Campos alteráveis. `None` mantém o valor atual.
#[derive(Debug, Clone, Default)]
pub struct ScheduleChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub sector: Option<String>,
    pub notes: Option<String>,
    pub expected_products: Option<Vec<ExpectedProduct>>,
    pub activities: Option<Vec<String>>,
    pub assigned_users: Option<Vec<Uuid>>,
    pub user_roles: Option<HashMap<Uuid, String>>,
}

/// Código gerado quando o usuário não informa um: `INV-AAAAMMDD-HHMM`.
pub fn generate_code(now: DateTime<Utc>) -> String {
    now.format("INV-%Y%m%d-%H%M").to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Texto obrigatório, já sem espaços nas pontas.
fn required(field: &'static str, value: String, message: &'static str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::invalid_field(field, "required", message));
    }
    Ok(value.to_string())
}

pub fn build_schedule(input: NewSchedule, actor: Uuid, now: DateTime<Utc>) -> Result<InventorySchedule, AppError> {
    if input.scheduled_date <= now {
        return Err(AppError::ScheduleDateInPast);
    }
    let name = required("name", input.name, "O nome é obrigatório.")?;
    let location = required("location", input.location, "O local é obrigatório.")?;
    let sector = required("sector", input.sector, "O setor é obrigatório.")?;

    let mut assigned_users = input.assigned_users;
    if !assigned_users.contains(&actor) {
        assigned_users.push(actor);
    }
    let mut user_roles = input.user_roles;
    user_roles.entry(actor).or_insert_with(|| COUNTER_ROLE.to_string());

    let activity_status = activities::rebuild_from_texts(&input.activities, &[]);

    Ok(InventorySchedule {
        id: Uuid::new_v4(),
        name,
        code: non_empty(input.code).unwrap_or_else(|| generate_code(now)),
        scheduled_date: input.scheduled_date,
        status: ScheduleStatus::Scheduled,
        location,
        sector,
        notes: non_empty(input.notes),
        expected_products: input.expected_products,
        counted_products: Vec::new(),
        activities: activity_status.iter().map(|a| a.text.clone()).collect(),
        activity_status,
        assigned_users,
        user_roles,
        created_by: actor,
        version: 1,
        created_at: now,
        updated_at: now,
        completed_at: None,
    })
}

/// Marca ou desmarca uma atividade. Agendamento encerrado não muda mais.
pub fn toggle(
    schedule: &mut InventorySchedule,
    index: usize,
    completed: bool,
    completion: Completion,
) -> Result<(), AppError> {
    if schedule.status.is_terminal() {
        return Err(AppError::ScheduleClosed);
    }
    // Agendamento antigo passa a ser gravado no formato atual.
    let mut list = schedule.normalized_activities();
    activities::set_completion(&mut list, index, completed, completion)?;
    schedule.activity_status = list;
    Ok(())
}

/// Substitui o checklist inteiro pelo enviado, carimbando conclusões novas.
pub fn replace_progress(
    schedule: &mut InventorySchedule,
    submitted: Vec<ActivityStatus>,
    actor: Uuid,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if schedule.status.is_terminal() {
        return Err(AppError::ScheduleClosed);
    }
    let list = activities::merge_progress(submitted, &schedule.normalized_activities(), actor, now);
    schedule.activities = list.iter().map(|a| a.text.clone()).collect();
    schedule.activity_status = list;
    Ok(())
}

pub fn apply_changes(
    schedule: &mut InventorySchedule,
    changes: ScheduleChanges,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if let Some(date) = changes.scheduled_date {
        if date != schedule.scheduled_date && date <= now {
            return Err(AppError::ScheduleDateInPast);
        }
        schedule.scheduled_date = date;
    }
    if let Some(name) = changes.name {
        schedule.name = required("name", name, "O nome não pode ficar vazio.")?;
    }
    if let Some(code) = non_empty(changes.code) {
        schedule.code = code;
    }
    if let Some(location) = changes.location {
        schedule.location = required("location", location, "O local não pode ficar vazio.")?;
    }
    if let Some(sector) = changes.sector {
        schedule.sector = required("sector", sector, "O setor não pode ficar vazio.")?;
    }
    if changes.notes.is_some() {
        schedule.notes = non_empty(changes.notes);
    }
    if let Some(expected) = changes.expected_products {
        schedule.expected_products = expected;
    }
    if let Some(users) = changes.assigned_users {
        schedule.assigned_users = users;
    }
    if let Some(roles) = changes.user_roles {
        schedule.user_roles = roles;
    }
    if let Some(texts) = changes.activities {
        let rebuilt = activities::rebuild_from_texts(&texts, &schedule.normalized_activities());
        schedule.activities = rebuilt.iter().map(|a| a.text.clone()).collect();
        schedule.activity_status = rebuilt;
    }
    Ok(())
}

/// Admin e gerente sempre; os demais só com o papel de Validador no agendamento.
pub fn may_review_counts(role: UserRole, schedule: &InventorySchedule, user_id: Uuid) -> bool {
    matches!(role, UserRole::Admin | UserRole::Manager)
        || schedule.role_of(user_id) == Some(VALIDATOR_ROLE)
}

/// Todos os ids de usuário que aparecem no agendamento.
fn referenced_users(schedule: &InventorySchedule) -> BTreeSet<Uuid> {
    let mut ids = BTreeSet::new();
    ids.insert(schedule.created_by);
    ids.extend(schedule.assigned_users.iter().copied());
    ids.extend(schedule.user_roles.keys().copied());
    ids.extend(schedule.activity_status.iter().filter_map(|a| a.completed_by));
    for count in &schedule.counted_products {
        ids.insert(count.counted_by);
        ids.extend(count.validations.iter().map(|v| v.validated_by));
    }
    ids
}

pub fn details(mut schedule: InventorySchedule, directory: &UserDirectory) -> ScheduleDetails {
    schedule.activity_status = schedule.normalized_activities();
    let user_names = referenced_users(&schedule)
        .into_iter()
        .map(|id| (id, directory.name_of(Some(id))))
        .collect();
    ScheduleDetails {
        progress: schedule.progress(),
        schedule,
        user_names,
    }
}

#[derive(Clone)]
pub struct ScheduleService {
    schedule_repo: ScheduleRepository,
    product_repo: ProductRepository,
    users: UserService,
    pool: PgPool,
}

impl ScheduleService {
    pub fn new(
        schedule_repo: ScheduleRepository,
        product_repo: ProductRepository,
        users: UserService,
        pool: PgPool,
    ) -> Self {
        Self { schedule_repo, product_repo, users, pool }
    }

    async fn load(&self, id: Uuid) -> Result<InventorySchedule, AppError> {
        self.schedule_repo.find_by_id(id).await?.ok_or(AppError::ScheduleNotFound)
    }

    /// Único caminho de escrita: lê, aplica `change`, roda a regra de status
    /// e grava com a versão lida.
    async fn mutate<F>(
        &self,
        actor: Uuid,
        id: Uuid,
        expected_version: Option<i32>,
        change: F,
    ) -> Result<InventorySchedule, AppError>
    where
        F: FnOnce(&mut InventorySchedule, DateTime<Utc>) -> Result<(), AppError>,
    {
        let mut schedule = self.load(id).await?;
        if expected_version.is_some_and(|v| v != schedule.version) {
            return Err(AppError::StaleVersion);
        }

        let now = Utc::now();
        change(&mut schedule, now)?;
        apply_status_rules(&mut schedule, now);

        let mut tx = begin_audited(&self.pool, actor).await?;
        let saved = self.schedule_repo.update(&mut *tx, &schedule).await?;
        tx.commit().await?;
        Ok(saved)
    }

    /// Leitura roda a regra de status; se mudou, grava antes de devolver.
    async fn refreshed(&self, actor: Uuid, mut schedule: InventorySchedule) -> Result<InventorySchedule, AppError> {
        if !apply_status_rules(&mut schedule, Utc::now()) {
            return Ok(schedule);
        }

        let mut tx = begin_audited(&self.pool, actor).await?;
        match self.schedule_repo.update(&mut *tx, &schedule).await {
            Ok(saved) => {
                tx.commit().await?;
                Ok(saved)
            }
            // Outra escrita chegou antes; ela já passou pela mesma regra.
            Err(AppError::StaleVersion) => {
                let mut fresh = self.load(schedule.id).await?;
                apply_status_rules(&mut fresh, Utc::now());
                Ok(fresh)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn create_schedule(&self, actor: Uuid, input: NewSchedule) -> Result<InventorySchedule, AppError> {
        let schedule = build_schedule(input, actor, Utc::now())?;

        let mut tx = begin_audited(&self.pool, actor).await?;
        let saved = self.schedule_repo.create(&mut *tx, &schedule).await?;
        tx.commit().await?;

        tracing::info!("Agendamento {} ({}) criado por {}", saved.id, saved.code, actor);
        Ok(saved)
    }

    pub async fn update_schedule(
        &self,
        actor: Uuid,
        id: Uuid,
        version: i32,
        changes: ScheduleChanges,
    ) -> Result<InventorySchedule, AppError> {
        let saved = self
            .mutate(actor, id, Some(version), |s, now| apply_changes(s, changes, now))
            .await?;
        tracing::info!("Agendamento {} atualizado por {}", id, actor);
        Ok(saved)
    }

    pub async fn cancel_schedule(&self, actor: Uuid, id: Uuid, version: i32) -> Result<InventorySchedule, AppError> {
        let saved = self
            .mutate(actor, id, Some(version), |s, _| {
                if s.status.is_terminal() {
                    return Err(AppError::ScheduleClosed);
                }
                s.status = ScheduleStatus::Cancelled;
                Ok(())
            })
            .await?;
        tracing::info!("Agendamento {} cancelado por {}", id, actor);
        Ok(saved)
    }

    pub async fn delete_schedule(&self, actor: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = begin_audited(&self.pool, actor).await?;
        self.schedule_repo.delete(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!("Agendamento {} excluído por {}", id, actor);
        Ok(())
    }

    pub async fn list_schedules(&self, actor: Uuid) -> Result<Vec<ScheduleDetails>, AppError> {
        let schedules = self.schedule_repo.list().await?;
        let directory = self.users.directory().await?;

        let mut out = Vec::with_capacity(schedules.len());
        for schedule in schedules {
            let schedule = self.refreshed(actor, schedule).await?;
            out.push(details(schedule, directory));
        }
        Ok(out)
    }

    pub async fn get_schedule(&self, actor: Uuid, id: Uuid) -> Result<ScheduleDetails, AppError> {
        let schedule = self.load(id).await?;
        let schedule = self.refreshed(actor, schedule).await?;
        Ok(details(schedule, self.users.directory().await?))
    }

    pub async fn toggle_activity(
        &self,
        actor: Uuid,
        id: Uuid,
        index: usize,
        completed: bool,
        completion: Completion,
        expected_version: Option<i32>,
    ) -> Result<ScheduleDetails, AppError> {
        let saved = self
            .mutate(actor, id, expected_version, |s, _| toggle(s, index, completed, completion))
            .await?;

        tracing::info!(
            "Atividade {} do agendamento {} marcada como {} por {}",
            index,
            id,
            if completed { "concluída" } else { "pendente" },
            actor
        );
        Ok(details(saved, self.users.directory().await?))
    }

    pub async fn save_progress(
        &self,
        actor: Uuid,
        id: Uuid,
        version: i32,
        list: Vec<ActivityStatus>,
    ) -> Result<ScheduleDetails, AppError> {
        let saved = self
            .mutate(actor, id, Some(version), |s, now| replace_progress(s, list, actor, now))
            .await?;

        tracing::info!("Progresso do agendamento {} salvo por {}", id, actor);
        Ok(details(saved, self.users.directory().await?))
    }

    pub async fn progress(&self, id: Uuid) -> Result<ActivityProgress, AppError> {
        Ok(self.load(id).await?.progress())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record_count(
        &self,
        actor: Uuid,
        id: Uuid,
        product_id: Uuid,
        counted_quantity: i32,
        notes: Option<String>,
        metadata: Option<CountMetadata>,
        expected_version: Option<i32>,
    ) -> Result<InventorySchedule, AppError> {
        let saved = self
            .mutate(actor, id, expected_version, |s, now| {
                counts::record_count(s, product_id, counted_quantity, actor, now, notes, metadata)
            })
            .await?;

        tracing::info!("Contagem do produto {} registrada no agendamento {} por {}", product_id, id, actor);
        Ok(saved)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn review_count(
        &self,
        actor: Uuid,
        actor_role: UserRole,
        id: Uuid,
        product_id: Uuid,
        verdict: ValidationVerdict,
        notes: Option<String>,
        expected_version: Option<i32>,
    ) -> Result<InventorySchedule, AppError> {
        let saved = self
            .mutate(actor, id, expected_version, |s, now| {
                if !may_review_counts(actor_role, s, actor) {
                    return Err(AppError::Forbidden("counts:validate"));
                }
                counts::review_count(s, product_id, verdict, actor, now, notes.as_deref())
            })
            .await?;

        tracing::info!(
            "Contagem do produto {} no agendamento {}: {:?} por {}",
            product_id,
            id,
            verdict,
            actor
        );
        Ok(saved)
    }

    pub async fn report(&self, id: Uuid) -> Result<InventoryReport, AppError> {
        let schedule = self.load(id).await?;

        let ids: BTreeSet<Uuid> = schedule
            .expected_products
            .iter()
            .map(|e| e.product_id)
            .chain(schedule.counted_products.iter().map(|c| c.product_id))
            .collect();
        let ids: Vec<Uuid> = ids.into_iter().collect();
        let products = self.product_repo.find_many(&ids).await?;

        Ok(variance::compute_report(&schedule, &products))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::variance::tests::schedule;
    use chrono::{Duration, TimeZone};

    fn new_schedule(date: DateTime<Utc>) -> NewSchedule {
        NewSchedule {
            name: "  Inventário mensal ".into(),
            code: None,
            scheduled_date: date,
            location: "Central".into(),
            sector: "Geral".into(),
            notes: Some("   ".into()),
            expected_products: vec![],
            activities: vec!["Contar corredor A".into(), "  ".into(), " Contar corredor B ".into()],
            assigned_users: vec![],
            user_roles: HashMap::new(),
        }
    }

    #[test]
    fn code_follows_date_pattern() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 5, 59).unwrap();
        assert_eq!(generate_code(now), "INV-20250310-0905");
    }

    #[test]
    fn new_schedule_is_normalized_and_assigned_to_creator() {
        let now = Utc::now();
        let actor = Uuid::new_v4();
        let s = build_schedule(new_schedule(now + Duration::days(1)), actor, now).unwrap();

        assert_eq!(s.name, "Inventário mensal");
        assert_eq!(s.code, generate_code(now));
        assert_eq!(s.status, ScheduleStatus::Scheduled);
        assert!(s.notes.is_none());
        assert_eq!(s.activity_status.len(), 2);
        assert_eq!(s.activities, vec!["Contar corredor A", "Contar corredor B"]);
        assert!(s.activity_status.iter().all(|a| !a.completed));
        assert_eq!(s.assigned_users, vec![actor]);
        assert_eq!(s.role_of(actor), Some(COUNTER_ROLE));
    }

    #[test]
    fn explicit_creator_role_is_kept() {
        let now = Utc::now();
        let actor = Uuid::new_v4();
        let mut input = new_schedule(now + Duration::hours(2));
        input.user_roles.insert(actor, VALIDATOR_ROLE.into());
        input.code = Some(" INV-ESPECIAL ".into());

        let s = build_schedule(input, actor, now).unwrap();
        assert_eq!(s.role_of(actor), Some(VALIDATOR_ROLE));
        assert_eq!(s.code, "INV-ESPECIAL");
    }

    #[test]
    fn past_or_present_date_is_refused() {
        let now = Utc::now();
        for date in [now, now - Duration::minutes(1)] {
            let err = build_schedule(new_schedule(date), Uuid::new_v4(), now).unwrap_err();
            assert!(matches!(err, AppError::ScheduleDateInPast));
        }
    }

    #[test]
    fn update_keeps_completion_of_unchanged_activities() {
        let mut s = schedule();
        s.activity_status = vec![
            ActivityStatus { completed: true, ..ActivityStatus::pending("Contar corredor A") },
            ActivityStatus::pending("Contar corredor B"),
        ];
        let changes = ScheduleChanges {
            activities: Some(vec!["Contar corredor A".into(), "Conferir etiquetas".into()]),
            ..Default::default()
        };

        apply_changes(&mut s, changes, Utc::now()).unwrap();

        assert_eq!(s.activity_status.len(), 2);
        assert!(s.activity_status[0].completed);
        assert_eq!(s.activity_status[1], ActivityStatus::pending("Conferir etiquetas"));
        assert_eq!(s.activities[1], "Conferir etiquetas");
    }

    #[test]
    fn update_refuses_moving_date_to_past_but_allows_keeping_it() {
        let mut s = schedule();
        let now = Utc::now();
        s.scheduled_date = now - Duration::days(1);

        let keep = ScheduleChanges { scheduled_date: Some(s.scheduled_date), ..Default::default() };
        assert!(apply_changes(&mut s, keep, now).is_ok());

        let move_back = ScheduleChanges { scheduled_date: Some(now - Duration::days(2)), ..Default::default() };
        assert!(matches!(apply_changes(&mut s, move_back, now), Err(AppError::ScheduleDateInPast)));
    }

    #[test]
    fn blank_required_text_is_a_validation_error() {
        let now = Utc::now();
        let mut input = new_schedule(now + Duration::days(1));
        input.name = "   ".into();
        input.location = " ".into();

        let err = build_schedule(input, Uuid::new_v4(), now).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(err.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);

        let mut input = new_schedule(now + Duration::days(1));
        input.sector = "\t".into();
        assert!(matches!(build_schedule(input, Uuid::new_v4(), now), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn update_cannot_blank_out_name_location_or_sector() {
        let mut s = schedule();
        let now = Utc::now();

        for changes in [
            ScheduleChanges { name: Some("  ".into()), ..Default::default() },
            ScheduleChanges { location: Some("".into()), ..Default::default() },
            ScheduleChanges { sector: Some(" \n ".into()), ..Default::default() },
        ] {
            let err = apply_changes(&mut s, changes, now).unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        }
        assert_eq!((s.name.as_str(), s.location.as_str(), s.sector.as_str()), ("Inventário mensal", "Central", "Geral"));
    }

    fn stamp(actor: Uuid) -> Completion {
        Completion { actor, at: Utc::now(), geolocation: None, address: None }
    }

    #[test]
    fn completed_schedule_refuses_activity_changes() {
        let mut s = schedule();
        let actor = Uuid::new_v4();
        let now = Utc::now();
        s.activity_status = vec![ActivityStatus::pending("a"), ActivityStatus::pending("b")];

        toggle(&mut s, 0, true, stamp(actor)).unwrap();
        toggle(&mut s, 1, true, stamp(actor)).unwrap();
        assert!(apply_status_rules(&mut s, now));
        assert_eq!(s.status, ScheduleStatus::Completed);

        let err = toggle(&mut s, 0, false, stamp(actor)).unwrap_err();
        assert!(matches!(err, AppError::ScheduleClosed));
        let err = replace_progress(&mut s, vec![ActivityStatus::pending("a")], actor, now).unwrap_err();
        assert!(matches!(err, AppError::ScheduleClosed));

        let p = s.progress();
        assert_eq!((p.completed_activities, p.total_activities), (2, 2));
    }

    #[test]
    fn cancelled_schedule_refuses_activity_changes() {
        let mut s = schedule();
        s.status = ScheduleStatus::Cancelled;
        s.activity_status = vec![ActivityStatus::pending("a")];

        assert!(matches!(toggle(&mut s, 0, true, stamp(Uuid::new_v4())), Err(AppError::ScheduleClosed)));
    }

    #[test]
    fn saved_progress_is_stamped_with_the_caller() {
        let mut s = schedule();
        let actor = Uuid::new_v4();
        let now = Utc::now();
        s.activity_status = vec![ActivityStatus::pending("Contar corredor A")];
        let submitted = vec![
            ActivityStatus {
                completed: true,
                completed_by: Some(Uuid::nil()),
                completed_at: Some(now - Duration::days(30)),
                ..ActivityStatus::pending("Contar corredor A")
            },
            ActivityStatus::pending(" "),
        ];

        replace_progress(&mut s, submitted, actor, now).unwrap();

        assert_eq!(s.activity_status.len(), 1);
        assert_eq!(s.activity_status[0].completed_by, Some(actor));
        assert_eq!(s.activity_status[0].completed_at, Some(now));
        assert_eq!(s.activities, vec!["Contar corredor A".to_string()]);
    }

    #[test]
    fn only_managers_or_schedule_validators_review_counts() {
        let mut s = schedule();
        let validador = Uuid::new_v4();
        let apontador = Uuid::new_v4();
        s.user_roles.insert(validador, VALIDATOR_ROLE.into());
        s.user_roles.insert(apontador, COUNTER_ROLE.into());

        assert!(may_review_counts(UserRole::Manager, &s, Uuid::new_v4()));
        assert!(may_review_counts(UserRole::Operator, &s, validador));
        assert!(!may_review_counts(UserRole::Operator, &s, apontador));
        assert!(!may_review_counts(UserRole::Viewer, &s, Uuid::new_v4()));
    }

    #[test]
    fn details_normalize_legacy_activities_and_name_everyone() {
        let mut s = schedule();
        s.activities = vec!["a".into(), "b".into()];
        let directory = UserDirectory::new(std::time::Duration::from_secs(60));

        let view = details(s.clone(), &directory);

        assert_eq!(view.schedule.activity_status.len(), 2);
        assert_eq!(view.progress.total_activities, 2);
        assert_eq!(
            view.user_names.get(&s.created_by).map(String::as_str),
            Some(format!("Usuário {}", s.created_by).as_str())
        );
    }
}
