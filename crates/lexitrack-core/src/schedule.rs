//! Schedule repository: the severity's baseline routine merged with the
//! user's custom tasks.
//!
//! Baseline entries are never persisted. Their ids are derived from the user,
//! severity, day and template position, so every load on the same day agrees
//! and a new day starts with new ids. Custom entries keep their persisted id and are the only
//! part written back.

use std::collections::HashSet;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{LexitrackError, Result};
use crate::gateway::PersistenceGateway;
use crate::model::*;
use crate::template::TemplateCatalog;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    severity: Option<Severity>,
    tasks: Vec<TaskWithStatus>,
}

impl Schedule {
    /// Empty schedule for a user who has not picked a severity yet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Instantiate `routine` followed by `custom`. Custom entries with an id
    /// already seen are dropped.
    pub fn build(severity: Severity, routine: &[ScheduleActivity], custom: &[ScheduleActivity]) -> Self {
        let baseline = routine.iter().map(TaskWithStatus::baseline).collect();
        Self::assemble(severity, baseline, custom)
    }

    /// Like [`Schedule::build`], with baseline ids fixed for `(user_id, date)`.
    pub fn build_for_day(
        user_id: &str,
        date: NaiveDate,
        severity: Severity,
        routine: &[ScheduleActivity],
        custom: &[ScheduleActivity],
    ) -> Self {
        let baseline = routine
            .iter()
            .enumerate()
            .map(|(index, activity)| {
                let id = baseline_task_id(user_id, severity, date, index);
                TaskWithStatus::baseline_with_id(activity, id)
            })
            .collect();
        Self::assemble(severity, baseline, custom)
    }

    fn assemble(severity: Severity, mut tasks: Vec<TaskWithStatus>, custom: &[ScheduleActivity]) -> Self {
        let mut seen: HashSet<Uuid> = tasks.iter().map(|t| t.id).collect();
        for entry in custom {
            let task = TaskWithStatus::from_custom(entry);
            if !seen.insert(task.id) {
                tracing::warn!(id = %task.id, "dropping custom task with duplicate id");
                continue;
            }
            tasks.push(task);
        }
        Self {
            severity: Some(severity),
            tasks,
        }
    }

    pub fn severity(&self) -> Option<Severity> {
        self.severity
    }

    pub fn tasks(&self) -> &[TaskWithStatus] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&TaskWithStatus> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut TaskWithStatus> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| LexitrackError::NotFound(format!("task {id}")))
    }

    /// Append a user-authored task.
    pub fn add_custom(&mut self, time: &str, activity: &str) -> Result<&TaskWithStatus> {
        if self.severity.is_none() {
            return Err(LexitrackError::InvalidInput(
                "select a severity before adding tasks".into(),
            ));
        }
        validate_time(time)?;
        validate_activity(activity)?;
        self.tasks
            .push(TaskWithStatus::custom(time.trim(), activity.trim()));
        let last = self.tasks.len() - 1;
        Ok(&self.tasks[last])
    }

    /// Edit a task in place. Returns whether the task is custom, i.e.
    /// whether the change needs persisting.
    pub fn update(&mut self, id: Uuid, update: &TaskUpdate) -> Result<bool> {
        if let Some(time) = &update.time {
            validate_time(time)?;
        }
        if let Some(activity) = &update.activity {
            validate_activity(activity)?;
        }
        let task = self.get_mut(id)?;
        if let Some(time) = &update.time {
            task.time = time.trim().to_string();
        }
        if let Some(activity) = &update.activity {
            task.activity = activity.trim().to_string();
        }
        Ok(task.is_custom)
    }

    /// Remove a task. Baseline tasks are only gone for this session.
    pub fn remove(&mut self, id: Uuid) -> Result<TaskWithStatus> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| LexitrackError::NotFound(format!("task {id}")))?;
        Ok(self.tasks.remove(index))
    }

    /// Returns `true` when the flag actually changed.
    pub fn set_completed(&mut self, id: Uuid, completed: bool) -> Result<bool> {
        let task = self.get_mut(id)?;
        let changed = task.completed != completed;
        task.completed = completed;
        Ok(changed)
    }

    /// Mark every task in `ids` as completed. Unknown ids are ignored.
    pub fn mark_completed<'a>(&mut self, ids: impl IntoIterator<Item = &'a Uuid>) {
        let ids: HashSet<&Uuid> = ids.into_iter().collect();
        for task in &mut self.tasks {
            if ids.contains(&task.id) {
                task.completed = true;
            }
        }
    }

    pub fn clear_completed(&mut self) {
        for task in &mut self.tasks {
            task.completed = false;
        }
    }

    /// The persisted part: custom tasks in schedule order.
    pub fn custom_subset(&self) -> Vec<ScheduleActivity> {
        self.tasks
            .iter()
            .filter(|t| t.is_custom)
            .map(TaskWithStatus::to_activity)
            .collect()
    }

    /// Resolve a user-supplied selector: a 1-based position, or a unique
    /// prefix of a task id.
    pub fn resolve(&self, selector: &str) -> Result<Uuid> {
        let selector = selector.trim();
        let position = selector.parse::<usize>().ok();
        if let Some(task) = position
            .and_then(|p| p.checked_sub(1))
            .and_then(|i| self.tasks.get(i))
        {
            return Ok(task.id);
        }

        let needle = selector.to_lowercase();
        if needle.is_empty() {
            return Err(LexitrackError::InvalidInput("empty task selector".into()));
        }
        let matches: Vec<Uuid> = self
            .tasks
            .iter()
            .filter(|t| t.id.to_string().starts_with(&needle))
            .map(|t| t.id)
            .collect();
        match matches.as_slice() {
            [id] => Ok(*id),
            [] => match position {
                Some(p) => Err(LexitrackError::NotFound(format!(
                    "no task at position {p} (schedule has {})",
                    self.tasks.len()
                ))),
                None => Err(LexitrackError::NotFound(format!("no task matching '{selector}'"))),
            },
            _ => Err(LexitrackError::InvalidInput(format!(
                "'{selector}' matches {} tasks, use a longer prefix",
                matches.len()
            ))),
        }
    }
}

/// Result of loading a schedule. Never an error: failures degrade.
#[derive(Debug, Clone, Default)]
pub struct ScheduleLoad {
    pub schedule: Schedule,
    /// No severity selected; the schedule is empty on purpose.
    pub needs_severity: bool,
    /// Non-fatal error to surface, e.g. custom tasks could not be fetched.
    pub error: Option<String>,
    pub auth_expired: bool,
}

/// Build the schedule for `(user_id, severity)` as of `today`.
pub async fn load_schedule<G: PersistenceGateway>(
    gateway: &G,
    catalog: &TemplateCatalog,
    user_id: &str,
    severity: Option<Severity>,
    today: NaiveDate,
) -> ScheduleLoad {
    let Some(severity) = severity else {
        return ScheduleLoad {
            needs_severity: true,
            ..Default::default()
        };
    };

    let (custom, error, auth_expired) = match gateway.fetch_user_tasks(user_id, severity).await {
        Ok(custom) => (custom, None, false),
        Err(e) => {
            tracing::warn!(%severity, error = %e, "failed to fetch custom tasks");
            (
                Vec::new(),
                Some(format!("could not load your custom tasks: {e}")),
                e.is_auth_expired(),
            )
        }
    };

    ScheduleLoad {
        schedule: Schedule::build_for_day(
            user_id,
            today,
            severity,
            catalog.daily_routine(severity),
            &custom,
        ),
        needs_severity: false,
        error,
        auth_expired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{SaveOutcome, SqliteGateway};

    fn routine() -> Vec<ScheduleActivity> {
        vec![
            ScheduleActivity::new("07:30", "Phonics warm-up"),
            ScheduleActivity::new("16:00", "Reading practice"),
        ]
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn schedule() -> Schedule {
        Schedule::build(Severity::Mild, &routine(), &[])
    }

    #[test]
    fn test_build_instantiates_baseline_with_fresh_ids() {
        let a = schedule();
        let b = schedule();
        assert_eq!(a.len(), 2);
        assert!(a.tasks().iter().all(|t| !t.is_custom && !t.completed));
        assert_ne!(a.tasks()[0].id, b.tasks()[0].id);
        assert_eq!(a.tasks()[0].activity, b.tasks()[0].activity);
    }

    #[test]
    fn test_build_for_day_ids_follow_the_date() {
        let day = day();
        let build = |date| Schedule::build_for_day("kid@example.com", date, Severity::Mild, &routine(), &[]);
        let ids = |s: &Schedule| s.tasks().iter().map(|t| t.id).collect::<Vec<_>>();

        let a = build(day);
        assert_eq!(ids(&a), ids(&build(day)));
        assert_ne!(a.tasks()[0].id, a.tasks()[1].id);
        let next = build(day.succ_opt().unwrap());
        assert!(ids(&next).iter().all(|id| !ids(&a).contains(id)));
    }

    #[test]
    fn test_custom_tasks_keep_persisted_ids() {
        let id = Uuid::now_v7();
        let custom = vec![ScheduleActivity {
            id: Some(id),
            time: "18:00".into(),
            activity: "Audiobook".into(),
        }];
        let s = Schedule::build(Severity::Mild, &routine(), &custom);
        assert_eq!(s.tasks()[2].id, id);
        assert!(s.tasks()[2].is_custom);
    }

    #[test]
    fn test_duplicate_custom_ids_are_dropped() {
        let id = Uuid::now_v7();
        let entry = ScheduleActivity {
            id: Some(id),
            time: "18:00".into(),
            activity: "Audiobook".into(),
        };
        let s = Schedule::build(Severity::Mild, &[], &[entry.clone(), entry]);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_add_custom_validates() {
        let mut s = schedule();
        assert!(s.add_custom("25:00", "Late").is_err());
        assert!(s.add_custom("10:00", "   ").is_err());
        let added = s.add_custom("10:00", " Spelling game ").unwrap();
        assert!(added.is_custom);
        assert_eq!(added.activity, "Spelling game");
        assert_eq!(s.custom_subset().len(), 1);
    }

    #[test]
    fn test_add_custom_without_severity_is_rejected() {
        let mut s = Schedule::empty();
        let err = s.add_custom("10:00", "Spelling").unwrap_err();
        assert!(err.to_string().contains("severity"));
    }

    #[test]
    fn test_update_baseline_is_session_only() {
        let mut s = schedule();
        let id = s.tasks()[0].id;
        let persist = s
            .update(
                id,
                &TaskUpdate {
                    time: Some("08:00".into()),
                    activity: None,
                },
            )
            .unwrap();
        assert!(!persist);
        assert_eq!(s.get(id).unwrap().time, "08:00");
        assert!(s.custom_subset().is_empty());
    }

    #[test]
    fn test_update_unknown_is_not_found() {
        let mut s = schedule();
        let err = s.update(Uuid::now_v7(), &TaskUpdate::default()).unwrap_err();
        assert!(matches!(err, LexitrackError::NotFound(_)));
    }

    #[test]
    fn test_remove() {
        let mut s = schedule();
        let id = s.add_custom("10:00", "Spelling").unwrap().id;
        let removed = s.remove(id).unwrap();
        assert_eq!(removed.activity, "Spelling");
        assert!(s.custom_subset().is_empty());
        assert!(s.remove(id).is_err());
    }

    #[test]
    fn test_resolve_by_position_and_prefix() {
        let s = schedule();
        assert_eq!(s.resolve("1").unwrap(), s.tasks()[0].id);
        assert_eq!(s.resolve("2").unwrap(), s.tasks()[1].id);
        assert!(s.resolve("0").is_err());
        assert!(s.resolve("3").is_err());

        let full = s.tasks()[1].id.to_string();
        assert_eq!(s.resolve(&full).unwrap(), s.tasks()[1].id);
        assert!(s.resolve("zzzz").is_err());
    }

    #[test]
    fn test_mark_and_clear_completed() {
        let mut s = schedule();
        let id = s.tasks()[1].id;
        s.mark_completed([&id]);
        assert!(s.get(id).unwrap().completed);
        assert!(!s.set_completed(id, true).unwrap());
        s.clear_completed();
        assert!(!s.get(id).unwrap().completed);
    }

    #[tokio::test]
    async fn test_load_without_severity_is_degraded() {
        let gateway = SqliteGateway::open_in_memory().unwrap();
        let catalog = TemplateCatalog::builtin().unwrap();
        let load = load_schedule(&gateway, &catalog, "kid@example.com", None, day()).await;
        assert!(load.needs_severity);
        assert!(load.schedule.is_empty());
        assert!(load.error.is_none());
    }

    #[tokio::test]
    async fn test_load_merges_custom_tasks() {
        let gateway = SqliteGateway::open_in_memory().unwrap();
        let catalog = TemplateCatalog::builtin().unwrap();
        let custom = vec![TaskWithStatus::custom("19:00", "Bedtime story").to_activity()];
        let outcome = gateway
            .save_user_tasks("kid@example.com", Severity::Moderate, &custom, 1)
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Applied);

        let load = load_schedule(
            &gateway,
            &catalog,
            "kid@example.com",
            Some(Severity::Moderate),
            day(),
        )
        .await;
        let routine = catalog.daily_routine(Severity::Moderate);
        assert_eq!(load.schedule.len(), routine.len() + 1);
        assert_eq!(load.schedule.custom_subset(), custom);
    }
}
