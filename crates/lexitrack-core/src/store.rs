//! Typed session state and its reducer.
//!
//! Every mutation goes through [`AppState::apply`], which updates the state
//! synchronously and returns the [`Effect`]s the caller must carry out
//! (persistence, schedule reloads, celebrations). The state itself never
//! talks to the gateway.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::calendar::CalendarProjector;
use crate::error::{LexitrackError, Result};
use crate::ledger::DailyLedger;
use crate::milestone::{Completion, MilestoneQueue, RedoPolicy};
use crate::model::*;
use crate::schedule::Schedule;

/// Everything fetched when a session opens.
#[derive(Debug, Clone, Default)]
pub struct Hydration {
    pub profile: Option<UserProfile>,
    pub schedule: Schedule,
    /// Pending milestones of the profile's severity.
    pub milestone_template: Vec<MilestoneTask>,
    pub progress: Option<ProgressBundle>,
    pub contacts: Vec<EmergencyContact>,
    pub checkups: Vec<CheckupLog>,
    /// Non-fatal load failures.
    pub errors: Vec<String>,
    pub auth_expired: bool,
}

#[derive(Debug, Clone)]
pub enum Action {
    Hydrate(Box<Hydration>),
    SetProfile(UserProfile),
    SetProfileField { key: String, value: String },
    SetSeverity(Severity),
    /// New schedule and milestone template after a severity change.
    ReplaceSchedule {
        schedule: Schedule,
        milestone_template: Vec<MilestoneTask>,
    },
    AddCustomTask { time: String, activity: String },
    UpdateTask { id: Uuid, update: TaskUpdate },
    DeleteTask { id: Uuid },
    /// Completing logs the task for today; un-completing leaves the log alone.
    SetTaskCompleted { id: Uuid, completed: bool },
    LogTaskForToday { id: Uuid },
    MarkMilestoneCompleted { id: String },
    RedoMilestone { id: String },
    StartTracking,
    AddContact(EmergencyContact),
    RemoveContact(Uuid),
    AddCheckup(CheckupLog),
    RemoveCheckup(Uuid),
    SetError(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SaveProfile,
    SaveTasks(Severity),
    SaveProgress,
    SaveContacts,
    SaveCheckups,
    /// Severity changed: fetch the custom tasks for the new one.
    ReloadSchedule(Severity),
    Celebrate(Completion),
    RedoAwarded { milestone_id: String, points: u32 },
    TaskAdded(Uuid),
}

#[derive(Debug, Clone)]
pub struct AppState {
    user_id: String,
    profile: UserProfile,
    schedule: Schedule,
    ledger: DailyLedger,
    milestones: MilestoneQueue,
    milestone_template: Vec<MilestoneTask>,
    tracking_started: Option<NaiveDate>,
    contacts: Vec<EmergencyContact>,
    checkups: Vec<CheckupLog>,
    error: Option<String>,
    auth_expired: bool,
    redo_policy: RedoPolicy,
}

impl AppState {
    pub fn new(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            profile: UserProfile::new(user_id.clone()),
            user_id,
            schedule: Schedule::empty(),
            ledger: DailyLedger::new(),
            milestones: MilestoneQueue::default(),
            milestone_template: Vec::new(),
            tracking_started: None,
            contacts: Vec::new(),
            checkups: Vec::new(),
            error: None,
            auth_expired: false,
            redo_policy: RedoPolicy::default(),
        }
    }

    pub fn with_redo_policy(mut self, policy: RedoPolicy) -> Self {
        self.redo_policy = policy;
        self
    }

    // -- Read side --

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn severity(&self) -> Option<Severity> {
        self.profile.severity
    }

    /// No severity selected: schedule and milestones are empty on purpose.
    pub fn needs_severity(&self) -> bool {
        self.profile.severity.is_none()
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn ledger(&self) -> &DailyLedger {
        &self.ledger
    }

    pub fn milestones(&self) -> &MilestoneQueue {
        &self.milestones
    }

    pub fn tracking_started(&self) -> Option<NaiveDate> {
        self.tracking_started
    }

    pub fn contacts(&self) -> &[EmergencyContact] {
        &self.contacts
    }

    pub fn checkups(&self) -> &[CheckupLog] {
        &self.checkups
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn auth_expired(&self) -> bool {
        self.auth_expired
    }

    pub fn daily_log_for(&self, date: NaiveDate) -> Option<DailyLogEntry> {
        self.ledger.entry_for(date)
    }

    pub fn calendar(&self, today: NaiveDate) -> CalendarProjector<'_> {
        CalendarProjector::new(&self.ledger, self.milestones.tasks(), self.tracking_started, today)
    }

    /// Full progress snapshot, as persisted.
    pub fn progress_bundle(&self) -> ProgressBundle {
        ProgressBundle {
            milestone_points: self.milestones.points(),
            milestone_tasks: self.milestones.snapshot(),
            current_milestone_index: self.milestones.current_index(),
            current_milestone_level: self.profile.severity,
            tracking_started_date: self.tracking_started,
            daily_logs: self.ledger.entries(),
        }
    }

    pub(crate) fn note_auth_expired(&mut self) {
        self.auth_expired = true;
    }

    pub(crate) fn record_error(&mut self, error: String) {
        self.error = Some(error);
    }

    // -- Reducer --

    pub fn apply(&mut self, action: Action, today: NaiveDate) -> Result<Vec<Effect>> {
        match action {
            Action::Hydrate(hydration) => {
                self.hydrate(*hydration, today);
                Ok(vec![])
            }

            Action::SetProfile(mut profile) => {
                profile.email = self.user_id.clone();
                let previous = self.profile.severity;
                self.profile = profile;
                Ok(self.profile_effects(previous))
            }

            Action::SetProfileField { key, value } => {
                let mut profile = self.profile.clone();
                profile.set_field(&key, &value)?;
                let previous = self.profile.severity;
                self.profile = profile;
                Ok(self.profile_effects(previous))
            }

            Action::SetSeverity(severity) => {
                let previous = self.profile.severity;
                self.profile.severity = Some(severity);
                Ok(self.profile_effects(previous))
            }

            Action::ReplaceSchedule {
                schedule,
                milestone_template,
            } => {
                self.schedule = schedule;
                if let Some(entry) = self.ledger.entry_for(today) {
                    self.schedule.mark_completed(&entry.completed_tasks);
                }
                self.milestones.switch_template(milestone_template.clone());
                self.milestone_template = milestone_template;
                Ok(vec![Effect::SaveProgress])
            }

            Action::AddCustomTask { time, activity } => {
                let id = self.schedule.add_custom(&time, &activity)?.id;
                Ok(vec![Effect::TaskAdded(id), self.save_tasks()?])
            }

            Action::UpdateTask { id, update } => {
                if self.schedule.update(id, &update)? {
                    Ok(vec![self.save_tasks()?])
                } else {
                    Ok(vec![])
                }
            }

            Action::DeleteTask { id } => {
                let removed = self.schedule.remove(id)?;
                if removed.is_custom {
                    Ok(vec![self.save_tasks()?])
                } else {
                    Ok(vec![])
                }
            }

            Action::SetTaskCompleted { id, completed } => {
                self.schedule.set_completed(id, completed)?;
                if completed && self.ledger.log_task(today, id) {
                    Ok(vec![Effect::SaveProgress])
                } else {
                    Ok(vec![])
                }
            }

            Action::LogTaskForToday { id } => {
                if self.schedule.get(id).is_some() {
                    self.schedule.set_completed(id, true)?;
                }
                if self.ledger.log_task(today, id) {
                    Ok(vec![Effect::SaveProgress])
                } else {
                    Ok(vec![])
                }
            }

            Action::MarkMilestoneCompleted { id } => match self.milestones.complete(&id, today) {
                Some(completion) => {
                    tracing::info!(
                        milestone = %completion.milestone_id,
                        points = completion.points_awarded,
                        "milestone completed"
                    );
                    Ok(vec![Effect::Celebrate(completion), Effect::SaveProgress])
                }
                None => Ok(vec![]),
            },

            Action::RedoMilestone { id } => match self.milestones.redo(&id, &self.redo_policy) {
                Some(points) => Ok(vec![
                    Effect::RedoAwarded {
                        milestone_id: id,
                        points,
                    },
                    Effect::SaveProgress,
                ]),
                None => Ok(vec![]),
            },

            Action::StartTracking => {
                self.milestones.reset(self.milestone_template.clone());
                self.ledger.clear();
                self.schedule.clear_completed();
                self.tracking_started = Some(today);
                tracing::info!(%today, "progress tracking started");
                Ok(vec![Effect::SaveProgress])
            }

            Action::AddContact(contact) => {
                contact.validate()?;
                if self.contacts.iter().any(|c| c.id == contact.id) {
                    return Err(LexitrackError::InvalidInput(format!(
                        "contact {} already exists",
                        contact.id
                    )));
                }
                self.contacts.push(contact);
                Ok(vec![Effect::SaveContacts])
            }

            Action::RemoveContact(id) => {
                let index = self
                    .contacts
                    .iter()
                    .position(|c| c.id == id)
                    .ok_or_else(|| LexitrackError::NotFound(format!("contact {id}")))?;
                self.contacts.remove(index);
                Ok(vec![Effect::SaveContacts])
            }

            Action::AddCheckup(log) => {
                log.validate()?;
                if self.checkups.iter().any(|c| c.id == log.id) {
                    return Err(LexitrackError::InvalidInput(format!(
                        "checkup {} already exists",
                        log.id
                    )));
                }
                self.checkups.push(log);
                Ok(vec![Effect::SaveCheckups])
            }

            Action::RemoveCheckup(id) => {
                let index = self
                    .checkups
                    .iter()
                    .position(|c| c.id == id)
                    .ok_or_else(|| LexitrackError::NotFound(format!("checkup {id}")))?;
                self.checkups.remove(index);
                Ok(vec![Effect::SaveCheckups])
            }

            Action::SetError(error) => {
                self.error = error;
                Ok(vec![])
            }
        }
    }

    fn hydrate(&mut self, h: Hydration, today: NaiveDate) {
        let mut profile = h
            .profile
            .unwrap_or_else(|| UserProfile::new(self.user_id.clone()));
        if profile.email != self.user_id {
            tracing::warn!(stored = %profile.email, "profile email differs from user id, using user id");
            profile.email = self.user_id.clone();
        }
        let bundle = h.progress.unwrap_or_default();

        self.profile = profile;
        self.ledger = DailyLedger::from_entries(bundle.daily_logs);
        self.milestones = MilestoneQueue::hydrate(
            h.milestone_template.clone(),
            &bundle.milestone_tasks,
            bundle.milestone_points,
        );
        self.milestone_template = h.milestone_template;
        self.tracking_started = bundle.tracking_started_date;
        self.schedule = h.schedule;
        if let Some(entry) = self.ledger.entry_for(today) {
            self.schedule.mark_completed(&entry.completed_tasks);
        }
        self.contacts = dedup_records(h.contacts);
        self.checkups = dedup_records(h.checkups);
        self.error = (!h.errors.is_empty()).then(|| h.errors.join("; "));
        self.auth_expired = h.auth_expired;
    }

    fn profile_effects(&mut self, previous: Option<Severity>) -> Vec<Effect> {
        let mut effects = vec![Effect::SaveProfile];
        match self.profile.severity {
            Some(severity) if previous != Some(severity) => {
                effects.push(Effect::ReloadSchedule(severity));
            }
            None if previous.is_some() => {
                self.schedule = Schedule::empty();
                self.milestones.switch_template(Vec::new());
                self.milestone_template.clear();
                effects.push(Effect::SaveProgress);
            }
            _ => {}
        }
        effects
    }

    fn save_tasks(&self) -> Result<Effect> {
        self.schedule
            .severity()
            .map(Effect::SaveTasks)
            .ok_or_else(|| LexitrackError::InvalidInput("no severity selected".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateCatalog;

    const USER: &str = "kid@example.com";

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn hydrated(severity: Option<Severity>, progress: Option<ProgressBundle>) -> AppState {
        let catalog = TemplateCatalog::builtin().unwrap();
        let mut state = AppState::new(USER);
        let (schedule, template) = match severity {
            Some(s) => (
                Schedule::build(s, catalog.daily_routine(s), &[]),
                catalog.pending_milestones(s),
            ),
            None => (Schedule::empty(), vec![]),
        };
        let profile = severity.map(|s| UserProfile::new(USER).with_severity(s));
        state
            .apply(
                Action::Hydrate(Box::new(Hydration {
                    profile,
                    schedule,
                    milestone_template: template,
                    progress,
                    ..Default::default()
                })),
                day(10),
            )
            .unwrap();
        state
    }

    #[test]
    fn test_fresh_user_defaults() {
        let state = hydrated(Some(Severity::Mild), None);
        assert_eq!(state.milestones().points(), 0);
        assert!(state.tracking_started().is_none());
        assert!(state.schedule().tasks().iter().all(|t| !t.completed));
        assert!(state.error().is_none());
        assert_eq!(state.profile().email, USER);
    }

    #[test]
    fn test_no_severity_is_degraded_not_error() {
        let state = hydrated(None, None);
        assert!(state.needs_severity());
        assert!(state.schedule().is_empty());
        assert!(state.milestones().is_exhausted());
    }

    #[test]
    fn test_complete_task_logs_for_today_once() {
        let mut state = hydrated(Some(Severity::Mild), None);
        let id = state.schedule().tasks()[0].id;

        let effects = state
            .apply(Action::SetTaskCompleted { id, completed: true }, day(10))
            .unwrap();
        assert_eq!(effects, vec![Effect::SaveProgress]);

        let again = state
            .apply(Action::LogTaskForToday { id }, day(10))
            .unwrap();
        assert!(again.is_empty());
        assert_eq!(state.daily_log_for(day(10)).unwrap().completed_tasks, vec![id]);
    }

    #[test]
    fn test_uncomplete_keeps_log_entry() {
        let mut state = hydrated(Some(Severity::Mild), None);
        let id = state.schedule().tasks()[0].id;
        state
            .apply(Action::SetTaskCompleted { id, completed: true }, day(10))
            .unwrap();
        let effects = state
            .apply(Action::SetTaskCompleted { id, completed: false }, day(10))
            .unwrap();
        assert!(effects.is_empty());
        assert!(!state.schedule().get(id).unwrap().completed);
        assert_eq!(state.ledger().completed_count(day(10)), 1);
    }

    #[test]
    fn test_add_custom_task_saves_tasks_for_severity() {
        let mut state = hydrated(Some(Severity::Moderate), None);
        let effects = state
            .apply(
                Action::AddCustomTask {
                    time: "17:00".into(),
                    activity: "Word puzzle".into(),
                },
                day(10),
            )
            .unwrap();
        assert!(matches!(effects[0], Effect::TaskAdded(_)));
        assert_eq!(effects[1], Effect::SaveTasks(Severity::Moderate));
    }

    #[test]
    fn test_editing_baseline_task_does_not_persist() {
        let mut state = hydrated(Some(Severity::Mild), None);
        let id = state.schedule().tasks()[0].id;
        let effects = state
            .apply(
                Action::UpdateTask {
                    id,
                    update: TaskUpdate {
                        time: None,
                        activity: Some("Shorter warm-up".into()),
                    },
                },
                day(10),
            )
            .unwrap();
        assert!(effects.is_empty());
        let effects = state.apply(Action::DeleteTask { id }, day(10)).unwrap();
        assert!(effects.is_empty());
    }

    #[test]
    fn test_milestone_completion_celebrates_and_saves() {
        let mut state = hydrated(Some(Severity::Mild), None);
        let first = state.milestones().current().unwrap().id.clone();
        let effects = state
            .apply(Action::MarkMilestoneCompleted { id: first.clone() }, day(10))
            .unwrap();
        assert!(matches!(&effects[0], Effect::Celebrate(c) if c.milestone_id == first));
        assert_eq!(effects[1], Effect::SaveProgress);

        let repeat = state
            .apply(Action::MarkMilestoneCompleted { id: first }, day(11))
            .unwrap();
        assert!(repeat.is_empty());
    }

    #[test]
    fn test_redo_pending_is_noop() {
        let mut state = hydrated(Some(Severity::Mild), None);
        let first = state.milestones().current().unwrap().id.clone();
        let effects = state
            .apply(Action::RedoMilestone { id: first }, day(10))
            .unwrap();
        assert!(effects.is_empty());
        assert_eq!(state.milestones().points(), 0);
    }

    #[test]
    fn test_start_tracking_is_hard_reset() {
        let mut state = hydrated(Some(Severity::Mild), None);
        let id = state.schedule().tasks()[0].id;
        state
            .apply(Action::LogTaskForToday { id }, day(10))
            .unwrap();
        let first = state.milestones().current().unwrap().id.clone();
        state
            .apply(Action::MarkMilestoneCompleted { id: first }, day(10))
            .unwrap();

        let effects = state.apply(Action::StartTracking, day(12)).unwrap();
        assert_eq!(effects, vec![Effect::SaveProgress]);
        assert_eq!(state.milestones().points(), 0);
        assert_eq!(state.milestones().completed_count(), 0);
        assert!(state.ledger().is_empty());
        assert_eq!(state.tracking_started(), Some(day(12)));
        assert!(state.schedule().tasks().iter().all(|t| !t.completed));
    }

    #[test]
    fn test_severity_change_requests_reload() {
        let mut state = hydrated(Some(Severity::Mild), None);
        let effects = state
            .apply(Action::SetSeverity(Severity::Severe), day(10))
            .unwrap();
        assert_eq!(
            effects,
            vec![Effect::SaveProfile, Effect::ReloadSchedule(Severity::Severe)]
        );

        let same = state
            .apply(Action::SetSeverity(Severity::Severe), day(10))
            .unwrap();
        assert_eq!(same, vec![Effect::SaveProfile]);
    }

    #[test]
    fn test_replace_schedule_keeps_points() {
        let mut state = hydrated(
            Some(Severity::Mild),
            Some(ProgressBundle {
                milestone_points: 70,
                ..Default::default()
            }),
        );
        let catalog = TemplateCatalog::builtin().unwrap();
        state
            .apply(Action::SetSeverity(Severity::Severe), day(10))
            .unwrap();
        state
            .apply(
                Action::ReplaceSchedule {
                    schedule: Schedule::build(
                        Severity::Severe,
                        catalog.daily_routine(Severity::Severe),
                        &[],
                    ),
                    milestone_template: catalog.pending_milestones(Severity::Severe),
                },
                day(10),
            )
            .unwrap();
        assert_eq!(state.milestones().points(), 70);
        assert_eq!(state.milestones().current().unwrap().id, "severe-1");
        assert_eq!(
            state.progress_bundle().current_milestone_level,
            Some(Severity::Severe)
        );
    }

    fn switch(state: &mut AppState, severity: Severity) {
        let catalog = TemplateCatalog::builtin().unwrap();
        state
            .apply(Action::SetSeverity(severity), day(10))
            .unwrap();
        state
            .apply(
                Action::ReplaceSchedule {
                    schedule: Schedule::build(severity, catalog.daily_routine(severity), &[]),
                    milestone_template: catalog.pending_milestones(severity),
                },
                day(10),
            )
            .unwrap();
    }

    #[test]
    fn test_severity_round_trip_keeps_milestone_completions() {
        let mut state = hydrated(Some(Severity::Mild), None);
        let first = state.milestones().current().unwrap().id.clone();
        state
            .apply(Action::MarkMilestoneCompleted { id: first.clone() }, day(10))
            .unwrap();
        let points = state.milestones().points();
        assert!(points > 0);

        switch(&mut state, Severity::Severe);
        assert!(state
            .progress_bundle()
            .milestone_tasks
            .iter()
            .any(|t| t.id == first && t.completed));

        switch(&mut state, Severity::Mild);
        assert!(state.milestones().get(&first).unwrap().completed);
        assert_ne!(state.milestones().current().unwrap().id, first);
        let again = state
            .apply(Action::MarkMilestoneCompleted { id: first }, day(11))
            .unwrap();
        assert!(again.is_empty());
        assert_eq!(state.milestones().points(), points);
    }

    #[test]
    fn test_clearing_severity_empties_milestones() {
        let mut state = hydrated(Some(Severity::Mild), None);
        let first = state.milestones().current().unwrap().id.clone();
        state
            .apply(Action::MarkMilestoneCompleted { id: first.clone() }, day(10))
            .unwrap();
        let points = state.milestones().points();

        let effects = state
            .apply(Action::SetProfile(UserProfile::new(USER)), day(10))
            .unwrap();
        assert_eq!(effects, vec![Effect::SaveProfile, Effect::SaveProgress]);
        assert!(state.needs_severity());
        assert!(state.schedule().is_empty());
        assert!(state.milestones().tasks().is_empty());
        assert!(state.milestones().current().is_none());
        assert_eq!(state.milestones().points(), points);

        state.apply(Action::StartTracking, day(12)).unwrap();
        assert!(state.milestones().tasks().is_empty());

        let mut state = hydrated(Some(Severity::Mild), None);
        state
            .apply(Action::MarkMilestoneCompleted { id: first.clone() }, day(10))
            .unwrap();
        state
            .apply(Action::SetProfile(UserProfile::new(USER)), day(10))
            .unwrap();
        switch(&mut state, Severity::Mild);
        assert!(state.milestones().get(&first).unwrap().completed);
    }

    #[test]
    fn test_profile_field_email_is_immutable() {
        let mut state = hydrated(Some(Severity::Mild), None);
        let err = state
            .apply(
                Action::SetProfileField {
                    key: "email".into(),
                    value: "other@example.com".into(),
                },
                day(10),
            )
            .unwrap_err();
        assert!(matches!(err, LexitrackError::InvalidInput(_)));
        assert_eq!(state.profile().email, USER);
    }

    #[test]
    fn test_contacts_crud() {
        let mut state = hydrated(Some(Severity::Mild), None);
        let contact = EmergencyContact::new("Sam", "Parent", "555-0101");
        let id = contact.id;
        let effects = state
            .apply(Action::AddContact(contact.clone()), day(10))
            .unwrap();
        assert_eq!(effects, vec![Effect::SaveContacts]);
        assert!(state.apply(Action::AddContact(contact), day(10)).is_err());

        state.apply(Action::RemoveContact(id), day(10)).unwrap();
        assert!(state.contacts().is_empty());
        assert!(state.apply(Action::RemoveContact(id), day(10)).is_err());
    }

    #[test]
    fn test_invalid_checkup_is_rejected() {
        let mut state = hydrated(Some(Severity::Mild), None);
        let log = CheckupLog::new(day(1), "  ");
        assert!(state.apply(Action::AddCheckup(log), day(10)).is_err());
        assert!(state.checkups().is_empty());
    }

    #[test]
    fn test_progress_bundle_snapshot() {
        let mut state = hydrated(Some(Severity::Mild), None);
        state.apply(Action::StartTracking, day(9)).unwrap();
        let id = state.schedule().tasks()[1].id;
        state
            .apply(Action::LogTaskForToday { id }, day(10))
            .unwrap();

        let bundle = state.progress_bundle();
        assert_eq!(bundle.tracking_started_date, Some(day(9)));
        assert_eq!(bundle.current_milestone_index, Some(0));
        assert_eq!(bundle.current_milestone_level, Some(Severity::Mild));
        assert_eq!(bundle.daily_logs.len(), 1);
        assert_eq!(bundle.daily_logs[0].completed_tasks, vec![id]);
    }

    #[test]
    fn test_hydrate_marks_todays_logged_tasks() {
        let catalog = TemplateCatalog::builtin().unwrap();
        let custom = TaskWithStatus::custom("19:00", "Story time").to_activity();
        let custom_id = custom.id.unwrap();
        let mut state = AppState::new(USER);
        state
            .apply(
                Action::Hydrate(Box::new(Hydration {
                    profile: Some(UserProfile::new(USER).with_severity(Severity::Mild)),
                    schedule: Schedule::build(
                        Severity::Mild,
                        catalog.daily_routine(Severity::Mild),
                        &[custom],
                    ),
                    milestone_template: catalog.pending_milestones(Severity::Mild),
                    progress: Some(ProgressBundle {
                        daily_logs: vec![DailyLogEntry {
                            date: day(10),
                            completed_tasks: vec![custom_id],
                        }],
                        ..Default::default()
                    }),
                    errors: vec!["could not load contacts".into()],
                    ..Default::default()
                })),
                day(10),
            )
            .unwrap();
        assert!(state.schedule().get(custom_id).unwrap().completed);
        assert_eq!(state.error(), Some("could not load contacts"));
    }
}
