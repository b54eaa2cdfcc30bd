//! A user's session: the state container wired to a gateway and a write
//! queue.
//!
//! `Session` owns the [`AppState`] and is the only place effects are carried
//! out. Mutations return as soon as the state has changed; persistence runs
//! on the write queue and failures surface through [`Session::flush`] and
//! the state's error field.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::calendar::{MonthView, StreakSummary};
use crate::config::{LexitrackConfig, StoredSession};
use crate::error::{LexitrackError, Result};
use crate::gateway::PersistenceGateway;
use crate::milestone::{Completion, RedoPolicy};
use crate::model::*;
use crate::schedule::load_schedule;
use crate::store::{Action, AppState, Effect, Hydration};
use crate::sync::{SavePayload, SavePolicy, SyncStatus, WriteQueue};
use crate::template::TemplateCatalog;

/// Source of "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Local calendar date.
    System,
    Fixed(NaiveDate),
}

impl Clock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::System => chrono::Local::now().date_naive(),
            Clock::Fixed(date) => *date,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub save_policy: SavePolicy,
    pub redo_policy: RedoPolicy,
    pub clock: Clock,
    /// Session file whose token is cleared when the gateway answers 401.
    pub session_file: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            save_policy: SavePolicy::Retry {
                max_retries: 3,
                base_delay_ms: 200,
            },
            redo_policy: RedoPolicy::default(),
            clock: Clock::System,
            session_file: None,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &LexitrackConfig) -> Self {
        Self {
            save_policy: SavePolicy::from(&config.sync),
            redo_policy: RedoPolicy::from(&config.milestones),
            clock: Clock::System,
            session_file: StoredSession::path(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

pub struct Session<G: PersistenceGateway + 'static> {
    gateway: Arc<G>,
    catalog: TemplateCatalog,
    queue: WriteQueue,
    state: AppState,
    clock: Clock,
    session_file: Option<PathBuf>,
}

/// Collects non-fatal load failures.
#[derive(Default)]
struct LoadErrors {
    messages: Vec<String>,
    auth_expired: bool,
}

impl LoadErrors {
    fn absorb<T: Default>(&mut self, what: &str, result: Result<T>) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(what, error = %e, "failed to load, continuing with defaults");
                self.auth_expired |= e.is_auth_expired();
                self.messages.push(format!("could not load {what}: {e}"));
                T::default()
            }
        }
    }
}

impl<G: PersistenceGateway + 'static> Session<G> {
    /// Load everything the user owns and start the write queue.
    ///
    /// Load failures never abort: each missing piece falls back to its
    /// default and the failure is recorded in the state's error.
    pub async fn open(
        gateway: Arc<G>,
        catalog: TemplateCatalog,
        user_id: &str,
        options: SessionOptions,
    ) -> Result<Self> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(LexitrackError::InvalidInput("no user id".into()));
        }
        let today = options.clock.today();
        let mut errors = LoadErrors::default();

        let profile = errors.absorb("profile", gateway.fetch_profile(user_id).await);
        let severity = profile.as_ref().and_then(|p| p.severity);

        let (schedule, progress, contacts, checkups) = tokio::join!(
            load_schedule(gateway.as_ref(), &catalog, user_id, severity, today),
            gateway.fetch_user_progress(user_id),
            gateway.fetch_emergency_contacts(user_id),
            gateway.fetch_checkup_logs(user_id),
        );
        let progress = errors.absorb("progress", progress);
        let contacts = errors.absorb("emergency contacts", contacts);
        let checkups = errors.absorb("checkup logs", checkups);
        if let Some(e) = schedule.error {
            errors.messages.push(e);
        }
        errors.auth_expired |= schedule.auth_expired;

        let hydration = Hydration {
            profile,
            schedule: schedule.schedule,
            milestone_template: severity
                .map(|s| catalog.pending_milestones(s))
                .unwrap_or_default(),
            progress,
            contacts,
            checkups,
            errors: errors.messages,
            auth_expired: errors.auth_expired,
        };

        let mut state = AppState::new(user_id).with_redo_policy(options.redo_policy);
        state.apply(Action::Hydrate(Box::new(hydration)), today)?;

        let queue = WriteQueue::spawn(Arc::clone(&gateway), options.save_policy);
        let session = Self {
            gateway,
            catalog,
            queue,
            state,
            clock: options.clock,
            session_file: options.session_file,
        };
        if session.state.auth_expired() {
            session.clear_stored_token();
        }
        tracing::info!(user = user_id, ?severity, "session opened");
        Ok(session)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    /// Apply an action and carry out its effects. Returns the effects so
    /// callers can react to celebrations and similar events.
    pub async fn dispatch(&mut self, action: Action) -> Result<Vec<Effect>> {
        let today = self.today();
        let mut pending: VecDeque<Effect> = self.state.apply(action, today)?.into();
        let mut done = Vec::with_capacity(pending.len());

        while let Some(effect) = pending.pop_front() {
            match &effect {
                Effect::SaveProfile => {
                    self.enqueue(SavePayload::Profile(self.state.profile().clone()));
                }
                Effect::SaveTasks(severity) => {
                    self.enqueue(SavePayload::Tasks {
                        severity: *severity,
                        tasks: self.state.schedule().custom_subset(),
                    });
                }
                Effect::SaveProgress => {
                    self.enqueue(SavePayload::Progress(self.state.progress_bundle()));
                }
                Effect::SaveContacts => {
                    self.enqueue(SavePayload::Contacts(self.state.contacts().to_vec()));
                }
                Effect::SaveCheckups => {
                    self.enqueue(SavePayload::Checkups(self.state.checkups().to_vec()));
                }
                Effect::ReloadSchedule(severity) => {
                    let load = load_schedule(
                        self.gateway.as_ref(),
                        &self.catalog,
                        self.state.user_id(),
                        Some(*severity),
                        today,
                    )
                    .await;
                    if load.auth_expired {
                        self.expire_auth();
                    }
                    if load.error.is_some() {
                        self.state.apply(Action::SetError(load.error), today)?;
                    }
                    let followups = self.state.apply(
                        Action::ReplaceSchedule {
                            schedule: load.schedule,
                            milestone_template: self.catalog.pending_milestones(*severity),
                        },
                        today,
                    )?;
                    pending.extend(followups);
                }
                Effect::Celebrate(_) | Effect::RedoAwarded { .. } | Effect::TaskAdded(_) => {}
            }
            done.push(effect);
        }
        Ok(done)
    }

    fn enqueue(&self, payload: SavePayload) {
        self.queue.enqueue(self.state.user_id(), payload);
    }

    // -- Schedule --

    pub async fn add_custom_task(&mut self, time: &str, activity: &str) -> Result<TaskWithStatus> {
        let effects = self
            .dispatch(Action::AddCustomTask {
                time: time.to_string(),
                activity: activity.to_string(),
            })
            .await?;
        effects
            .iter()
            .find_map(|e| match e {
                Effect::TaskAdded(id) => self.state.schedule().get(*id).cloned(),
                _ => None,
            })
            .ok_or_else(|| LexitrackError::NotFound("newly added task".into()))
    }

    pub async fn update_task(&mut self, id: Uuid, update: TaskUpdate) -> Result<()> {
        self.dispatch(Action::UpdateTask { id, update }).await?;
        Ok(())
    }

    pub async fn delete_task(&mut self, id: Uuid) -> Result<()> {
        self.dispatch(Action::DeleteTask { id }).await?;
        Ok(())
    }

    /// Mark a task done and log it for today. Returns `true` when the log
    /// changed.
    pub async fn complete_task(&mut self, id: Uuid) -> Result<bool> {
        let effects = self
            .dispatch(Action::SetTaskCompleted {
                id,
                completed: true,
            })
            .await?;
        Ok(effects.contains(&Effect::SaveProgress))
    }

    pub async fn uncomplete_task(&mut self, id: Uuid) -> Result<()> {
        self.dispatch(Action::SetTaskCompleted {
            id,
            completed: false,
        })
        .await?;
        Ok(())
    }

    /// Returns `true` when `id` was not yet logged today.
    pub async fn log_task_for_today(&mut self, id: Uuid) -> Result<bool> {
        let effects = self.dispatch(Action::LogTaskForToday { id }).await?;
        Ok(effects.contains(&Effect::SaveProgress))
    }

    pub fn daily_log_for(&self, date: NaiveDate) -> Option<DailyLogEntry> {
        self.state.daily_log_for(date)
    }

    // -- Milestones --

    pub async fn mark_milestone_completed(&mut self, id: &str) -> Result<Option<Completion>> {
        let effects = self
            .dispatch(Action::MarkMilestoneCompleted { id: id.to_string() })
            .await?;
        Ok(effects.into_iter().find_map(|e| match e {
            Effect::Celebrate(completion) => Some(completion),
            _ => None,
        }))
    }

    pub async fn redo_milestone(&mut self, id: &str) -> Result<Option<u32>> {
        let effects = self
            .dispatch(Action::RedoMilestone { id: id.to_string() })
            .await?;
        Ok(effects.into_iter().find_map(|e| match e {
            Effect::RedoAwarded { points, .. } => Some(points),
            _ => None,
        }))
    }

    pub async fn start_tracking_progress(&mut self) -> Result<()> {
        self.dispatch(Action::StartTracking).await?;
        Ok(())
    }

    // -- Calendar --

    pub fn calendar_month(&self, year: i32, month: u32) -> Result<MonthView> {
        self.state.calendar(self.today()).month(year, month)
    }

    pub fn streak(&self) -> StreakSummary {
        self.state.calendar(self.today()).summary()
    }

    // -- Profile --

    pub async fn set_profile_field(&mut self, key: &str, value: &str) -> Result<()> {
        self.dispatch(Action::SetProfileField {
            key: key.to_string(),
            value: value.to_string(),
        })
        .await?;
        Ok(())
    }

    pub async fn set_severity(&mut self, severity: Severity) -> Result<()> {
        self.dispatch(Action::SetSeverity(severity)).await?;
        Ok(())
    }

    pub async fn update_profile(&mut self, profile: UserProfile) -> Result<()> {
        self.dispatch(Action::SetProfile(profile)).await?;
        Ok(())
    }

    // -- Records --

    pub async fn add_contact(&mut self, contact: EmergencyContact) -> Result<()> {
        self.dispatch(Action::AddContact(contact)).await?;
        Ok(())
    }

    pub async fn remove_contact(&mut self, id: Uuid) -> Result<()> {
        self.dispatch(Action::RemoveContact(id)).await?;
        Ok(())
    }

    pub async fn add_checkup(&mut self, log: CheckupLog) -> Result<()> {
        self.dispatch(Action::AddCheckup(log)).await?;
        Ok(())
    }

    pub async fn remove_checkup(&mut self, id: Uuid) -> Result<()> {
        self.dispatch(Action::RemoveCheckup(id)).await?;
        Ok(())
    }

    // -- Sync --

    pub fn sync_status(&self) -> SyncStatus {
        self.queue.status()
    }

    /// Wait for queued saves, then fold their failures into the state.
    pub async fn flush(&mut self) -> SyncStatus {
        self.queue.flush().await;
        let status = self.queue.status();
        if let Some(error) = self.queue.take_error() {
            self.state.record_error(error);
        }
        if status.auth_expired && !self.state.auth_expired() {
            self.expire_auth();
        }
        status
    }

    fn expire_auth(&mut self) {
        self.state.note_auth_expired();
        self.clear_stored_token();
    }

    fn clear_stored_token(&self) {
        let Some(path) = &self.session_file else {
            return;
        };
        match StoredSession::clear_token_at(path) {
            Ok(()) => tracing::info!("session expired, stored token cleared"),
            Err(e) => tracing::warn!(error = %e, "failed to clear stored token"),
        }
    }
}
