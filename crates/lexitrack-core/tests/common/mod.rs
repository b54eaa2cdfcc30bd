//! Shared helpers for session-level integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use lexitrack_core::error::{LexitrackError, Result};
use lexitrack_core::gateway::{PersistenceGateway, SaveOutcome, SqliteGateway};
use lexitrack_core::model::*;
use lexitrack_core::session::{Clock, Session, SessionOptions};
use lexitrack_core::sync::SavePolicy;
use lexitrack_core::template::TemplateCatalog;

pub const USER: &str = "reader@example.com";

pub fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

pub fn options(today: NaiveDate) -> SessionOptions {
    SessionOptions {
        save_policy: SavePolicy::FireAndForget,
        ..Default::default()
    }
    .with_clock(Clock::Fixed(today))
}

pub fn in_memory() -> Arc<SqliteGateway> {
    Arc::new(SqliteGateway::open_in_memory().expect("in-memory gateway"))
}

/// Store a profile with `severity` so the next session picks it up.
pub async fn seed_profile(gateway: &SqliteGateway, severity: Severity) {
    let profile = UserProfile::new(USER).with_severity(severity);
    gateway.save_profile(&profile, 1).await.expect("seed profile");
}

pub async fn open<G: PersistenceGateway + 'static>(
    gateway: Arc<G>,
    today: NaiveDate,
) -> Session<G> {
    Session::open(
        gateway,
        TemplateCatalog::builtin().expect("builtin templates"),
        USER,
        options(today),
    )
    .await
    .expect("session opens")
}

/// Reads from an in-memory store but rejects every save.
pub struct FailingGateway {
    pub inner: SqliteGateway,
    pub attempts: AtomicUsize,
    pub error: fn() -> LexitrackError,
}

impl FailingGateway {
    pub fn new(error: fn() -> LexitrackError) -> Self {
        Self {
            inner: SqliteGateway::open_in_memory().expect("in-memory gateway"),
            attempts: AtomicUsize::new(0),
            error,
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn reject(&self) -> Result<SaveOutcome> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err((self.error)())
    }
}

impl PersistenceGateway for FailingGateway {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.inner.fetch_profile(user_id).await
    }
    async fn save_profile(&self, _: &UserProfile, _: i64) -> Result<SaveOutcome> {
        self.reject()
    }
    async fn fetch_user_tasks(&self, user_id: &str, s: Severity) -> Result<Vec<ScheduleActivity>> {
        self.inner.fetch_user_tasks(user_id, s).await
    }
    async fn save_user_tasks(
        &self,
        _: &str,
        _: Severity,
        _: &[ScheduleActivity],
        _: i64,
    ) -> Result<SaveOutcome> {
        self.reject()
    }
    async fn fetch_user_progress(&self, user_id: &str) -> Result<Option<ProgressBundle>> {
        self.inner.fetch_user_progress(user_id).await
    }
    async fn save_user_progress(&self, _: &str, _: &ProgressBundle, _: i64) -> Result<SaveOutcome> {
        self.reject()
    }
    async fn fetch_emergency_contacts(&self, user_id: &str) -> Result<Vec<EmergencyContact>> {
        self.inner.fetch_emergency_contacts(user_id).await
    }
    async fn save_emergency_contacts(
        &self,
        _: &str,
        _: &[EmergencyContact],
        _: i64,
    ) -> Result<SaveOutcome> {
        self.reject()
    }
    async fn fetch_checkup_logs(&self, user_id: &str) -> Result<Vec<CheckupLog>> {
        self.inner.fetch_checkup_logs(user_id).await
    }
    async fn save_checkup_logs(&self, _: &str, _: &[CheckupLog], _: i64) -> Result<SaveOutcome> {
        self.reject()
    }
}
