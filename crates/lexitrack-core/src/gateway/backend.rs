use std::future::Future;

use crate::error::Result;
use crate::model::*;

/// What happened to a versioned save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Applied,
    /// A write with a newer revision is already stored; this one was dropped.
    Stale,
}

/// Remote (or local) persistence for everything a session owns.
///
/// Every save carries a revision. Implementations keep the document with
/// the highest revision (last write wins) and report older writes as
/// [`SaveOutcome::Stale`].
pub trait PersistenceGateway: Send + Sync {
    // -- Profile --

    fn fetch_profile(&self, user_id: &str) -> impl Future<Output = Result<Option<UserProfile>>> + Send;

    fn save_profile(
        &self,
        profile: &UserProfile,
        revision: i64,
    ) -> impl Future<Output = Result<SaveOutcome>> + Send;

    // -- Custom tasks, keyed by (user, severity) --

    fn fetch_user_tasks(
        &self,
        user_id: &str,
        severity: Severity,
    ) -> impl Future<Output = Result<Vec<ScheduleActivity>>> + Send;

    fn save_user_tasks(
        &self,
        user_id: &str,
        severity: Severity,
        tasks: &[ScheduleActivity],
        revision: i64,
    ) -> impl Future<Output = Result<SaveOutcome>> + Send;

    // -- Progress snapshot --

    fn fetch_user_progress(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<ProgressBundle>>> + Send;

    fn save_user_progress(
        &self,
        user_id: &str,
        bundle: &ProgressBundle,
        revision: i64,
    ) -> impl Future<Output = Result<SaveOutcome>> + Send;

    // -- Records --

    fn fetch_emergency_contacts(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<EmergencyContact>>> + Send;

    fn save_emergency_contacts(
        &self,
        user_id: &str,
        contacts: &[EmergencyContact],
        revision: i64,
    ) -> impl Future<Output = Result<SaveOutcome>> + Send;

    fn fetch_checkup_logs(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<CheckupLog>>> + Send;

    fn save_checkup_logs(
        &self,
        user_id: &str,
        logs: &[CheckupLog],
        revision: i64,
    ) -> impl Future<Output = Result<SaveOutcome>> + Send;
}
