//! Background write queue.
//!
//! Mutations never wait on persistence: they enqueue a [`SaveJob`] and move
//! on. A detached worker drains the queue, coalescing jobs for the same
//! document down to the newest revision, and records failures in a shared
//! [`SyncStatus`]. Local state is never rolled back.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::gateway::{PersistenceGateway, SaveOutcome};
use crate::model::*;
use crate::retry::{with_retry, Backoff};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePolicy {
    /// One attempt; failures are only recorded.
    FireAndForget,
    /// Exponential backoff on transient errors.
    Retry { max_retries: usize, base_delay_ms: u64 },
}

impl From<&SyncConfig> for SavePolicy {
    fn from(config: &SyncConfig) -> Self {
        match config.policy.as_str() {
            "fire_and_forget" => SavePolicy::FireAndForget,
            _ => SavePolicy::Retry {
                max_retries: config.max_retries,
                base_delay_ms: config.base_delay_ms,
            },
        }
    }
}

/// Which document a save replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveKey {
    Profile,
    Tasks(Severity),
    Progress,
    Contacts,
    Checkups,
}

impl std::fmt::Display for SaveKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveKey::Profile => write!(f, "profile"),
            SaveKey::Tasks(severity) => write!(f, "tasks:{severity}"),
            SaveKey::Progress => write!(f, "progress"),
            SaveKey::Contacts => write!(f, "contacts"),
            SaveKey::Checkups => write!(f, "checkups"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SavePayload {
    Profile(UserProfile),
    Tasks {
        severity: Severity,
        tasks: Vec<ScheduleActivity>,
    },
    Progress(ProgressBundle),
    Contacts(Vec<EmergencyContact>),
    Checkups(Vec<CheckupLog>),
}

impl SavePayload {
    pub fn key(&self) -> SaveKey {
        match self {
            SavePayload::Profile(_) => SaveKey::Profile,
            SavePayload::Tasks { severity, .. } => SaveKey::Tasks(*severity),
            SavePayload::Progress(_) => SaveKey::Progress,
            SavePayload::Contacts(_) => SaveKey::Contacts,
            SavePayload::Checkups(_) => SaveKey::Checkups,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveJob {
    pub user_id: String,
    pub revision: i64,
    pub payload: SavePayload,
}

impl SaveJob {
    fn same_document(&self, other: &SaveJob) -> bool {
        self.user_id == other.user_id && self.payload.key() == other.payload.key()
    }

    async fn run<G: PersistenceGateway>(&self, gateway: &G) -> Result<SaveOutcome> {
        let user = self.user_id.as_str();
        let rev = self.revision;
        match &self.payload {
            SavePayload::Profile(profile) => gateway.save_profile(profile, rev).await,
            SavePayload::Tasks { severity, tasks } => {
                gateway.save_user_tasks(user, *severity, tasks, rev).await
            }
            SavePayload::Progress(bundle) => gateway.save_user_progress(user, bundle, rev).await,
            SavePayload::Contacts(contacts) => {
                gateway.save_emergency_contacts(user, contacts, rev).await
            }
            SavePayload::Checkups(logs) => gateway.save_checkup_logs(user, logs, rev).await,
        }
    }
}

/// Monotonic, timestamp-based revision numbers (microseconds since epoch).
#[derive(Debug, Default)]
pub struct RevisionClock {
    last: AtomicI64,
}

impl RevisionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time in microseconds, bumped past the previous revision when
    /// the clock has not moved.
    pub fn next(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_micros();
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        now.max(prev.saturating_add(1))
    }
}

/// Outcome counters and the most recent failure, shared with the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncStatus {
    pub applied: u64,
    pub stale: u64,
    pub failed: u64,
    pub coalesced: u64,
    pub last_error: Option<String>,
    /// The gateway rejected our credentials. Cleared only by a new session.
    pub auth_expired: bool,
}

enum Command {
    Save(SaveJob),
    Flush(oneshot::Sender<()>),
}

/// Handle to the background writer. Cheap to share behind the session.
pub struct WriteQueue {
    tx: mpsc::UnboundedSender<Command>,
    status: Arc<Mutex<SyncStatus>>,
    clock: RevisionClock,
    policy: SavePolicy,
}

impl WriteQueue {
    /// Spawn the worker on the current Tokio runtime.
    pub fn spawn<G: PersistenceGateway + 'static>(gateway: Arc<G>, policy: SavePolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let status = Arc::new(Mutex::new(SyncStatus::default()));
        tokio::spawn(worker(gateway, policy, Arc::clone(&status), rx));
        Self {
            tx,
            status,
            clock: RevisionClock::new(),
            policy,
        }
    }

    pub fn policy(&self) -> SavePolicy {
        self.policy
    }

    /// Stamp a revision on `payload` and hand it to the worker.
    pub fn enqueue(&self, user_id: &str, payload: SavePayload) -> i64 {
        let revision = self.clock.next();
        let job = SaveJob {
            user_id: user_id.to_string(),
            revision,
            payload,
        };
        tracing::debug!(key = %job.payload.key(), revision, "save queued");
        if self.tx.send(Command::Save(job)).is_err() {
            self.record(|s| {
                s.failed += 1;
                s.last_error = Some("write queue is closed".to_string());
            });
        }
        revision
    }

    /// Wait until every save queued before this call has been attempted.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Take the last error, leaving `None` behind.
    pub fn take_error(&self) -> Option<String> {
        self.status.lock().ok().and_then(|mut s| s.last_error.take())
    }

    fn record(&self, f: impl FnOnce(&mut SyncStatus)) {
        if let Ok(mut status) = self.status.lock() {
            f(&mut status);
        }
    }
}

/// Jobs received together, newest revision per document.
#[derive(Default)]
struct Batch {
    jobs: Vec<SaveJob>,
    acks: Vec<oneshot::Sender<()>>,
    coalesced: u64,
}

impl Batch {
    fn push(&mut self, cmd: Command) {
        match cmd {
            Command::Save(job) => {
                if let Some(existing) = self.jobs.iter_mut().find(|j| j.same_document(&job)) {
                    self.coalesced += 1;
                    if job.revision >= existing.revision {
                        *existing = job;
                    }
                } else {
                    self.jobs.push(job);
                }
            }
            Command::Flush(ack) => self.acks.push(ack),
        }
    }
}

async fn worker<G: PersistenceGateway>(
    gateway: Arc<G>,
    policy: SavePolicy,
    status: Arc<Mutex<SyncStatus>>,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    while let Some(cmd) = rx.recv().await {
        let mut batch = Batch::default();
        batch.push(cmd);
        while let Ok(cmd) = rx.try_recv() {
            batch.push(cmd);
        }

        if batch.coalesced > 0 {
            if let Ok(mut s) = status.lock() {
                s.coalesced += batch.coalesced;
            }
        }

        for job in &batch.jobs {
            let result = match policy {
                SavePolicy::FireAndForget => job.run(gateway.as_ref()).await,
                SavePolicy::Retry {
                    max_retries,
                    base_delay_ms,
                } => {
                    let backoff = Backoff::new(max_retries, base_delay_ms);
                    let what = job.payload.key().to_string();
                    with_retry(backoff, &what, || job.run(gateway.as_ref())).await
                }
            };
            record_result(&status, job, result);
        }

        for ack in batch.acks {
            let _ = ack.send(());
        }
    }
    tracing::debug!("write queue closed");
}

fn record_result(status: &Mutex<SyncStatus>, job: &SaveJob, result: Result<SaveOutcome>) {
    let key = job.payload.key();
    let Ok(mut s) = status.lock() else {
        return;
    };
    match result {
        Ok(SaveOutcome::Applied) => {
            tracing::debug!(%key, revision = job.revision, "save applied");
            s.applied += 1;
        }
        Ok(SaveOutcome::Stale) => {
            tracing::debug!(%key, revision = job.revision, "save superseded by a newer revision");
            s.stale += 1;
        }
        Err(e) => {
            tracing::warn!(%key, error = %e, "save failed, keeping local state");
            s.failed += 1;
            if e.is_auth_expired() {
                s.auth_expired = true;
                s.last_error = Some("session expired, please log in again".to_string());
            } else {
                s.last_error = Some(format!("failed to save {key}: {e}"));
            }
        }
    }
}
