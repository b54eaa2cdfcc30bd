use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{PersistenceGateway, SaveOutcome};
use crate::error::{LexitrackError, Result};
use crate::model::*;

const SCHEMA_VERSION: i32 = 1;

/// SQLite-backed gateway.
///
/// Every persisted thing is one JSON document per `(user_id, kind)` row,
/// replaced wholesale on save. A save only lands when its revision is not
/// older than the stored one.
///
/// Uses a single `Connection` behind `Arc<Mutex<>>`; blocking calls go
/// through [`with_conn`](Self::with_conn) on the Tokio blocking pool.
pub struct SqliteGateway {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteGateway {
    /// Open (or create) a file-backed database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    LexitrackError::Storage(format!("failed to create database directory: {e}"))
                })?;
            }
        }
        let conn = Connection::open(&path)
            .map_err(|e| LexitrackError::Storage(format!("failed to open SQLite database: {e}")))?;

        Self::configure_and_init(conn, path)
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            LexitrackError::Storage(format!("failed to open in-memory SQLite database: {e}"))
        })?;

        Self::configure_and_init(conn, PathBuf::from(":memory:"))
    }

    /// Path this database was opened with (`:memory:` for in-memory).
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn configure_and_init(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(|e| LexitrackError::Storage(format!("failed to set WAL mode: {e}")))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(|e| LexitrackError::Storage(format!("failed to set busy timeout: {e}")))?;

        let gateway = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };

        gateway.create_tables()?;
        Ok(gateway)
    }

    /// Create tables (idempotent) and stamp the schema version.
    fn create_tables(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| LexitrackError::Storage(format!("failed to acquire database lock: {e}")))?;

        conn.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS documents (
                user_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                revision INTEGER NOT NULL DEFAULT 0,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, kind)
            );

            CREATE INDEX IF NOT EXISTS idx_documents_user ON documents(user_id);

            PRAGMA user_version = {SCHEMA_VERSION};
            "
        ))
        .map_err(|e| LexitrackError::Storage(format!("failed to create tables: {e}")))?;

        Ok(())
    }

    /// Schema version recorded in the database file.
    pub fn schema_version(&self) -> Result<i32> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| LexitrackError::Storage(format!("failed to acquire database lock: {e}")))?;
        conn.query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(|e| LexitrackError::Storage(format!("failed to read schema version: {e}")))
    }

    /// Run a blocking closure against the connection on the Tokio blocking pool.
    pub(crate) async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                LexitrackError::Storage(format!("failed to acquire database lock: {e}"))
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| LexitrackError::Storage(format!("task join error: {e}")))?
    }

    /// Revision of the stored document, if any.
    pub async fn stored_revision(&self, user_id: &str, kind: &str) -> Result<Option<i64>> {
        let user = user_id.to_string();
        let kind = kind.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT revision FROM documents WHERE user_id = ?1 AND kind = ?2",
                params![user, kind],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| LexitrackError::Storage(format!("failed to read revision: {e}")))
        })
        .await
    }

    /// Load a document. A body that no longer parses is treated as missing.
    async fn load_doc<T: DeserializeOwned>(&self, user_id: &str, kind: &str) -> Result<Option<T>> {
        let user = user_id.to_string();
        let key = kind.to_string();
        let body: Option<String> = self
            .with_conn(move |conn| {
                conn.query_row(
                    "SELECT body FROM documents WHERE user_id = ?1 AND kind = ?2",
                    params![user, key],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| LexitrackError::Storage(format!("failed to load document: {e}")))
            })
            .await?;

        Ok(body.and_then(|b| match serde_json::from_str(&b) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(kind, error = %e, "stored document is malformed, ignoring it");
                None
            }
        }))
    }

    async fn store_doc<T: Serialize + ?Sized>(
        &self,
        user_id: &str,
        kind: &str,
        value: &T,
        revision: i64,
    ) -> Result<SaveOutcome> {
        let body = serde_json::to_string(value)?;
        let user = user_id.to_string();
        let key = kind.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let changed = self
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO documents (user_id, kind, revision, body, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(user_id, kind) DO UPDATE SET
                         revision = excluded.revision,
                         body = excluded.body,
                         updated_at = excluded.updated_at
                     WHERE excluded.revision >= documents.revision",
                    params![user, key, revision, body, now],
                )
                .map_err(|e| LexitrackError::Storage(format!("failed to save document: {e}")))
            })
            .await?;

        if changed == 0 {
            tracing::debug!(kind, revision, "dropping stale save");
            Ok(SaveOutcome::Stale)
        } else {
            Ok(SaveOutcome::Applied)
        }
    }
}

pub(crate) fn tasks_kind(severity: Severity) -> String {
    format!("tasks:{severity}")
}

pub(crate) const PROFILE_KIND: &str = "profile";
pub(crate) const PROGRESS_KIND: &str = "progress";
pub(crate) const CONTACTS_KIND: &str = "contacts";
pub(crate) const CHECKUPS_KIND: &str = "checkups";

impl PersistenceGateway for SqliteGateway {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.load_doc(user_id, PROFILE_KIND).await
    }

    async fn save_profile(&self, profile: &UserProfile, revision: i64) -> Result<SaveOutcome> {
        self.store_doc(&profile.email, PROFILE_KIND, profile, revision)
            .await
    }

    async fn fetch_user_tasks(
        &self,
        user_id: &str,
        severity: Severity,
    ) -> Result<Vec<ScheduleActivity>> {
        Ok(self
            .load_doc(user_id, &tasks_kind(severity))
            .await?
            .unwrap_or_default())
    }

    async fn save_user_tasks(
        &self,
        user_id: &str,
        severity: Severity,
        tasks: &[ScheduleActivity],
        revision: i64,
    ) -> Result<SaveOutcome> {
        self.store_doc(user_id, &tasks_kind(severity), tasks, revision)
            .await
    }

    async fn fetch_user_progress(&self, user_id: &str) -> Result<Option<ProgressBundle>> {
        self.load_doc(user_id, PROGRESS_KIND).await
    }

    async fn save_user_progress(
        &self,
        user_id: &str,
        bundle: &ProgressBundle,
        revision: i64,
    ) -> Result<SaveOutcome> {
        self.store_doc(user_id, PROGRESS_KIND, bundle, revision)
            .await
    }

    async fn fetch_emergency_contacts(&self, user_id: &str) -> Result<Vec<EmergencyContact>> {
        Ok(self
            .load_doc(user_id, CONTACTS_KIND)
            .await?
            .unwrap_or_default())
    }

    async fn save_emergency_contacts(
        &self,
        user_id: &str,
        contacts: &[EmergencyContact],
        revision: i64,
    ) -> Result<SaveOutcome> {
        self.store_doc(user_id, CONTACTS_KIND, contacts, revision)
            .await
    }

    async fn fetch_checkup_logs(&self, user_id: &str) -> Result<Vec<CheckupLog>> {
        Ok(self
            .load_doc(user_id, CHECKUPS_KIND)
            .await?
            .unwrap_or_default())
    }

    async fn save_checkup_logs(
        &self,
        user_id: &str,
        logs: &[CheckupLog],
        revision: i64,
    ) -> Result<SaveOutcome> {
        self.store_doc(user_id, CHECKUPS_KIND, logs, revision)
            .await
    }
}
