mod backend;
mod http;
mod sqlite;

pub use backend::{PersistenceGateway, SaveOutcome};
pub use http::{HttpGateway, REVISION_HEADER};
pub use sqlite::SqliteGateway;

use crate::config::LexitrackConfig;
use crate::error::{LexitrackError, Result};
use crate::model::*;

/// Enum wrapper for gateway backends. Dispatches to the concrete implementation.
/// Using an enum instead of `Box<dyn PersistenceGateway>` because the trait uses RPITIT.
pub enum Gateway {
    Sqlite(SqliteGateway),
    Http(HttpGateway),
}

impl PersistenceGateway for Gateway {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        match self {
            Gateway::Sqlite(g) => g.fetch_profile(user_id).await,
            Gateway::Http(g) => g.fetch_profile(user_id).await,
        }
    }

    async fn save_profile(&self, profile: &UserProfile, revision: i64) -> Result<SaveOutcome> {
        match self {
            Gateway::Sqlite(g) => g.save_profile(profile, revision).await,
            Gateway::Http(g) => g.save_profile(profile, revision).await,
        }
    }

    async fn fetch_user_tasks(
        &self,
        user_id: &str,
        severity: Severity,
    ) -> Result<Vec<ScheduleActivity>> {
        match self {
            Gateway::Sqlite(g) => g.fetch_user_tasks(user_id, severity).await,
            Gateway::Http(g) => g.fetch_user_tasks(user_id, severity).await,
        }
    }

    async fn save_user_tasks(
        &self,
        user_id: &str,
        severity: Severity,
        tasks: &[ScheduleActivity],
        revision: i64,
    ) -> Result<SaveOutcome> {
        match self {
            Gateway::Sqlite(g) => g.save_user_tasks(user_id, severity, tasks, revision).await,
            Gateway::Http(g) => g.save_user_tasks(user_id, severity, tasks, revision).await,
        }
    }

    async fn fetch_user_progress(&self, user_id: &str) -> Result<Option<ProgressBundle>> {
        match self {
            Gateway::Sqlite(g) => g.fetch_user_progress(user_id).await,
            Gateway::Http(g) => g.fetch_user_progress(user_id).await,
        }
    }

    async fn save_user_progress(
        &self,
        user_id: &str,
        bundle: &ProgressBundle,
        revision: i64,
    ) -> Result<SaveOutcome> {
        match self {
            Gateway::Sqlite(g) => g.save_user_progress(user_id, bundle, revision).await,
            Gateway::Http(g) => g.save_user_progress(user_id, bundle, revision).await,
        }
    }

    async fn fetch_emergency_contacts(&self, user_id: &str) -> Result<Vec<EmergencyContact>> {
        match self {
            Gateway::Sqlite(g) => g.fetch_emergency_contacts(user_id).await,
            Gateway::Http(g) => g.fetch_emergency_contacts(user_id).await,
        }
    }

    async fn save_emergency_contacts(
        &self,
        user_id: &str,
        contacts: &[EmergencyContact],
        revision: i64,
    ) -> Result<SaveOutcome> {
        match self {
            Gateway::Sqlite(g) => g.save_emergency_contacts(user_id, contacts, revision).await,
            Gateway::Http(g) => g.save_emergency_contacts(user_id, contacts, revision).await,
        }
    }

    async fn fetch_checkup_logs(&self, user_id: &str) -> Result<Vec<CheckupLog>> {
        match self {
            Gateway::Sqlite(g) => g.fetch_checkup_logs(user_id).await,
            Gateway::Http(g) => g.fetch_checkup_logs(user_id).await,
        }
    }

    async fn save_checkup_logs(
        &self,
        user_id: &str,
        logs: &[CheckupLog],
        revision: i64,
    ) -> Result<SaveOutcome> {
        match self {
            Gateway::Sqlite(g) => g.save_checkup_logs(user_id, logs, revision).await,
            Gateway::Http(g) => g.save_checkup_logs(user_id, logs, revision).await,
        }
    }
}

impl Gateway {
    /// Human-readable description of where data goes, for `status` output.
    pub fn describe(&self) -> String {
        match self {
            Gateway::Sqlite(g) => format!("sqlite ({})", g.path().display()),
            Gateway::Http(g) => format!("http ({})", g.base_url()),
        }
    }

    /// Schema version for SQLite, `None` for HTTP.
    pub fn schema_version(&self) -> Option<i32> {
        match self {
            Gateway::Sqlite(g) => g.schema_version().ok(),
            Gateway::Http(_) => None,
        }
    }
}

/// Create a gateway from the given configuration. `token` is only used by
/// the HTTP backend.
pub fn create_gateway(config: &LexitrackConfig, token: Option<&str>) -> Result<Gateway> {
    match config.gateway.backend.as_str() {
        "sqlite" => {
            let path = match &config.gateway.path {
                Some(p) => std::path::PathBuf::from(p),
                None => default_sqlite_path()?,
            };
            let gateway = SqliteGateway::open(&path)?;
            Ok(Gateway::Sqlite(gateway))
        }
        "http" => {
            let gateway =
                HttpGateway::new(&config.gateway.url, config.gateway.timeout_secs, token)?;
            Ok(Gateway::Http(gateway))
        }
        other => Err(LexitrackError::Config(format!(
            "unknown gateway backend: {other}"
        ))),
    }
}

/// Default SQLite path: `~/.config/lexitrack/lexitrack.db`
pub fn default_sqlite_path() -> Result<std::path::PathBuf> {
    dirs::config_dir()
        .map(|p| p.join("lexitrack").join("lexitrack.db"))
        .ok_or_else(|| LexitrackError::Config("cannot determine config directory".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_gateway_rejects_unknown_backend() {
        let mut config = LexitrackConfig::default_config();
        config.gateway.backend = "mongo".into();
        let err = create_gateway(&config, None).err().unwrap();
        assert!(err.to_string().contains("unknown gateway backend"));
    }

    #[test]
    fn test_create_http_gateway() {
        let mut config = LexitrackConfig::default_config();
        config.gateway.backend = "http".into();
        config.gateway.url = "http://localhost:9999/".into();
        let gateway = create_gateway(&config, Some("tok")).unwrap();
        assert_eq!(gateway.describe(), "http (http://localhost:9999)");
        assert!(gateway.schema_version().is_none());
    }

    #[tokio::test]
    async fn test_enum_dispatch_reaches_sqlite() {
        let gateway = Gateway::Sqlite(SqliteGateway::open_in_memory().unwrap());
        let tasks = vec![ScheduleActivity::new("09:00", "Read aloud")];
        let outcome = gateway
            .save_user_tasks("a@b.c", Severity::Moderate, &tasks, 1)
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Applied);
        let loaded = gateway
            .fetch_user_tasks("a@b.c", Severity::Moderate)
            .await
            .unwrap();
        assert_eq!(loaded, tasks);
        assert_eq!(gateway.schema_version(), Some(1));
    }
}
