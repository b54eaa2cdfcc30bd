use crate::error::{LexitrackError, Result};
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexitrackConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub milestones: MilestoneConfig,
    #[serde(default)]
    pub templates: TemplateConfig,
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_backend")]
    pub backend: String,
    /// Custom path for the SQLite database. Defaults to `~/.config/lexitrack/lexitrack.db`.
    #[serde(default)]
    pub path: Option<String>,
    /// Base URL of the REST gateway when `backend = "http"`.
    #[serde(default = "default_gateway_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL of the authentication API. Falls back to `url` when unset.
    #[serde(default)]
    pub auth_url: Option<String>,
}

impl GatewayConfig {
    pub fn auth_base_url(&self) -> &str {
        self.auth_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(&self.url)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            backend: default_gateway_backend(),
            path: None,
            url: default_gateway_url(),
            timeout_secs: default_timeout_secs(),
            auth_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// `retry` or `fire_and_forget`.
    #[serde(default = "default_sync_policy")]
    pub policy: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            policy: default_sync_policy(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneConfig {
    /// Share of the original points awarded when a completed milestone is redone.
    #[serde(default = "default_redo_factor")]
    pub redo_factor: f64,
    /// Floor for the redo award.
    #[serde(default = "default_redo_min_points")]
    pub redo_min_points: u32,
}

impl Default for MilestoneConfig {
    fn default() -> Self {
        Self {
            redo_factor: default_redo_factor(),
            redo_min_points: default_redo_min_points(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Path to a severity-keyed template JSON. The built-in catalog is used when unset.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_web_port")]
    pub port: u16,
    #[serde(default = "default_web_host")]
    pub host: String,
    /// When set, every `/api` route requires `Authorization: Bearer <token>`.
    #[serde(default)]
    pub api_token: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_web_port(),
            host: default_web_host(),
            api_token: None,
        }
    }
}

/// Valid gateway backend names.
pub const VALID_GATEWAY_BACKENDS: &[&str] = &["sqlite", "http"];

/// Valid write-queue policy names.
pub const VALID_SYNC_POLICIES: &[&str] = &["retry", "fire_and_forget"];

// -- Defaults --

fn default_gateway_backend() -> String {
    "sqlite".to_string()
}
fn default_gateway_url() -> String {
    "http://127.0.0.1:37740".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_sync_policy() -> String {
    "retry".to_string()
}
fn default_max_retries() -> usize {
    3
}
fn default_base_delay_ms() -> u64 {
    200
}
fn default_redo_factor() -> f64 {
    0.8
}
fn default_redo_min_points() -> u32 {
    1
}
fn default_web_port() -> u16 {
    37740
}
fn default_web_host() -> String {
    "127.0.0.1".to_string()
}

impl LexitrackConfig {
    /// Load configuration with three-layer TOML merge:
    /// 1. ~/.config/lexitrack/config.toml (global)
    /// 2. .lexitrack/config.toml (project)
    /// 3. .lexitrack/config.local.toml (local, gitignored)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(dir) = project_dir {
            let project_config = dir.join(".lexitrack").join("config.toml");
            if project_config.exists() {
                builder = builder.add_source(File::from(project_config).required(false));
            }

            let local_config = dir.join(".lexitrack").join("config.local.toml");
            if local_config.exists() {
                builder = builder.add_source(File::from(local_config).required(false));
            }
        }

        let config = builder
            .build()
            .map_err(|e| LexitrackError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| LexitrackError::Config(e.to_string()))?;

        cfg.validate();
        Ok(cfg)
    }

    /// Defaults only (no files).
    pub fn default_config() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            sync: SyncConfig::default(),
            milestones: MilestoneConfig::default(),
            templates: TemplateConfig::default(),
            user: UserConfig::default(),
            web: WebConfig::default(),
        }
    }

    /// Validate config values, clamping out-of-range values and logging warnings.
    /// Lenient: it fixes values rather than rejecting the config.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !VALID_GATEWAY_BACKENDS.contains(&self.gateway.backend.as_str()) {
            warnings.push(format!(
                "unknown gateway backend '{}', valid: {}",
                self.gateway.backend,
                VALID_GATEWAY_BACKENDS.join(", ")
            ));
        }

        if !VALID_SYNC_POLICIES.contains(&self.sync.policy.as_str()) {
            warnings.push(format!(
                "unknown sync policy '{}', falling back to retry",
                self.sync.policy
            ));
            self.sync.policy = default_sync_policy();
        }

        if !(0.0..=1.0).contains(&self.milestones.redo_factor) || self.milestones.redo_factor.is_nan() {
            let clamped = if self.milestones.redo_factor.is_nan() {
                default_redo_factor()
            } else {
                self.milestones.redo_factor.clamp(0.0, 1.0)
            };
            warnings.push(format!(
                "milestones.redo_factor = {} out of range [0.0, 1.0], using {clamped}",
                self.milestones.redo_factor
            ));
            self.milestones.redo_factor = clamped;
        }

        if self.gateway.timeout_secs == 0 {
            warnings.push("gateway.timeout_secs = 0, setting to 1".to_string());
            self.gateway.timeout_secs = 1;
        }
        if self.sync.base_delay_ms == 0 && self.sync.policy == "retry" {
            warnings.push("sync.base_delay_ms = 0, setting to 10".to_string());
            self.sync.base_delay_ms = 10;
        }

        for w in &warnings {
            tracing::warn!("config: {}", w);
        }

        warnings
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("lexitrack").join("config.toml"))
}

/// Resolve which user the session belongs to.
///
/// Priority: config `user.email` → stored login session → `None`.
pub fn resolve_user_id(config: &UserConfig, stored: &StoredSession) -> Option<String> {
    if let Some(ref email) = config.email {
        if !email.trim().is_empty() {
            return Some(email.trim().to_string());
        }
    }
    if !stored.email.is_empty() {
        return Some(stored.email.clone());
    }
    None
}

// ---------------------------------------------------------------------------
// Stored login session
// ---------------------------------------------------------------------------

/// Login state persisted between CLI invocations. The token is opaque.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StoredSession {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub token: String,
    /// RFC3339 timestamp of the login that produced the token.
    #[serde(default)]
    pub saved_at: String,
}

impl StoredSession {
    pub fn new(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            token: token.into(),
            saved_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Path to the session file: `~/.config/lexitrack/session.toml`
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lexitrack").join("session.toml"))
    }

    pub fn token(&self) -> Option<&str> {
        (!self.token.is_empty()).then_some(self.token.as_str())
    }

    /// Load from the default path. Missing or unparseable files give `Default`.
    pub fn load() -> Self {
        Self::path().map(|p| Self::load_from(&p)).unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path()
            .ok_or_else(|| LexitrackError::Config("cannot determine config directory".to_string()))?;
        self.save_to(&path)
    }

    /// Save, creating the parent directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LexitrackError::Config(format!("failed to create config dir: {e}")))?;
        }
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| LexitrackError::Config(format!("failed to serialize session: {e}")))?;
        std::fs::write(path, toml_str)
            .map_err(|e| LexitrackError::Config(format!("failed to write session: {e}")))?;
        Ok(())
    }

    /// Forget the token (on logout or when the server answers 401).
    /// The email is kept so the next login can be prefilled.
    pub fn clear_token_at(path: &Path) -> Result<()> {
        let mut stored = Self::load_from(path);
        if stored.token.is_empty() {
            return Ok(());
        }
        stored.token.clear();
        stored.save_to(path)
    }

    pub fn clear_token() -> Result<()> {
        match Self::path() {
            Some(path) => Self::clear_token_at(&path),
            None => Ok(()),
        }
    }
}
