use thiserror::Error;

#[derive(Debug, Error)]
pub enum LexitrackError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl LexitrackError {
    /// Returns `true` when the error is likely transient and worth retrying.
    ///
    /// Transport errors count only when the request timed out or never
    /// connected, or the status was 429 or 5xx. Builder, redirect and body
    /// decode errors fail the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || matches!(e.status(), Some(s) if s.as_u16() == 429 || s.is_server_error())
            }
            Self::Storage(msg) => is_transient_message(msg),
            _ => false,
        }
    }

    /// Returns `true` when the remote side rejected our credentials.
    /// The caller is expected to drop its session token.
    pub fn is_auth_expired(&self) -> bool {
        match self {
            Self::Unauthorized(_) => true,
            Self::Http(e) => matches!(e.status(), Some(s) if s.as_u16() == 401),
            _ => false,
        }
    }
}

fn is_transient_message(msg: &str) -> bool {
    let msg_lower = msg.to_lowercase();
    for code in ["429", "500", "502", "503", "504"] {
        if msg_lower.contains(code) {
            return true;
        }
    }
    let patterns = [
        "timeout",
        "timed out",
        "connection refused",
        "connection reset",
        "broken pipe",
        "temporarily unavailable",
        "database is locked",
    ];
    patterns.iter().any(|p| msg_lower.contains(p))
}

pub type Result<T> = std::result::Result<T, LexitrackError>;
