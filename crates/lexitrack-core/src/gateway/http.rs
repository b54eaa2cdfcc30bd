use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{PersistenceGateway, SaveOutcome};
use crate::error::{LexitrackError, Result};
use crate::model::*;
use crate::retry::{with_retry, Backoff};

/// Header carrying the revision of a versioned save.
pub const REVISION_HEADER: &str = "x-revision";

/// REST gateway talking to a `lexitrack-web` server (or anything that
/// speaks the same routes).
///
/// Fetches are retried on transient errors. Saves are attempted once; the
/// write queue owns the retry policy for them.
pub struct HttpGateway {
    base_url: Url,
    token: Option<String>,
    http: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout_secs: u64, token: Option<&str>) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| LexitrackError::Config(format!("invalid gateway url {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(LexitrackError::Config(format!(
                "gateway url cannot be a base: {base_url}"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()?;

        Ok(Self {
            base_url,
            token: token.filter(|t| !t.is_empty()).map(str::to_string),
            http,
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_string()
    }

    /// Build a URL from path segments. Segments are percent-encoded, so an
    /// email address is a single segment.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                LexitrackError::Config(format!("gateway url cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn get_doc<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Option<T>> {
        let what = segments.join("/");
        with_retry(Backoff::FETCH, &what, || self.get_doc_once(segments)).await
    }

    async fn get_doc_once<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Option<T>> {
        let url = self.url(segments)?;
        let resp = self.authorize(self.http.get(url.clone())).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        match status {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::UNAUTHORIZED => {
                return Err(LexitrackError::Unauthorized(format!("GET {}", url.path())))
            }
            s if !s.is_success() => {
                return Err(LexitrackError::Storage(format!(
                    "gateway GET {} returned {s}: {body}",
                    url.path()
                )))
            }
            _ => {}
        }

        Ok(decode_lenient(url.path(), &body))
    }

    async fn put_doc<T: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        value: &T,
        revision: i64,
    ) -> Result<SaveOutcome> {
        let url = self.url(segments)?;
        let resp = self
            .authorize(self.http.put(url.clone()))
            .header(REVISION_HEADER, revision.to_string())
            .json(value)
            .send()
            .await?;
        let status = resp.status();

        match status {
            StatusCode::CONFLICT => {
                tracing::debug!(path = url.path(), revision, "server kept a newer revision");
                Ok(SaveOutcome::Stale)
            }
            StatusCode::UNAUTHORIZED => {
                Err(LexitrackError::Unauthorized(format!("PUT {}", url.path())))
            }
            s if s.is_success() => Ok(SaveOutcome::Applied),
            s => {
                let body = resp.text().await.unwrap_or_default();
                Err(LexitrackError::Storage(format!(
                    "gateway PUT {} returned {s}: {body}",
                    url.path()
                )))
            }
        }
    }
}

/// Decode a response body, treating malformed payloads as missing.
fn decode_lenient<T: DeserializeOwned>(path: &str, body: &str) -> Option<T> {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(path, error = %e, "gateway returned invalid JSON, ignoring it");
            return None;
        }
    };
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(path, error = %e, "gateway payload has an unexpected shape, ignoring it");
            None
        }
    }
}

impl PersistenceGateway for HttpGateway {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.get_doc(&["api", "v1", "profile", user_id]).await
    }

    async fn save_profile(&self, profile: &UserProfile, revision: i64) -> Result<SaveOutcome> {
        self.put_doc(&["api", "v1", "profile", &profile.email], profile, revision)
            .await
    }

    async fn fetch_user_tasks(
        &self,
        user_id: &str,
        severity: Severity,
    ) -> Result<Vec<ScheduleActivity>> {
        Ok(self
            .get_doc(&["api", "v1", "users", user_id, "tasks", severity.as_str()])
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
        self.put_doc(
            &["api", "v1", "users", user_id, "tasks", severity.as_str()],
            tasks,
            revision,
        )
        .await
    }

    async fn fetch_user_progress(&self, user_id: &str) -> Result<Option<ProgressBundle>> {
        self.get_doc(&["api", "v1", "users", user_id, "progress"])
            .await
    }

    async fn save_user_progress(
        &self,
        user_id: &str,
        bundle: &ProgressBundle,
        revision: i64,
    ) -> Result<SaveOutcome> {
        self.put_doc(&["api", "v1", "users", user_id, "progress"], bundle, revision)
            .await
    }

    async fn fetch_emergency_contacts(&self, user_id: &str) -> Result<Vec<EmergencyContact>> {
        Ok(self
            .get_doc(&["api", "v1", "users", user_id, "contacts"])
            .await?
            .unwrap_or_default())
    }

    async fn save_emergency_contacts(
        &self,
        user_id: &str,
        contacts: &[EmergencyContact],
        revision: i64,
    ) -> Result<SaveOutcome> {
        self.put_doc(&["api", "v1", "users", user_id, "contacts"], contacts, revision)
            .await
    }

    async fn fetch_checkup_logs(&self, user_id: &str) -> Result<Vec<CheckupLog>> {
        Ok(self
            .get_doc(&["api", "v1", "users", user_id, "checkups"])
            .await?
            .unwrap_or_default())
    }

    async fn save_checkup_logs(
        &self,
        user_id: &str,
        logs: &[CheckupLog],
        revision: i64,
    ) -> Result<SaveOutcome> {
        self.put_doc(&["api", "v1", "users", user_id, "checkups"], logs, revision)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encodes_email_as_one_segment() {
        let gw = HttpGateway::new("http://localhost:37740", 5, None).unwrap();
        let url = gw
            .url(&["api", "v1", "users", "kid+test@example.com", "progress"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:37740/api/v1/users/kid+test@example.com/progress"
        );
        let url = gw.url(&["api", "v1", "users", "a/b", "progress"]).unwrap();
        assert!(url.path().contains("a%2Fb"));
    }

    #[test]
    fn test_base_url_with_prefix_path() {
        let gw = HttpGateway::new("http://localhost:8080/lexi/", 5, None).unwrap();
        assert_eq!(gw.base_url(), "http://localhost:8080/lexi");
        let url = gw.url(&["health"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/lexi/health");
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let err = HttpGateway::new("not a url", 5, None).err().unwrap();
        assert!(matches!(err, LexitrackError::Config(_)));
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let gw = HttpGateway::new("http://localhost:1", 5, Some("")).unwrap();
        assert!(gw.token.is_none());
    }

    #[test]
    fn test_decode_lenient() {
        let bundle: Option<ProgressBundle> =
            decode_lenient("/p", r#"{"milestonePoints": 12, "dailyLogs": []}"#);
        assert_eq!(bundle.unwrap().milestone_points, 12);

        let none: Option<ProgressBundle> = decode_lenient("/p", "null");
        assert!(none.is_none());

        let garbage: Option<Vec<EmergencyContact>> = decode_lenient("/c", "{oops");
        assert!(garbage.is_none());

        let wrong_shape: Option<Vec<EmergencyContact>> = decode_lenient("/c", r#"{"a": 1}"#);
        assert!(wrong_shape.is_none());
    }
}
