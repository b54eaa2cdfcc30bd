//! Client for the external authentication API (`POST /signup`, `POST /login`).
//!
//! Token issuing lives elsewhere; this only exchanges credentials for an
//! opaque bearer token.

use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::error::{LexitrackError, Result};

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct AuthClient {
    base_url: Url,
    http: reqwest::Client,
}

impl AuthClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| LexitrackError::Config(format!("invalid auth url {base_url}: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { base_url, http })
    }

    fn endpoint(&self, name: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                LexitrackError::Config(format!("auth url cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }

    /// Exchange credentials for a token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        self.post_credentials(
            "login",
            &Credentials {
                email,
                password,
                name: None,
            },
        )
        .await
    }

    /// Create an account. Returns the token of the new session.
    pub async fn signup(&self, email: &str, password: &str, name: Option<&str>) -> Result<String> {
        self.post_credentials(
            "signup",
            &Credentials {
                email,
                password,
                name,
            },
        )
        .await
    }

    async fn post_credentials(&self, endpoint: &str, creds: &Credentials<'_>) -> Result<String> {
        let url = self.endpoint(endpoint)?;
        let resp = self.http.post(url).json(creds).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        let parsed: Option<TokenResponse> = serde_json::from_str(&body).ok();
        let message = parsed
            .as_ref()
            .and_then(|p| p.message.clone())
            .unwrap_or_else(|| body.clone());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(LexitrackError::Unauthorized(message))
            }
            s if s.is_client_error() => Err(LexitrackError::InvalidInput(message)),
            s if !s.is_success() => Err(LexitrackError::Storage(format!(
                "auth {endpoint} returned {s}: {message}"
            ))),
            _ => parsed
                .and_then(|p| p.token)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    LexitrackError::Storage(format!("auth {endpoint} response has no token"))
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let client = AuthClient::new("http://localhost:5000/", 5).unwrap();
        assert_eq!(
            client.endpoint("login").unwrap().as_str(),
            "http://localhost:5000/login"
        );
        let client = AuthClient::new("http://localhost:5000/auth", 5).unwrap();
        assert_eq!(
            client.endpoint("signup").unwrap().as_str(),
            "http://localhost:5000/auth/signup"
        );
    }

    #[test]
    fn test_credentials_skip_missing_name() {
        let json = serde_json::to_string(&Credentials {
            email: "a@b.c",
            password: "pw",
            name: None,
        })
        .unwrap();
        assert!(!json.contains("name"));
    }

    #[test]
    fn test_token_response_tolerates_missing_fields() {
        let r: TokenResponse = serde_json::from_str(r#"{"message":"bad password"}"#).unwrap();
        assert!(r.token.is_none());
        assert_eq!(r.message.as_deref(), Some("bad password"));
    }
}
