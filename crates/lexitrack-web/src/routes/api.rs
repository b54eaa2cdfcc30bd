use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use lexitrack_core::gateway::{PersistenceGateway, SaveOutcome, REVISION_HEADER};
use lexitrack_core::model::*;

use crate::error::ApiError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/v1/users/{user}/tasks/{severity}",
            get(get_tasks).put(put_tasks),
        )
        .route(
            "/api/v1/users/{user}/progress",
            get(get_progress).put(put_progress),
        )
        .route(
            "/api/v1/users/{user}/contacts",
            get(get_contacts).put(put_contacts),
        )
        .route(
            "/api/v1/users/{user}/checkups",
            get(get_checkups).put(put_checkups),
        )
        .route("/api/v1/profile/{user}", get(get_profile).put(put_profile))
}

// -- Auth --

/// Passes when no API token is configured or the request carries it as a
/// bearer token.
pub struct Authorized;

impl FromRequestParts<Arc<AppState>> for Authorized {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.api_token.as_deref() else {
            return Ok(Authorized);
        };
        let presented = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);
        match presented {
            Some(token) if token == expected => Ok(Authorized),
            Some(_) => Err(ApiError::unauthorized("invalid token")),
            None => Err(ApiError::unauthorized("missing bearer token")),
        }
    }
}

// -- Helpers --

fn parse_revision(headers: &HeaderMap) -> Result<i64, ApiError> {
    let raw = headers
        .get(REVISION_HEADER)
        .ok_or_else(|| ApiError::bad_request(format!("missing {REVISION_HEADER} header")))?;
    raw.to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or_else(|| ApiError::bad_request(format!("{REVISION_HEADER} must be an integer")))
}

fn parse_severity(raw: &str) -> Result<Severity, ApiError> {
    raw.parse::<Severity>().map_err(ApiError::bad_request)
}

fn saved(outcome: SaveOutcome, revision: i64) -> Response {
    match outcome {
        SaveOutcome::Applied => (
            StatusCode::OK,
            Json(serde_json::json!({ "revision": revision })),
        )
            .into_response(),
        SaveOutcome::Stale => {
            ApiError::conflict(format!("revision {revision} is older than the stored document"))
                .into_response()
        }
    }
}

// -- Tasks --

async fn get_tasks(
    _auth: Authorized,
    State(state): State<Arc<AppState>>,
    Path((user, severity)): Path<(String, String)>,
) -> Result<Json<Vec<ScheduleActivity>>, ApiError> {
    let severity = parse_severity(&severity)?;
    Ok(Json(state.gateway.fetch_user_tasks(&user, severity).await?))
}

async fn put_tasks(
    _auth: Authorized,
    State(state): State<Arc<AppState>>,
    Path((user, severity)): Path<(String, String)>,
    headers: HeaderMap,
    Json(tasks): Json<Vec<ScheduleActivity>>,
) -> Result<Response, ApiError> {
    let severity = parse_severity(&severity)?;
    let revision = parse_revision(&headers)?;
    let outcome = state
        .gateway
        .save_user_tasks(&user, severity, &tasks, revision)
        .await?;
    Ok(saved(outcome, revision))
}

// -- Progress --

async fn get_progress(
    _auth: Authorized,
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> Result<Json<ProgressBundle>, ApiError> {
    state
        .gateway
        .fetch_user_progress(&user)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no progress for {user}")))
}

async fn put_progress(
    _auth: Authorized,
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    headers: HeaderMap,
    Json(bundle): Json<ProgressBundle>,
) -> Result<Response, ApiError> {
    let revision = parse_revision(&headers)?;
    let outcome = state
        .gateway
        .save_user_progress(&user, &bundle, revision)
        .await?;
    Ok(saved(outcome, revision))
}

// -- Records --

async fn get_contacts(
    _auth: Authorized,
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> Result<Json<Vec<EmergencyContact>>, ApiError> {
    Ok(Json(state.gateway.fetch_emergency_contacts(&user).await?))
}

async fn put_contacts(
    _auth: Authorized,
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    headers: HeaderMap,
    Json(contacts): Json<Vec<EmergencyContact>>,
) -> Result<Response, ApiError> {
    let revision = parse_revision(&headers)?;
    for contact in &contacts {
        contact.validate()?;
    }
    let outcome = state
        .gateway
        .save_emergency_contacts(&user, &dedup_records(contacts), revision)
        .await?;
    Ok(saved(outcome, revision))
}

async fn get_checkups(
    _auth: Authorized,
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> Result<Json<Vec<CheckupLog>>, ApiError> {
    Ok(Json(state.gateway.fetch_checkup_logs(&user).await?))
}

async fn put_checkups(
    _auth: Authorized,
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    headers: HeaderMap,
    Json(logs): Json<Vec<CheckupLog>>,
) -> Result<Response, ApiError> {
    let revision = parse_revision(&headers)?;
    for log in &logs {
        log.validate()?;
    }
    let outcome = state
        .gateway
        .save_checkup_logs(&user, &dedup_records(logs), revision)
        .await?;
    Ok(saved(outcome, revision))
}

// -- Profile --

async fn get_profile(
    _auth: Authorized,
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    state
        .gateway
        .fetch_profile(&user)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no profile for {user}")))
}

async fn put_profile(
    _auth: Authorized,
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    headers: HeaderMap,
    Json(profile): Json<UserProfile>,
) -> Result<Response, ApiError> {
    let revision = parse_revision(&headers)?;
    if profile.email != user {
        return Err(ApiError::bad_request(
            "profile email does not match the user in the path",
        ));
    }
    let outcome = state.gateway.save_profile(&profile, revision).await?;
    Ok(saved(outcome, revision))
}
