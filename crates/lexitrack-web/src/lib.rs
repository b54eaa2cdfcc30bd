//! REST server for the Lexitrack persistence gateway.
//!
//! Serves per-user JSON documents (custom tasks, progress, contacts, checkup
//! logs, profiles) from a SQLite gateway. Saves are versioned: a PUT whose
//! `x-revision` is older than the stored document is answered with `409`.

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use lexitrack_core::gateway::SqliteGateway;

pub struct AppState {
    pub gateway: SqliteGateway,
    /// When set, every `/api` route requires `Authorization: Bearer <token>`.
    pub api_token: Option<String>,
}

impl AppState {
    pub fn new(gateway: SqliteGateway, api_token: Option<String>) -> Self {
        Self {
            gateway,
            api_token: api_token.filter(|t| !t.is_empty()),
        }
    }
}

/// The full application: routes plus CORS and request tracing.
pub fn app(state: Arc<AppState>) -> Router {
    routes::router()
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
}
