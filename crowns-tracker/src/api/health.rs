//! Liveness and store reachability
//!
//! Always answers 200 so the process counts as up; `store` tells whether
//! collections can currently be read, in which case dashboards degrade.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while the store is unreachable
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub store: &'static str,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_ready = state.tracker.store_ready().await;
    Json(HealthResponse {
        status: if store_ready { "ok" } else { "degraded" },
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        store: if store_ready { "reachable" } else { "unreachable" },
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
