/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "services": { "identity": true, "board": true, "list": true, "card": true }
/// }
/// ```
///
/// `status` is `degraded` while any backend is not ready; the gateway itself
/// still answers 200.

use crate::{app::AppState, pool::Readiness};
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub services: Readiness,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let services = state.clients.readiness().await;

    Json(HealthResponse {
        status: if services.all_ready() { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        services,
    })
}
