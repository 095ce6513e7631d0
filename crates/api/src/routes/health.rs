use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use songapi_core::readiness::StoreReadiness;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `"OK"`: the process is up and serving.
    pub status: &'static str,
    pub message: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Current store readiness. Informational only.
    pub store: StoreReadiness,
}

/// GET /health -- liveness. Answers 200 whatever the store is doing.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Song Management API is running!",
        version: env!("CARGO_PKG_VERSION"),
        store: state.store.readiness(),
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
