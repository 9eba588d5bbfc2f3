pub mod items;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use tracing::warn;

use crate::{models::HealthReport, AppState};

pub async fn hello() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({ "message": "Hello World" })))
}

/// Always answers 200; a dead store is reported in `status`, and acting on it
/// is left to whatever supervises the process.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.store.health().await;
    if !report.is_up() {
        warn!(error = ?report.error, "Health check reports database down");
    }
    (StatusCode::OK, Json(report))
}
