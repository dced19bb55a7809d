use std::time::SystemTime;

use axum::Json;
use axum::response::IntoResponse;
use serde_json::json;

/// Server start time for uptime calculation, forced at startup
pub(crate) static SERVER_START_TIME: once_cell::sync::Lazy<SystemTime> =
    once_cell::sync::Lazy::new(SystemTime::now);

/// Health check endpoint (liveness)
/// Returns 200 if the server is running
pub async fn health_check() -> impl IntoResponse {
    let uptime = SERVER_START_TIME
        .elapsed()
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(json!({
        "status": "ok",
        "time": chrono::Utc::now().to_rfc3339(),
        "uptime_secs": uptime,
    }))
}
