use crate::handlers::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Tracks application start time for uptime calculation
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call this on application startup)
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

/// Liveness probe: the process is running.
async fn liveness_check() -> impl IntoResponse {
    Json(json!({
        "status": "up",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": uptime_secs(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Readiness probe: the database answers a ping.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let database = match crate::db::check_connection(&state.db).await {
        Ok(()) => ComponentHealth {
            status: ComponentStatus::Up,
            message: "connected".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(err) => ComponentHealth {
            status: ComponentStatus::Down,
            message: err.response_message(),
            latency_ms: None,
        },
    };

    let healthy = matches!(database.status, ComponentStatus::Up);
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if healthy { "up" } else { "down" },
            "uptime_secs": uptime_secs(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": { "database": database },
        })),
    )
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/live", get(liveness_check))
        .route("/ready", get(readiness_check))
}
