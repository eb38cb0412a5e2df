//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (engine reachable)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Kubernetes readiness probe.
/// Returns 200 only when the query engine answers its health check.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if check_engine_health(&state).await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
///
/// Full health status with component details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let engine_ok = check_engine_health(&state).await;

    Json(HealthResponse {
        status: if engine_ok { "healthy" } else { "degraded" }.to_string(),
        engine: if engine_ok { "ok" } else { "unreachable" }.to_string(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn check_engine_health(state: &AppState) -> bool {
    match state.runner.engine().health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Engine health check failed");
            false
        }
    }
}
