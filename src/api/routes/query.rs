//! Query Routes
//!
//! - POST /api/v1/query - Run a panel query, returning its series
//! - POST /api/v1/query/plan - Build a panel's payloads without running them

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::PlanResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::model::Series;
use crate::panel::PanelRequest;

/// POST /api/v1/query
///
/// Run every target of the panel and return the combined series list.
pub async fn run_query(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PanelRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<Series>>> {
    let Json(req) = body.map_err(|e| ApiError::Validation(e.body_text()))?;

    let timeout = state.request_timeout();
    let series = tokio::time::timeout(timeout, state.runner.run(&req))
        .await
        .map_err(|_| ApiError::Timeout(timeout.as_secs()))??;

    Ok(Json(series))
}

/// POST /api/v1/query/plan
///
/// Validate the panel and return the payloads it would send.
pub async fn plan_query(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PanelRequest>, JsonRejection>,
) -> ApiResult<Json<PlanResponse>> {
    let Json(req) = body.map_err(|e| ApiError::Validation(e.body_text()))?;

    let plan = state.runner.plan(&req)?;
    Ok(Json(plan.into()))
}
