//! Data Transfer Objects
//!
//! Response types for the API endpoints. Panel requests are accepted as
//! [`PanelRequest`](crate::panel::PanelRequest) directly and panel results
//! are returned as the bare series list the rendering layer expects.

use serde::Serialize;

use crate::panel::PanelPlan;
use crate::query::QueryPayload;

/// Payloads a panel would send, without executing them
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    /// Adjusted engine interval shared by every target
    pub interval: String,
    /// Adjusted start (ms since epoch); first points are clamped to it
    pub from_ms: i64,
    pub queries: Vec<PlannedQuery>,
}

/// One target's payload and the metric names its response is read with
#[derive(Debug, Serialize)]
pub struct PlannedQuery {
    pub payload: QueryPayload,
    pub metric_names: Vec<String>,
}

impl From<PanelPlan> for PlanResponse {
    fn from(plan: PanelPlan) -> Self {
        Self {
            interval: plan.range.interval(),
            from_ms: plan.from_ms(),
            queries: plan
                .queries
                .into_iter()
                .map(|q| PlannedQuery {
                    payload: q.payload,
                    metric_names: q.metric_names,
                })
                .collect(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy or degraded
    pub status: String,
    /// Engine status: ok or unreachable
    pub engine: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
