//! Panel query orchestration
//!
//! A panel holds several independent targets. Each target runs its own
//! pipeline (plan → engine fetch → reshape → first-point correction) and
//! the pipelines run concurrently. The panel result is the concatenation of
//! every target's series in target order. One failing target fails the
//! whole panel; nothing is retried or dropped.

use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::QueryEngine;
use crate::model::{RangeSpec, Series, TargetSpec, TimeError, TimeRange};
use crate::panel::error::{PanelError, PanelResult};
use crate::query::{plan_validated, validate_target, QueryPlan, TemplateSrv, VariableMap};
use crate::reshape::reshape;

/// Panel request from the rendering layer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelRequest {
    pub range: RangeSpec,
    pub resolution_budget: u32,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// Every target's payload, built against one adjusted range
#[derive(Debug, Clone, PartialEq)]
pub struct PanelPlan {
    pub range: TimeRange,
    pub queries: Vec<QueryPlan>,
}

impl PanelPlan {
    /// Adjusted start in epoch milliseconds; the first-point clamp floor
    pub fn from_ms(&self) -> i64 {
        self.range.from_ms()
    }
}

/// Plan every target of a panel without executing anything
///
/// All targets are validated before any payload is built, so a panel with
/// one misconfigured target yields no payloads at all.
pub fn plan_panel(
    request: &PanelRequest,
    now: DateTime<Utc>,
    templates: &dyn TemplateSrv,
) -> PanelResult<PanelPlan> {
    if request.resolution_budget == 0 {
        return Err(PanelError::InvalidBudget);
    }

    let requested = request.range.resolve(now)?;
    let range = requested.adjusted().ok_or_else(|| TimeError::EmptyRange {
        from: requested.from.to_rfc3339(),
        to: requested.to.to_rfc3339(),
    })?;

    let shapes = request
        .targets
        .iter()
        .enumerate()
        .map(|(index, target)| {
            validate_target(target).map_err(|errors| PanelError::InvalidTarget { index, errors })
        })
        .collect::<PanelResult<Vec<_>>>()?;

    let queries = request
        .targets
        .iter()
        .zip(shapes)
        .enumerate()
        .map(|(index, (target, shape))| {
            plan_validated(target, shape, &range, request.resolution_budget, templates)
                .map_err(|e| PanelError::from_query(index, e))
        })
        .collect::<PanelResult<Vec<_>>>()?;

    Ok(PanelPlan { range, queries })
}

/// Clamp each series' first point up to the adjusted start
pub fn correct_first_points(series: &mut [Series], from_ms: i64) {
    for s in series.iter_mut() {
        s.clamp_first_point(from_ms);
    }
}

/// Runs panel queries against an engine
#[derive(Clone)]
pub struct PanelQueryRunner {
    engine: Arc<dyn QueryEngine>,
}

impl PanelQueryRunner {
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<dyn QueryEngine> {
        &self.engine
    }

    /// Plan a panel, resolving relative bounds against the current time
    pub fn plan(&self, request: &PanelRequest) -> PanelResult<PanelPlan> {
        let templates = VariableMap::from(request.variables.clone());
        plan_panel(request, Utc::now(), &templates)
    }

    /// Run a panel query and return the combined series list
    pub async fn run(&self, request: &PanelRequest) -> PanelResult<Vec<Series>> {
        let templates = VariableMap::from(request.variables.clone());
        self.run_at(request, Utc::now(), &templates).await
    }

    /// Run a panel query with an explicit "now" and template source
    pub async fn run_at(
        &self,
        request: &PanelRequest,
        now: DateTime<Utc>,
        templates: &dyn TemplateSrv,
    ) -> PanelResult<Vec<Series>> {
        let plan = plan_panel(request, now, templates)?;
        self.execute(&plan).await
    }

    /// Execute a built plan: fan out one pipeline per target, then fan in
    pub async fn execute(&self, plan: &PanelPlan) -> PanelResult<Vec<Series>> {
        let from_ms = plan.from_ms();

        tracing::info!(
            targets = plan.queries.len(),
            interval = %plan.range.interval(),
            "Running panel query"
        );

        let pipelines = plan
            .queries
            .iter()
            .enumerate()
            .map(|(index, query)| self.run_target(index, query, from_ms));

        let per_target = try_join_all(pipelines).await.map_err(|e| {
            tracing::warn!(error = %e, "Panel query failed");
            e
        })?;

        let series: Vec<Series> = per_target.into_iter().flatten().collect();
        tracing::debug!(series = series.len(), "Panel query complete");

        Ok(series)
    }

    async fn run_target(
        &self,
        index: usize,
        query: &QueryPlan,
        from_ms: i64,
    ) -> PanelResult<Vec<Series>> {
        let body = self
            .engine
            .execute(&query.payload)
            .await
            .map_err(|source| PanelError::Engine { index, source })?;

        let mut series = reshape(&query.payload, &query.metric_names, body)
            .map_err(|source| PanelError::Shape { index, source })?;
        correct_first_points(&mut series, from_ms);

        tracing::debug!(
            target_index = index,
            data_source = %query.payload.common().data_source,
            series = series.len(),
            "Target reshaped"
        );

        Ok(series)
    }
}
