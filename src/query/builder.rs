//! Query payload assembly
//!
//! # Pipeline
//!
//! ```text
//! TargetSpec → validate → granularity → filter tree → QueryPayload
//! ```

use crate::model::{PostAggregatorSpec, TargetSpec, TimeRange};
use crate::query::error::{QueryError, QueryResult};
use crate::query::filter::{build_filter_tree, FilterNode};
use crate::query::granularity::{compute_granularity, max_points, Granularity};
use crate::query::payload::{
    ArithmeticFn, GroupByQuery, LimitSpec, PostAggregation, PostAggregationField, QueryCommon,
    QueryPayload, TimeseriesQuery, TopNQuery,
};
use crate::query::template::TemplateSrv;
use crate::query::validate::{validate_target, QueryShape};

/// A built payload plus the metric names used to reshape its response
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub payload: QueryPayload,
    pub metric_names: Vec<String>,
}

/// Build the engine payload for a target
///
/// `range` must already carry the adjusted start. The target is validated
/// first; nothing is built for an invalid target.
pub fn build_query(
    target: &TargetSpec,
    range: &TimeRange,
    granularity: Granularity,
    filter: Option<FilterNode>,
) -> QueryResult<QueryPayload> {
    let shape = validate_target(target)?;
    build_payload(target, shape, range, granularity, filter)
}

/// Validate a target and build everything needed to query and reshape it
///
/// `range` is the adjusted range; `resolution_budget` comes from the
/// rendering surface.
pub fn plan_target(
    target: &TargetSpec,
    range: &TimeRange,
    resolution_budget: u32,
    templates: &dyn TemplateSrv,
) -> QueryResult<QueryPlan> {
    let shape = validate_target(target)?;
    plan_validated(target, shape, range, resolution_budget, templates)
}

/// Plan a target whose shape came out of [`validate_target`]
pub(crate) fn plan_validated(
    target: &TargetSpec,
    shape: QueryShape<'_>,
    range: &TimeRange,
    resolution_budget: u32,
    templates: &dyn TemplateSrv,
) -> QueryResult<QueryPlan> {
    let granularity = target.granularity.unwrap_or_else(|| {
        compute_granularity(
            range.from,
            range.to,
            max_points(resolution_budget, target.max_data_points),
        )
    });
    let filter = build_filter_tree(&target.filters, templates);
    let payload = build_payload(target, shape, range, granularity, filter)?;

    tracing::debug!(
        table = %target.table,
        query_type = payload.query_type(),
        granularity = %granularity,
        "Built query payload"
    );

    Ok(QueryPlan {
        payload,
        metric_names: target.metric_names(),
    })
}

fn build_payload(
    target: &TargetSpec,
    shape: QueryShape<'_>,
    range: &TimeRange,
    granularity: Granularity,
    filter: Option<FilterNode>,
) -> QueryResult<QueryPayload> {
    let common = QueryCommon {
        data_source: target.table.clone(),
        granularity,
        aggregations: target.aggregators.clone(),
        post_aggregations: target
            .post_aggregators
            .iter()
            .map(post_aggregation)
            .collect::<QueryResult<Vec<_>>>()?,
        intervals: vec![range.interval()],
        filter,
    };

    let payload = match shape {
        QueryShape::Timeseries => QueryPayload::Timeseries(TimeseriesQuery { common }),
        QueryShape::GroupBy {
            dimensions,
            limit,
            order_by,
        } => QueryPayload::GroupBy(GroupByQuery {
            common,
            dimensions: dimensions.to_vec(),
            limit_spec: limit.map(|limit| LimitSpec::descending(limit, order_by)),
        }),
        QueryShape::TopN {
            threshold,
            metric,
            dimension,
        } => QueryPayload::TopN(TopNQuery {
            common,
            threshold,
            dimension: dimension.to_string(),
            metric: metric.to_string(),
        }),
    };

    Ok(payload)
}

fn post_aggregation(spec: &PostAggregatorSpec) -> QueryResult<PostAggregation> {
    match spec {
        PostAggregatorSpec::Arithmetic {
            name,
            function,
            fields,
        } => {
            let function = ArithmeticFn::from_symbol(function)
                .ok_or_else(|| QueryError::InvalidPostAggregator(name.clone()))?;
            Ok(PostAggregation::Arithmetic {
                name: name.clone(),
                function,
                fields: fields.iter().map(|f| PostAggregationField::access(f)).collect(),
            })
        }
        PostAggregatorSpec::Quantile {
            name,
            field,
            probability,
        } => {
            let probability =
                probability.ok_or_else(|| QueryError::InvalidPostAggregator(name.clone()))?;
            Ok(PostAggregation::Quantile {
                name: name.clone(),
                field_name: field.clone(),
                probability,
            })
        }
    }
}
