//! Target validation
//!
//! Configuration mistakes are caught here, before any payload is built, and
//! reported as a field → message map the dashboard can show next to each
//! input. Nothing is silently defaulted.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::model::{
    AggregatorSpec, FilterSpec, IntSetting, PostAggregatorSpec, QueryType, TargetSpec,
};
use crate::query::payload::ArithmeticFn;

/// Per-field configuration errors for one target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; the first message per field is kept
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|m| m.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Query-type specific settings of a validated target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape<'a> {
    Timeseries,
    GroupBy {
        dimensions: &'a [String],
        limit: Option<u32>,
        order_by: &'a [String],
    },
    TopN {
        threshold: u32,
        metric: &'a str,
        dimension: &'a str,
    },
}

/// Check a target and extract its query shape
pub fn validate_target(target: &TargetSpec) -> Result<QueryShape<'_>, ValidationErrors> {
    let mut errs = ValidationErrors::new();

    if target.table.trim().is_empty() {
        errs.add("table", "You must supply a table name.");
    }

    let shape = match target.query_type {
        QueryType::Timeseries => Some(QueryShape::Timeseries),
        QueryType::GroupBy => validate_group_by(target, &mut errs),
        QueryType::TopN => validate_top_n(target, &mut errs),
    };

    for (index, filter) in target.filters.iter().enumerate() {
        if let Some(message) = validate_filter(filter) {
            errs.add("filters", format!("Filter {}: {}", index + 1, message));
        }
    }

    validate_aggregators(&target.aggregators, &mut errs);

    for post in &target.post_aggregators {
        if let Some(message) = validate_post_aggregator(post) {
            errs.add("postAggregators", message);
        }
    }

    match shape {
        Some(shape) if errs.is_empty() => Ok(shape),
        _ => Err(errs),
    }
}

fn validate_group_by<'a>(target: &'a TargetSpec, errs: &mut ValidationErrors) -> Option<QueryShape<'a>> {
    let dimensions = match target.group_dimensions.as_deref() {
        Some(dims) if !dims.is_empty() && dims.iter().all(|d| !d.trim().is_empty()) => Some(dims),
        _ => {
            errs.add("groupBy", "Must list dimensions to group by.");
            None
        }
    };

    let limit = match positive_int(target.limit.as_ref(), "Limit") {
        Ok(limit) => limit,
        Err(message) => {
            errs.add("limit", message);
            None
        }
    };

    Some(QueryShape::GroupBy {
        dimensions: dimensions?,
        limit,
        order_by: &target.order_by,
    })
}

fn validate_top_n<'a>(target: &'a TargetSpec, errs: &mut ValidationErrors) -> Option<QueryShape<'a>> {
    let threshold = match positive_int(target.threshold.as_ref(), "Threshold") {
        Ok(Some(t)) => Some(t),
        Ok(None) => {
            errs.add("threshold", "Must specify a threshold");
            None
        }
        Err(message) => {
            errs.add("threshold", message);
            None
        }
    };

    let metric = match target.metric.as_deref() {
        Some(m) if !m.trim().is_empty() => Some(m),
        _ => {
            errs.add("metric", "Must specify a metric");
            None
        }
    };

    let dimension = match target.dimension.as_deref() {
        Some(d) if !d.trim().is_empty() => Some(d),
        _ => {
            errs.add("dimension", "Must specify a dimension");
            None
        }
    };

    Some(QueryShape::TopN {
        threshold: threshold?,
        metric: metric?,
        dimension: dimension?,
    })
}

/// Read an optional positive integer setting; blank counts as unset
fn positive_int(setting: Option<&IntSetting>, label: &str) -> Result<Option<u32>, String> {
    let setting = match setting {
        Some(setting) if !setting.is_blank() => setting,
        _ => return Ok(None),
    };

    let value = setting
        .as_integer()
        .ok_or_else(|| format!("{} must be an integer", label))?;

    match u32::try_from(value) {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(format!("{} must be a positive integer", label)),
    }
}

fn validate_filter(filter: &FilterSpec) -> Option<String> {
    match filter {
        FilterSpec::Selector { dimension, .. } if dimension.trim().is_empty() => {
            Some("Must provide dimension name for selector filter.".to_string())
        }
        FilterSpec::Regex { dimension, .. } if dimension.trim().is_empty() => {
            Some("Must provide dimension name for regex filter.".to_string())
        }
        FilterSpec::Regex { pattern, .. } if pattern.is_empty() => {
            Some("Must provide pattern for regex filter.".to_string())
        }
        _ => None,
    }
}

fn validate_aggregators(aggregators: &[AggregatorSpec], errs: &mut ValidationErrors) {
    if aggregators.is_empty() {
        errs.add("aggregators", "You must supply at least one aggregator");
        return;
    }

    let mut seen = HashSet::new();
    for agg in aggregators {
        if agg.name().trim().is_empty() {
            errs.add(
                "aggregators",
                format!("Must provide an output name for {} aggregator.", agg.kind()),
            );
        } else if !seen.insert(agg.name()) {
            errs.add(
                "aggregators",
                format!("Duplicate aggregator output name: {}", agg.name()),
            );
        }

        if let Some(field) = agg.field() {
            if field.trim().is_empty() {
                errs.add(
                    "aggregators",
                    format!("Must provide a metric name for {} aggregator.", agg.kind()),
                );
            }
        }
    }
}

fn validate_post_aggregator(post: &PostAggregatorSpec) -> Option<String> {
    match post {
        PostAggregatorSpec::Arithmetic {
            name,
            function,
            fields,
        } => {
            if name.trim().is_empty() {
                Some("Must provide an output name for arithmetic post aggregator.".to_string())
            } else if function.trim().is_empty() {
                Some("Must provide a function for arithmetic post aggregator.".to_string())
            } else if ArithmeticFn::from_symbol(function).is_none() {
                Some(format!("Invalid arithmetic function: {}", function))
            } else if fields.len() < 2 {
                Some("Must provide at least two fields for arithmetic post aggregator.".to_string())
            } else {
                None
            }
        }
        PostAggregatorSpec::Quantile {
            name,
            field,
            probability,
        } => {
            if name.trim().is_empty() {
                Some("Must provide an output name for quantile post aggregator.".to_string())
            } else if field.trim().is_empty() {
                Some("Must provide an aggregator name for quantile post aggregator.".to_string())
            } else {
                match probability {
                    None => {
                        Some("Must provide a probability for the quantile post aggregator.".to_string())
                    }
                    Some(p) if !(0.0..=1.0).contains(p) => {
                        Some(format!("Quantile probability must be between 0 and 1, got {}", p))
                    }
                    Some(_) => None,
                }
            }
        }
    }
}
