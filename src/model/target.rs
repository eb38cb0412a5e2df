//! Panel target specifications
//!
//! A [`TargetSpec`] describes one series family on a panel: which table to
//! query, how to aggregate it, and how to split or rank the results. Targets
//! arrive as JSON from the dashboard and are validated before any query is
//! built (see [`crate::query::validate_target`]).

use serde::{Deserialize, Deserializer, Serialize};

use crate::query::Granularity;

/// Query shape requested by a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QueryType {
    #[default]
    #[serde(rename = "timeseries")]
    Timeseries,
    #[serde(rename = "groupBy", alias = "grouped")]
    GroupBy,
    #[serde(rename = "topN")]
    TopN,
}

impl QueryType {
    /// Name used on the engine wire
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Timeseries => "timeseries",
            QueryType::GroupBy => "groupBy",
            QueryType::TopN => "topN",
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single filter as configured on a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterSpec {
    /// Exact match; an empty value matches null or empty
    Selector {
        #[serde(default)]
        dimension: String,
        #[serde(default)]
        value: String,
        #[serde(default, skip_serializing_if = "is_false")]
        negate: bool,
    },
    /// Java-style regular expression match
    Regex {
        #[serde(default)]
        dimension: String,
        #[serde(default)]
        pattern: String,
        #[serde(default, skip_serializing_if = "is_false")]
        negate: bool,
    },
}

impl FilterSpec {
    pub fn selector(dimension: impl Into<String>, value: impl Into<String>) -> Self {
        FilterSpec::Selector {
            dimension: dimension.into(),
            value: value.into(),
            negate: false,
        }
    }

    pub fn regex(dimension: impl Into<String>, pattern: impl Into<String>) -> Self {
        FilterSpec::Regex {
            dimension: dimension.into(),
            pattern: pattern.into(),
            negate: false,
        }
    }

    /// Builder: wrap this filter in a negation
    pub fn negated(mut self) -> Self {
        match &mut self {
            FilterSpec::Selector { negate, .. } | FilterSpec::Regex { negate, .. } => {
                *negate = true
            }
        }
        self
    }

    pub fn dimension(&self) -> &str {
        match self {
            FilterSpec::Selector { dimension, .. } | FilterSpec::Regex { dimension, .. } => {
                dimension
            }
        }
    }

    pub fn is_negated(&self) -> bool {
        match self {
            FilterSpec::Selector { negate, .. } | FilterSpec::Regex { negate, .. } => *negate,
        }
    }
}

/// Per-bucket reducer; serialized as-is into the query payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AggregatorSpec {
    Count {
        #[serde(default)]
        name: String,
    },
    LongSum {
        #[serde(default)]
        name: String,
        #[serde(rename = "fieldName", alias = "field", default)]
        field: String,
    },
    DoubleSum {
        #[serde(default)]
        name: String,
        #[serde(rename = "fieldName", alias = "field", default)]
        field: String,
    },
    HyperUnique {
        #[serde(default)]
        name: String,
        #[serde(rename = "fieldName", alias = "field", default)]
        field: String,
    },
    /// Intermediate histogram; feeds quantile post-aggregators and is never plotted
    ApproxHistogramFold {
        #[serde(default)]
        name: String,
        #[serde(rename = "fieldName", alias = "field", default)]
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resolution: Option<u32>,
        #[serde(rename = "numBuckets", default, skip_serializing_if = "Option::is_none")]
        num_buckets: Option<u32>,
        #[serde(rename = "lowerLimit", default, skip_serializing_if = "Option::is_none")]
        lower_limit: Option<f64>,
        #[serde(rename = "upperLimit", default, skip_serializing_if = "Option::is_none")]
        upper_limit: Option<f64>,
    },
}

impl AggregatorSpec {
    pub fn count(name: impl Into<String>) -> Self {
        AggregatorSpec::Count { name: name.into() }
    }

    pub fn long_sum(name: impl Into<String>, field: impl Into<String>) -> Self {
        AggregatorSpec::LongSum {
            name: name.into(),
            field: field.into(),
        }
    }

    pub fn double_sum(name: impl Into<String>, field: impl Into<String>) -> Self {
        AggregatorSpec::DoubleSum {
            name: name.into(),
            field: field.into(),
        }
    }

    pub fn hyper_unique(name: impl Into<String>, field: impl Into<String>) -> Self {
        AggregatorSpec::HyperUnique {
            name: name.into(),
            field: field.into(),
        }
    }

    pub fn approx_histogram_fold(name: impl Into<String>, field: impl Into<String>) -> Self {
        AggregatorSpec::ApproxHistogramFold {
            name: name.into(),
            field: field.into(),
            resolution: None,
            num_buckets: None,
            lower_limit: None,
            upper_limit: None,
        }
    }

    /// Output name
    pub fn name(&self) -> &str {
        match self {
            AggregatorSpec::Count { name }
            | AggregatorSpec::LongSum { name, .. }
            | AggregatorSpec::DoubleSum { name, .. }
            | AggregatorSpec::HyperUnique { name, .. }
            | AggregatorSpec::ApproxHistogramFold { name, .. } => name,
        }
    }

    /// Source metric column, if this kind reads one
    pub fn field(&self) -> Option<&str> {
        match self {
            AggregatorSpec::Count { .. } => None,
            AggregatorSpec::LongSum { field, .. }
            | AggregatorSpec::DoubleSum { field, .. }
            | AggregatorSpec::HyperUnique { field, .. }
            | AggregatorSpec::ApproxHistogramFold { field, .. } => Some(field),
        }
    }

    /// Wire type name, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            AggregatorSpec::Count { .. } => "count",
            AggregatorSpec::LongSum { .. } => "longSum",
            AggregatorSpec::DoubleSum { .. } => "doubleSum",
            AggregatorSpec::HyperUnique { .. } => "hyperUnique",
            AggregatorSpec::ApproxHistogramFold { .. } => "approxHistogramFold",
        }
    }

    /// Whether the output can be plotted directly
    pub fn is_displayable(&self) -> bool {
        !matches!(self, AggregatorSpec::ApproxHistogramFold { .. })
    }
}

/// Derived value computed from aggregator outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PostAggregatorSpec {
    Arithmetic {
        #[serde(default)]
        name: String,
        /// One of `+`, `-`, `*`, `/`; checked during validation
        #[serde(rename = "fn", default)]
        function: String,
        #[serde(default, deserialize_with = "list_or_csv")]
        fields: Vec<String>,
    },
    Quantile {
        #[serde(default)]
        name: String,
        #[serde(rename = "fieldName", alias = "field", default)]
        field: String,
        #[serde(default)]
        probability: Option<f64>,
    },
}

impl PostAggregatorSpec {
    pub fn arithmetic(name: impl Into<String>, function: &str, fields: &[&str]) -> Self {
        PostAggregatorSpec::Arithmetic {
            name: name.into(),
            function: function.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn quantile(name: impl Into<String>, field: impl Into<String>, probability: f64) -> Self {
        PostAggregatorSpec::Quantile {
            name: name.into(),
            field: field.into(),
            probability: Some(probability),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PostAggregatorSpec::Arithmetic { name, .. }
            | PostAggregatorSpec::Quantile { name, .. } => name,
        }
    }
}

/// One requested series family on a panel
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSpec {
    /// Table (engine data source) to query
    #[serde(default, alias = "dataSource", alias = "datasource")]
    pub table: String,

    #[serde(default)]
    pub query_type: QueryType,

    #[serde(default)]
    pub filters: Vec<FilterSpec>,

    #[serde(default)]
    pub aggregators: Vec<AggregatorSpec>,

    #[serde(default)]
    pub post_aggregators: Vec<PostAggregatorSpec>,

    /// Dimensions to split a grouped query on
    #[serde(default, alias = "groupBy", deserialize_with = "opt_list_or_csv")]
    pub group_dimensions: Option<Vec<String>>,

    /// Row limit for grouped queries
    #[serde(default)]
    pub limit: Option<IntSetting>,

    /// Columns to order limited grouped rows by (always descending)
    #[serde(default, deserialize_with = "list_or_csv")]
    pub order_by: Vec<String>,

    /// Number of ranked values per bucket for top-N queries
    #[serde(default)]
    pub threshold: Option<IntSetting>,

    /// Ranking metric for top-N queries
    #[serde(default)]
    pub metric: Option<String>,

    /// Ranked dimension for top-N queries
    #[serde(default)]
    pub dimension: Option<String>,

    /// Explicit bucket size, bypassing the calculator
    #[serde(default, alias = "customGranularity")]
    pub granularity: Option<Granularity>,

    /// Per-target point budget; unbounded when absent
    #[serde(default)]
    pub max_data_points: Option<u32>,
}

impl TargetSpec {
    /// Start a target for the given table and query type
    pub fn new(table: impl Into<String>, query_type: QueryType) -> Self {
        Self {
            table: table.into(),
            query_type,
            ..Default::default()
        }
    }

    /// Builder: add a filter
    pub fn filter(mut self, filter: FilterSpec) -> Self {
        self.filters.push(filter);
        self
    }

    /// Builder: add an aggregator
    pub fn aggregator(mut self, aggregator: AggregatorSpec) -> Self {
        self.aggregators.push(aggregator);
        self
    }

    /// Builder: add a post-aggregator
    pub fn post_aggregator(mut self, post_aggregator: PostAggregatorSpec) -> Self {
        self.post_aggregators.push(post_aggregator);
        self
    }

    /// Builder: set grouped dimensions
    pub fn group_by(mut self, dimensions: &[&str]) -> Self {
        self.group_dimensions = Some(dimensions.iter().map(|d| d.to_string()).collect());
        self
    }

    /// Builder: limit grouped rows, ordered by the given columns
    pub fn limit(mut self, limit: u32, order_by: &[&str]) -> Self {
        self.limit = Some(limit.into());
        self.order_by = order_by.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Builder: configure top-N ranking
    pub fn top_n(mut self, threshold: u32, metric: &str, dimension: &str) -> Self {
        self.threshold = Some(threshold.into());
        self.metric = Some(metric.to_string());
        self.dimension = Some(dimension.to_string());
        self
    }

    /// Builder: force a bucket size
    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = Some(granularity);
        self
    }

    /// Builder: cap the number of points for this target
    pub fn max_data_points(mut self, points: u32) -> Self {
        self.max_data_points = Some(points);
        self
    }

    /// Names of the plotted metrics
    ///
    /// Displayable aggregator outputs followed by post-aggregator outputs,
    /// first occurrence wins.
    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let candidates = self
            .aggregators
            .iter()
            .filter(|agg| agg.is_displayable())
            .map(|agg| agg.name())
            .chain(self.post_aggregators.iter().map(|post| post.name()));

        for name in candidates {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }
}

/// Integer setting as typed into the dashboard: a JSON number or its text
///
/// Kept raw so validation can report a bad value against its field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IntSetting {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl IntSetting {
    /// Integer value, if the setting holds a whole number
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            IntSetting::Integer(n) => Some(*n),
            IntSetting::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Some(*f as i64)
            }
            IntSetting::Float(_) => None,
            IntSetting::Text(s) => s.trim().parse().ok(),
        }
    }

    /// An empty text box counts as unset
    pub fn is_blank(&self) -> bool {
        matches!(self, IntSetting::Text(s) if s.trim().is_empty())
    }
}

impl From<u32> for IntSetting {
    fn from(value: u32) -> Self {
        IntSetting::Integer(i64::from(value))
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Accepts `["a", "b"]` or the dashboard's `"a, b"` form
#[derive(Deserialize)]
#[serde(untagged)]
enum ListOrCsv {
    List(Vec<String>),
    Csv(String),
}

impl ListOrCsv {
    fn into_vec(self) -> Vec<String> {
        match self {
            ListOrCsv::List(items) => items,
            ListOrCsv::Csv(s) => s
                .split(',')
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .map(|item| item.to_string())
                .collect(),
        }
    }
}

fn list_or_csv<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ListOrCsv>::deserialize(deserializer)?
        .map(ListOrCsv::into_vec)
        .unwrap_or_default())
}

fn opt_list_or_csv<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ListOrCsv>::deserialize(deserializer)?.map(ListOrCsv::into_vec))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_excludes_histograms_and_dedups() {
        let target = TargetSpec::new("events", QueryType::Timeseries)
            .aggregator(AggregatorSpec::count("rows"))
            .aggregator(AggregatorSpec::approx_histogram_fold("latency_hist", "latency"))
            .aggregator(AggregatorSpec::long_sum("bytes", "bytes"))
            .post_aggregator(PostAggregatorSpec::quantile("p99", "latency_hist", 0.99))
            .post_aggregator(PostAggregatorSpec::arithmetic("bytes", "+", &["bytes", "rows"]));

        assert_eq!(target.metric_names(), vec!["rows", "bytes", "p99"]);
    }

    #[test]
    fn test_deserialize_target() {
        let json = r#"{
            "datasource": "wikipedia",
            "queryType": "groupBy",
            "groupBy": "country, city",
            "filters": [
                {"type": "selector", "dimension": "page", "value": "Main", "negate": true},
                {"type": "regex", "dimension": "user", "pattern": "^bot"}
            ],
            "aggregators": [
                {"type": "count", "name": "edits"},
                {"type": "longSum", "name": "added", "fieldName": "added"}
            ],
            "postAggregators": [
                {"type": "arithmetic", "name": "avg_added", "fn": "/", "fields": "added,edits"}
            ],
            "customGranularity": "fifteen_minute"
        }"#;

        let target: TargetSpec = serde_json::from_str(json).unwrap();
        assert_eq!(target.table, "wikipedia");
        assert_eq!(target.query_type, QueryType::GroupBy);
        assert_eq!(
            target.group_dimensions,
            Some(vec!["country".to_string(), "city".to_string()])
        );
        assert!(target.filters[0].is_negated());
        assert_eq!(target.filters[1].dimension(), "user");
        assert_eq!(target.aggregators[1].field(), Some("added"));
        assert_eq!(
            target.post_aggregators[0],
            PostAggregatorSpec::arithmetic("avg_added", "/", &["added", "edits"])
        );
        assert_eq!(target.granularity, Some(Granularity::FifteenMinute));
    }

    #[test]
    fn test_query_type_defaults_to_timeseries() {
        let target: TargetSpec = serde_json::from_str(r#"{"table": "t"}"#).unwrap();
        assert_eq!(target.query_type, QueryType::Timeseries);
        assert!(target.group_dimensions.is_none());
    }

    #[test]
    fn test_int_settings_accept_numbers_and_text() {
        let target: TargetSpec = serde_json::from_str(
            r#"{"table": "t", "queryType": "topN", "threshold": "10", "limit": 25}"#,
        )
        .unwrap();
        assert_eq!(target.threshold, Some(IntSetting::Text("10".to_string())));
        assert_eq!(target.threshold.as_ref().and_then(IntSetting::as_integer), Some(10));
        assert_eq!(target.limit.as_ref().and_then(IntSetting::as_integer), Some(25));

        let target: TargetSpec =
            serde_json::from_str(r#"{"table": "t", "threshold": "abc"}"#).unwrap();
        assert_eq!(target.threshold.as_ref().and_then(IntSetting::as_integer), None);

        assert_eq!(IntSetting::Float(5.0).as_integer(), Some(5));
        assert_eq!(IntSetting::Float(5.5).as_integer(), None);
        assert!(IntSetting::Text("  ".to_string()).is_blank());
    }

    #[test]
    fn test_aggregator_serializes_field_name() {
        let json = serde_json::to_value(AggregatorSpec::double_sum("total", "price")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "doubleSum", "name": "total", "fieldName": "price"})
        );

        let json = serde_json::to_value(AggregatorSpec::count("rows")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "count", "name": "rows"}));
    }
}
