//! Engine query payloads
//!
//! The three request bodies the engine accepts. Field names follow the
//! engine's JSON vocabulary exactly; payloads are immutable once built.

use serde::Serialize;

use crate::model::AggregatorSpec;
use crate::query::filter::FilterNode;
use crate::query::granularity::Granularity;

/// Fields shared by every query shape
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryCommon {
    pub data_source: String,
    pub granularity: Granularity,
    pub aggregations: Vec<AggregatorSpec>,
    pub post_aggregations: Vec<PostAggregation>,
    pub intervals: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterNode>,
}

/// Request body for the engine query endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "queryType")]
pub enum QueryPayload {
    #[serde(rename = "timeseries")]
    Timeseries(TimeseriesQuery),
    #[serde(rename = "groupBy")]
    GroupBy(GroupByQuery),
    #[serde(rename = "topN")]
    TopN(TopNQuery),
}

impl QueryPayload {
    pub fn common(&self) -> &QueryCommon {
        match self {
            QueryPayload::Timeseries(q) => &q.common,
            QueryPayload::GroupBy(q) => &q.common,
            QueryPayload::TopN(q) => &q.common,
        }
    }

    /// Wire name of the query type
    pub fn query_type(&self) -> &'static str {
        match self {
            QueryPayload::Timeseries(_) => "timeseries",
            QueryPayload::GroupBy(_) => "groupBy",
            QueryPayload::TopN(_) => "topN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeseriesQuery {
    #[serde(flatten)]
    pub common: QueryCommon,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupByQuery {
    #[serde(flatten)]
    pub common: QueryCommon,
    pub dimensions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_spec: Option<LimitSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopNQuery {
    #[serde(flatten)]
    pub common: QueryCommon,
    pub threshold: u32,
    pub dimension: String,
    pub metric: String,
}

/// Row limit for grouped queries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitSpec {
    #[serde(rename = "type")]
    pub kind: LimitKind,
    pub limit: u32,
    pub columns: Vec<OrderByColumn>,
}

impl LimitSpec {
    /// Limit rows, ordering by each column descending
    pub fn descending(limit: u32, columns: &[String]) -> Self {
        Self {
            kind: LimitKind::Default,
            limit,
            columns: columns
                .iter()
                .map(|column| OrderByColumn {
                    dimension: column.clone(),
                    direction: Direction::Descending,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitKind {
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderByColumn {
    pub dimension: String,
    pub direction: Direction,
}

/// Sort direction; grouped ordering is always descending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Descending,
}

/// Arithmetic post-aggregator function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArithmeticFn {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

impl ArithmeticFn {
    /// Parse from its symbol
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s.trim() {
            "+" => Some(Self::Add),
            "-" => Some(Self::Subtract),
            "*" => Some(Self::Multiply),
            "/" => Some(Self::Divide),
            _ => None,
        }
    }
}

/// Engine post-aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PostAggregation {
    Arithmetic {
        name: String,
        #[serde(rename = "fn")]
        function: ArithmeticFn,
        fields: Vec<PostAggregationField>,
    },
    Quantile {
        name: String,
        #[serde(rename = "fieldName")]
        field_name: String,
        probability: f64,
    },
}

/// Operand of an arithmetic post-aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PostAggregationField {
    FieldAccess {
        name: String,
        #[serde(rename = "fieldName")]
        field_name: String,
    },
}

impl PostAggregationField {
    pub fn access(field: &str) -> Self {
        PostAggregationField::FieldAccess {
            name: field.to_string(),
            field_name: field.to_string(),
        }
    }
}
