//! Query Construction
//!
//! Turns panel targets into engine query payloads:
//!
//! - **Granularity**: bucket size from range and point budget
//! - **Template**: variable substitution seam
//! - **Filter**: flat filter list → nested filter tree
//! - **Validate**: per-field configuration checks
//! - **Payload**: engine request bodies (timeseries, groupBy, topN)
//! - **Builder**: assembles a payload from the pieces above
//!
//! # Example
//!
//! ```rust,ignore
//! use druid_panel::model::{AggregatorSpec, QueryType, TargetSpec};
//! use druid_panel::query::{plan_target, NoTemplates};
//!
//! let target = TargetSpec::new("wikipedia", QueryType::Timeseries)
//!     .aggregator(AggregatorSpec::count("edits"));
//! let plan = plan_target(&target, &range, 800, &NoTemplates)?;
//! let body = serde_json::to_string(&plan.payload)?;
//! ```

mod builder;
mod error;
mod filter;
mod granularity;
mod payload;
mod template;
mod validate;

pub use builder::{build_query, plan_target, QueryPlan};
pub(crate) use builder::plan_validated;
pub use error::{QueryError, QueryResult};
pub use filter::{build_filter_tree, substitute, translate, FilterNode};
pub use granularity::{compute_granularity, max_points, Granularity};
pub use payload::{
    ArithmeticFn, Direction, GroupByQuery, LimitKind, LimitSpec, OrderByColumn, PostAggregation,
    PostAggregationField, QueryCommon, QueryPayload, TimeseriesQuery, TopNQuery,
};
pub use template::{NoTemplates, TemplateSrv, VariableMap};
pub use validate::{validate_target, QueryShape, ValidationErrors};
