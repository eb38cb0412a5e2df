//! # druid-panel
//!
//! Dashboard panel queries for Druid-compatible columnar analytics engines.
//! A panel request (time range, resolution budget, targets) is turned into
//! one engine query per target, the queries run concurrently, and the raw
//! responses are reshaped into the named series a charting layer plots.
//!
//! ## Modules
//!
//! - [`model`]: Targets, time ranges and series
//! - [`query`]: Validation, granularity, filter trees and payload building
//! - [`reshape`]: Raw engine rows → series
//! - [`engine`]: Query engine seam and HTTP broker client
//! - [`panel`]: Per-panel fan-out/fan-in orchestration
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML + environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use druid_panel::config::EngineConfig;
//! use druid_panel::engine::HttpEngine;
//! use druid_panel::panel::{PanelQueryRunner, PanelRequest};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Arc::new(HttpEngine::new(&EngineConfig::default())?);
//!     let runner = PanelQueryRunner::new(engine);
//!
//!     let request: PanelRequest = serde_json::from_str(r#"{
//!         "range": {"from": "now-6h", "to": "now"},
//!         "resolutionBudget": 800,
//!         "targets": [{
//!             "dataSource": "wikipedia",
//!             "queryType": "timeseries",
//!             "aggregators": [{"type": "count", "name": "edits"}]
//!         }]
//!     }"#)?;
//!
//!     for series in runner.run(&request).await? {
//!         println!("{}: {} points", series.name, series.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod model;
pub mod panel;
pub mod query;
pub mod reshape;

// Re-export top-level types for convenience
pub use model::{
    AggregatorSpec, FilterSpec, PostAggregatorSpec, QueryType, RangeSpec, Series, SeriesPoint,
    TargetSpec, TimeBound, TimeRange,
};

pub use query::{
    build_filter_tree, build_query, compute_granularity, plan_target, validate_target, FilterNode,
    Granularity, QueryError, QueryPayload, QueryPlan, TemplateSrv, ValidationErrors, VariableMap,
};

pub use reshape::{reshape, ShapeError};

pub use engine::{EngineError, HttpEngine, QueryEngine};

pub use panel::{PanelError, PanelPlan, PanelQueryRunner, PanelRequest};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{ApiConfig, Config, ConfigError, EngineConfig, LoggingConfig};
