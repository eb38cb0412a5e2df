//! Panel data model
//!
//! - **Targets**: what each panel target asks for
//! - **Time**: requested ranges and engine timestamp conversion
//! - **Series**: the flat output consumed by the graphing front end

mod series;
mod target;
mod time;

pub use series::{Series, SeriesPoint};
pub use target::{
    AggregatorSpec, FilterSpec, IntSetting, PostAggregatorSpec, QueryType, TargetSpec,
};
pub use time::{to_epoch_ms, RangeSpec, TimeBound, TimeError, TimeRange, FROM_OFFSET_SECS};
