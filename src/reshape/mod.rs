//! Result Reshaping
//!
//! Converts the engine's nested responses into the flat series list the
//! graphing front end plots:
//!
//! - **timeseries**: one series per metric
//! - **groupBy**: one series per group key and metric (`<key>:<metric>`)
//! - **topN**: one series per ranked dimension value
//!
//! Series are accumulated by name in first-seen order, so repeated rows for
//! the same group across buckets collapse into one series.

mod convert;
mod error;

pub use convert::{
    convert_group_by, convert_timeseries, convert_top_n, group_key, reshape, GroupByRow,
    SeriesAccumulator, TimeseriesRow, TopNRow, GROUP_KEY_SEPARATOR, METRIC_SEPARATOR,
};
pub use error::{ShapeError, ShapeResult};
