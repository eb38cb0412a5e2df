//! Bucket size selection
//!
//! Maps a requested range and a point budget onto the fixed set of bucket
//! sizes the engine understands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Engine bucket sizes, in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Minute,
    FifteenMinute,
    ThirtyMinute,
    Hour,
    Day,
}

impl Granularity {
    /// Candidate table, smallest first
    pub const ALL: [Granularity; 5] = [
        Granularity::Minute,
        Granularity::FifteenMinute,
        Granularity::ThirtyMinute,
        Granularity::Hour,
        Granularity::Day,
    ];

    /// Bucket width in milliseconds
    pub fn duration_ms(&self) -> i64 {
        match self {
            Self::Minute => 60 * 1000,
            Self::FifteenMinute => 15 * 60 * 1000,
            Self::ThirtyMinute => 30 * 60 * 1000,
            Self::Hour => 3600 * 1000,
            Self::Day => 24 * 3600 * 1000,
        }
    }

    /// Engine name of this bucket size
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::FifteenMinute => "fifteen_minute",
            Self::ThirtyMinute => "thirty_minute",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }

    /// Number of buckets needed to cover `span_ms`
    pub fn buckets_for(&self, span_ms: i64) -> i64 {
        let width = self.duration_ms();
        (span_ms.max(0) + width - 1) / width
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| {
                format!(
                    "Invalid granularity: {}. Use minute, fifteen_minute, thirty_minute, hour, or day",
                    s
                )
            })
    }
}

/// Pick the smallest bucket size that keeps the range within `max_points`
///
/// Falls back to the largest candidate when none fits.
pub fn compute_granularity(from: DateTime<Utc>, to: DateTime<Utc>, max_points: u32) -> Granularity {
    let span_ms = (to - from).num_milliseconds();
    let max_points = i64::from(max_points);

    Granularity::ALL
        .iter()
        .copied()
        .find(|g| g.buckets_for(span_ms) <= max_points)
        .unwrap_or(Granularity::Day)
}

/// Effective point budget: the rendering budget capped by the target's own budget
pub fn max_points(resolution_budget: u32, target_budget: Option<u32>) -> u32 {
    target_budget.map_or(resolution_budget, |budget| budget.min(resolution_budget))
}
