//! Time bounds for panel requests
//!
//! Panel ranges arrive as loosely formatted bounds (`now`, `now-6h`,
//! RFC 3339 instants, epoch milliseconds) and are resolved into an absolute
//! [`TimeRange`] before any query is built.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Offset added to `from` so the engine's `[from, to)` interval keeps the first bucket
pub const FROM_OFFSET_SECS: i64 = 1;

/// Errors raised while resolving time bounds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("Cannot parse time bound: {0}")]
    Unparseable(String),

    #[error("Invalid time unit: {0}")]
    InvalidUnit(String),

    #[error("Invalid time range: from ({from}) must be before to ({to})")]
    EmptyRange { from: String, to: String },
}

/// One side of a requested range, as sent by the rendering layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeBound {
    /// Unix timestamp in milliseconds
    Millis(i64),
    /// `now`, `now-<n><unit>`, or an ISO 8601 timestamp
    Expr(String),
}

impl TimeBound {
    /// Resolve this bound against a fixed "now"
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, TimeError> {
        match self {
            TimeBound::Millis(ms) => DateTime::from_timestamp_millis(*ms)
                .ok_or_else(|| TimeError::Unparseable(ms.to_string())),
            TimeBound::Expr(s) => parse_time_expr(s.trim(), now),
        }
    }
}

impl From<DateTime<Utc>> for TimeBound {
    fn from(dt: DateTime<Utc>) -> Self {
        TimeBound::Expr(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// Requested panel range before resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub from: TimeBound,
    pub to: TimeBound,
}

impl RangeSpec {
    /// Resolve both bounds into an absolute range
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<TimeRange, TimeError> {
        let from = self.from.resolve(now)?;
        let to = self.to.resolve(now)?;
        TimeRange::try_new(from, to).ok_or_else(|| TimeError::EmptyRange {
            from: iso(from),
            to: iso(to),
        })
    }
}

/// Absolute time range (half-open interval: [from, to))
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    /// Create a time range, returning None if `from >= to`
    pub fn try_new(from: DateTime<Utc>, to: DateTime<Utc>) -> Option<Self> {
        if from < to {
            Some(Self { from, to })
        } else {
            None
        }
    }

    /// Shift `from` forward by [`FROM_OFFSET_SECS`]
    ///
    /// Returns None when the shifted start would no longer precede `to`.
    pub fn adjusted(&self) -> Option<Self> {
        let from = self
            .from
            .checked_add_signed(Duration::seconds(FROM_OFFSET_SECS))?;
        Self::try_new(from, self.to)
    }

    pub fn from_ms(&self) -> i64 {
        self.from.timestamp_millis()
    }

    pub fn to_ms(&self) -> i64 {
        self.to.timestamp_millis()
    }

    /// Length of the range in milliseconds
    pub fn span_ms(&self) -> i64 {
        (self.to - self.from).num_milliseconds()
    }

    /// Engine interval string: `<from>/<to>` in ISO 8601 with millisecond precision
    pub fn interval(&self) -> String {
        format!("{}/{}", iso(self.from), iso(self.to))
    }
}

/// Convert an engine timestamp to epoch milliseconds, truncated to whole seconds
pub fn to_epoch_ms(timestamp: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|dt| dt.timestamp() * 1000)
}

fn iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_time_expr(s: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, TimeError> {
    if s.starts_with("now") {
        return parse_relative_time(s, now);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // ISO 8601 without timezone (assume UTC)
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }

    if let Ok(ms) = s.parse::<i64>() {
        return TimeBound::Millis(ms).resolve(now);
    }

    Err(TimeError::Unparseable(s.to_string()))
}

/// Parse relative time like "now-7d"
fn parse_relative_time(s: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, TimeError> {
    if s == "now" {
        return Ok(now);
    }

    let re = regex::Regex::new(r"^now-(\d+)([a-zA-Z]+)$")
        .map_err(|_| TimeError::Unparseable(s.to_string()))?;

    let caps = re
        .captures(s)
        .ok_or_else(|| TimeError::Unparseable(s.to_string()))?;

    let amount: i64 = caps[1]
        .parse()
        .map_err(|_| TimeError::Unparseable(s.to_string()))?;

    let offset = match &caps[2] {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        "w" => Duration::try_weeks(amount),
        unit => return Err(TimeError::InvalidUnit(unit.to_string())),
    };

    // Offsets beyond chrono's representable range are unparseable
    offset
        .and_then(|offset| now.checked_sub_signed(offset))
        .ok_or_else(|| TimeError::Unparseable(s.to_string()))
}
