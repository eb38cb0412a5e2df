//! Series output handed to the rendering layer

use serde::{Deserialize, Serialize};

/// `[value, timestampMs]`; a null value is kept as a gap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint(pub Option<f64>, pub i64);

impl SeriesPoint {
    pub fn new(value: Option<f64>, timestamp_ms: i64) -> Self {
        Self(value, timestamp_ms)
    }

    pub fn value(&self) -> Option<f64> {
        self.0
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.1
    }
}

/// One named, time-ordered sequence of points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    #[serde(rename = "target")]
    pub name: String,
    #[serde(rename = "datapoints")]
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Clamp the first point's timestamp up to `from_ms`
    ///
    /// The engine floors bucket starts, so the first bucket can report a
    /// timestamp earlier than the requested start. Later points are untouched.
    pub fn clamp_first_point(&mut self, from_ms: i64) {
        if let Some(first) = self.points.first_mut() {
            if first.1 < from_ms {
                first.1 = from_ms;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_serialization() {
        let series = Series {
            name: "count".to_string(),
            points: vec![SeriesPoint::new(Some(5.0), 1000), SeriesPoint::new(None, 2000)],
        };

        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"target": "count", "datapoints": [[5.0, 1000], [null, 2000]]})
        );
    }

    #[test]
    fn test_clamp_first_point() {
        let mut series = Series {
            name: "count".to_string(),
            points: vec![SeriesPoint::new(Some(1.0), 9_000), SeriesPoint::new(Some(2.0), 9_500)],
        };

        series.clamp_first_point(10_000);
        assert_eq!(series.points[0].timestamp_ms(), 10_000);
        assert_eq!(series.points[1].timestamp_ms(), 9_500);

        series.clamp_first_point(5_000);
        assert_eq!(series.points[0].timestamp_ms(), 10_000);

        let mut empty = Series::new("empty");
        empty.clamp_first_point(10_000);
        assert!(empty.is_empty());
    }
}
