//! Response → series conversion

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::model::{to_epoch_ms, Series, SeriesPoint};
use crate::query::QueryPayload;
use crate::reshape::error::{ShapeError, ShapeResult};

/// Joins a grouped row's dimension values into its group key
pub const GROUP_KEY_SEPARATOR: &str = "-";

/// Joins a group key and a metric name into a series name
pub const METRIC_SEPARATOR: &str = ":";

/// One bucket of a timeseries response
#[derive(Debug, Clone, Deserialize)]
pub struct TimeseriesRow {
    pub timestamp: String,
    pub result: Map<String, Value>,
}

/// One row of a groupBy response
#[derive(Debug, Clone, Deserialize)]
pub struct GroupByRow {
    pub timestamp: String,
    pub event: Map<String, Value>,
}

/// One bucket of a topN response with its ranked entries
#[derive(Debug, Clone, Deserialize)]
pub struct TopNRow {
    pub timestamp: String,
    pub result: Vec<Map<String, Value>>,
}

/// Ordered map from series name to its growing point list
///
/// Keeps first-seen name order so output does not depend on hash order.
#[derive(Debug, Default)]
pub struct SeriesAccumulator {
    index: HashMap<String, usize>,
    series: Vec<Series>,
}

impl SeriesAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point to the named series, creating it on first sight
    pub fn push(&mut self, name: &str, point: SeriesPoint) {
        match self.index.get(name) {
            Some(&i) => self.series[i].points.push(point),
            None => {
                self.index.insert(name.to_string(), self.series.len());
                let mut series = Series::new(name);
                series.points.push(point);
                self.series.push(series);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn finish(self) -> Vec<Series> {
        self.series
    }
}

/// Reshape a raw engine response according to the payload that produced it
pub fn reshape(
    payload: &QueryPayload,
    metric_names: &[String],
    body: Value,
) -> ShapeResult<Vec<Series>> {
    match payload {
        QueryPayload::Timeseries(_) => {
            let rows: Vec<TimeseriesRow> = parse_rows(payload, body)?;
            convert_timeseries(&rows, metric_names)
        }
        QueryPayload::GroupBy(query) => {
            let rows: Vec<GroupByRow> = parse_rows(payload, body)?;
            convert_group_by(&rows, &query.dimensions, metric_names)
        }
        QueryPayload::TopN(query) => {
            let rows: Vec<TopNRow> = parse_rows(payload, body)?;
            convert_top_n(&rows, &query.dimension, &query.metric)
        }
    }
}

/// One series per metric, one point per bucket, in response order
pub fn convert_timeseries(rows: &[TimeseriesRow], metrics: &[String]) -> ShapeResult<Vec<Series>> {
    let timestamps = rows
        .iter()
        .map(|row| point_time(&row.timestamp))
        .collect::<ShapeResult<Vec<i64>>>()?;

    metrics
        .iter()
        .map(|metric| {
            let points = rows
                .iter()
                .zip(&timestamps)
                .map(|(row, &ts)| {
                    let value = metric_value(&row.result, metric, &row.timestamp)?;
                    Ok(SeriesPoint::new(value, ts))
                })
                .collect::<ShapeResult<Vec<_>>>()?;
            Ok(Series {
                name: metric.clone(),
                points,
            })
        })
        .collect()
}

/// One series per `<group key>:<metric>`, rows merged in encounter order
pub fn convert_group_by(
    rows: &[GroupByRow],
    dimensions: &[String],
    metrics: &[String],
) -> ShapeResult<Vec<Series>> {
    let mut acc = SeriesAccumulator::new();

    for row in rows {
        let ts = point_time(&row.timestamp)?;
        let key = group_key(&row.event, dimensions, &row.timestamp)?;

        for metric in metrics {
            let value = metric_value(&row.event, metric, &row.timestamp)?;
            let name = format!("{}{}{}", key, METRIC_SEPARATOR, metric);
            acc.push(&name, SeriesPoint::new(value, ts));
        }
    }

    Ok(acc.finish())
}

/// One series per ranked dimension value
///
/// A value that drops out of the ranking for a bucket simply has no point
/// there; series lengths are ragged.
pub fn convert_top_n(rows: &[TopNRow], dimension: &str, metric: &str) -> ShapeResult<Vec<Series>> {
    let mut acc = SeriesAccumulator::new();

    for row in rows {
        let ts = point_time(&row.timestamp)?;

        for entry in &row.result {
            let name = dimension_value(entry, dimension, &row.timestamp)?;
            let value = metric_value(entry, metric, &row.timestamp)?;
            acc.push(&name, SeriesPoint::new(value, ts));
        }
    }

    Ok(acc.finish())
}

/// Join a row's values for each group dimension, in configured order
pub fn group_key(
    event: &Map<String, Value>,
    dimensions: &[String],
    timestamp: &str,
) -> ShapeResult<String> {
    let values = dimensions
        .iter()
        .map(|dim| dimension_value(event, dim, timestamp))
        .collect::<ShapeResult<Vec<String>>>()?;
    Ok(values.join(GROUP_KEY_SEPARATOR))
}

fn parse_rows<T>(payload: &QueryPayload, body: Value) -> ShapeResult<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(body).map_err(|source| ShapeError::Body {
        query_type: payload.query_type(),
        source,
    })
}

fn point_time(timestamp: &str) -> ShapeResult<i64> {
    to_epoch_ms(timestamp).ok_or_else(|| ShapeError::InvalidTimestamp(timestamp.to_string()))
}

/// Numeric metric value; JSON null is kept as a gap
fn metric_value(row: &Map<String, Value>, metric: &str, timestamp: &str) -> ShapeResult<Option<f64>> {
    match row.get(metric) {
        None => Err(ShapeError::MissingMetric {
            metric: metric.to_string(),
            timestamp: timestamp.to_string(),
        }),
        Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(other) => Err(ShapeError::InvalidValue {
            field: metric.to_string(),
            timestamp: timestamp.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Dimension value as a display string; the engine reports empty values as null
fn dimension_value(row: &Map<String, Value>, dimension: &str, timestamp: &str) -> ShapeResult<String> {
    match row.get(dimension) {
        None => Err(ShapeError::MissingDimension {
            dimension: dimension.to_string(),
            timestamp: timestamp.to_string(),
        }),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(v.to_string()),
        Some(other) => Err(ShapeError::InvalidValue {
            field: dimension.to_string(),
            timestamp: timestamp.to_string(),
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(series: &[Series]) -> Vec<&str> {
        series.iter().map(|s| s.name.as_str()).collect()
    }

    fn rows<T: for<'de> Deserialize<'de>>(value: Value) -> Vec<T> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_timeseries_conversion() {
        let rows: Vec<TimeseriesRow> = rows(json!([
            {"timestamp": "2020-01-01T00:00:00Z", "result": {"count": 5}},
            {"timestamp": "2020-01-01T00:01:00Z", "result": {"count": 7}}
        ]));

        let series = convert_timeseries(&rows, &["count".to_string()]).unwrap();

        assert_eq!(
            series,
            vec![Series {
                name: "count".to_string(),
                points: vec![
                    SeriesPoint::new(Some(5.0), 1577836800000),
                    SeriesPoint::new(Some(7.0), 1577836860000),
                ],
            }]
        );
    }

    #[test]
    fn test_timeseries_one_series_per_metric() {
        let rows: Vec<TimeseriesRow> = rows(json!([
            {"timestamp": "2020-01-01T00:00:00.000Z", "result": {"edits": 3, "ratio": null}}
        ]));

        let series =
            convert_timeseries(&rows, &["edits".to_string(), "ratio".to_string()]).unwrap();

        assert_eq!(names(&series), vec!["edits", "ratio"]);
        assert_eq!(series[1].points[0].value(), None);
    }

    #[test]
    fn test_timeseries_missing_metric_is_fatal() {
        let rows: Vec<TimeseriesRow> = rows(json!([
            {"timestamp": "2020-01-01T00:00:00Z", "result": {"other": 1}}
        ]));

        let err = convert_timeseries(&rows, &["count".to_string()]).unwrap_err();
        assert!(matches!(err, ShapeError::MissingMetric { .. }));
    }

    #[test]
    fn test_group_by_merges_rows_by_composite_key() {
        let rows: Vec<GroupByRow> = rows(json!([
            {"timestamp": "2020-01-01T00:00:00Z", "event": {"country": "US", "edits": 1, "added": 10}},
            {"timestamp": "2020-01-01T00:00:00Z", "event": {"country": "FR", "edits": 2, "added": 20}},
            {"timestamp": "2020-01-01T00:01:00Z", "event": {"country": "US", "edits": 3, "added": 30}}
        ]));
        let metrics = vec!["edits".to_string(), "added".to_string()];

        let series = convert_group_by(&rows, &["country".to_string()], &metrics).unwrap();

        assert_eq!(
            names(&series),
            vec!["US:edits", "US:added", "FR:edits", "FR:added"]
        );
        assert_eq!(
            series[0].points,
            vec![
                SeriesPoint::new(Some(1.0), 1577836800000),
                SeriesPoint::new(Some(3.0), 1577836860000),
            ]
        );
        assert_eq!(series[2].len(), 1);
    }

    #[test]
    fn test_group_by_multi_dimension_key() {
        let rows: Vec<GroupByRow> = rows(json!([
            {"timestamp": "2020-01-01T00:00:00Z", "event": {"country": "US", "device": "web", "edits": 1}},
            {"timestamp": "2020-01-01T00:00:00Z", "event": {"country": "US", "device": null, "edits": 4}}
        ]));
        let dims = vec!["country".to_string(), "device".to_string()];

        let series = convert_group_by(&rows, &dims, &["edits".to_string()]).unwrap();

        assert_eq!(names(&series), vec!["US-web:edits", "US-:edits"]);
    }

    #[test]
    fn test_group_by_missing_dimension_is_fatal() {
        let rows: Vec<GroupByRow> = rows(json!([
            {"timestamp": "2020-01-01T00:00:00Z", "event": {"edits": 1}}
        ]));

        let err =
            convert_group_by(&rows, &["country".to_string()], &["edits".to_string()]).unwrap_err();
        assert!(matches!(err, ShapeError::MissingDimension { ref dimension, .. } if dimension == "country"));
    }

    #[test]
    fn test_top_n_ragged_series() {
        let rows: Vec<TopNRow> = rows(json!([
            {"timestamp": "2020-01-01T00:00:00Z", "result": [
                {"page": "Main", "edits": 9},
                {"page": "Talk", "edits": 4}
            ]},
            {"timestamp": "2020-01-01T00:01:00Z", "result": [
                {"page": "Main", "edits": 6},
                {"page": "Help", "edits": 5}
            ]}
        ]));

        let series = convert_top_n(&rows, "page", "edits").unwrap();

        assert_eq!(names(&series), vec!["Main", "Talk", "Help"]);
        assert_eq!(series[0].len(), 2);
        assert_eq!(series[1].len(), 1);
        assert_eq!(
            series[1].points,
            vec![SeriesPoint::new(Some(4.0), 1577836800000)]
        );
        assert_eq!(
            series[2].points,
            vec![SeriesPoint::new(Some(5.0), 1577836860000)]
        );
    }

    #[test]
    fn test_invalid_timestamp() {
        let rows: Vec<TopNRow> = rows(json!([
            {"timestamp": "yesterday", "result": []}
        ]));
        assert!(matches!(
            convert_top_n(&rows, "page", "edits"),
            Err(ShapeError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_accumulator_keeps_first_seen_order() {
        let mut acc = SeriesAccumulator::new();
        acc.push("b", SeriesPoint::new(Some(1.0), 1));
        acc.push("a", SeriesPoint::new(Some(2.0), 1));
        acc.push("b", SeriesPoint::new(Some(3.0), 2));

        assert_eq!(acc.len(), 2);
        let series = acc.finish();
        assert_eq!(names(&series), vec!["b", "a"]);
        assert_eq!(series[0].len(), 2);
    }
}
