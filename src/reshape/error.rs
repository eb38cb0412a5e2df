//! Reshaping error types
//!
//! A response that does not match the expected shape is fatal for its
//! target. Missing fields are never replaced with placeholders, since that
//! would corrupt series identity.

use thiserror::Error;

/// Errors that can occur while reshaping an engine response
#[derive(Error, Debug)]
pub enum ShapeError {
    /// Body is not the row list expected for the query type
    #[error("Unexpected {query_type} response: {source}")]
    Body {
        query_type: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Row timestamp is not an ISO 8601 instant
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Row lacks a metric the query asked for
    #[error("Missing metric '{metric}' in row at {timestamp}")]
    MissingMetric { metric: String, timestamp: String },

    /// Row lacks a dimension the query grouped or ranked on
    #[error("Missing dimension '{dimension}' in row at {timestamp}")]
    MissingDimension { dimension: String, timestamp: String },

    /// Field holds a value of the wrong kind
    #[error("Invalid value for '{field}' at {timestamp}: {value}")]
    InvalidValue {
        field: String,
        timestamp: String,
        value: String,
    },
}

/// Result type for reshaping operations
pub type ShapeResult<T> = Result<T, ShapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShapeError::MissingDimension {
            dimension: "country".to_string(),
            timestamp: "2020-01-01T00:00:00.000Z".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing dimension 'country' in row at 2020-01-01T00:00:00.000Z"
        );
    }
}
