//! Query construction error types
//!
//! Defines the errors raised while turning a target into an engine payload.

use thiserror::Error;

use crate::query::validate::ValidationErrors;

/// Errors that can occur while building a query
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Target configuration is incomplete or inconsistent
    #[error("Invalid target: {0}")]
    Validation(#[from] ValidationErrors),

    /// Post-aggregator could not be translated
    #[error("Invalid post aggregator: {0}")]
    InvalidPostAggregator(String),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
