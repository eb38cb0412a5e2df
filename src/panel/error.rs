//! Panel query errors

use thiserror::Error;

use crate::engine::EngineError;
use crate::model::TimeError;
use crate::query::{QueryError, ValidationErrors};
use crate::reshape::ShapeError;

/// Errors that fail a whole panel query
///
/// `index` is the zero-based position of the failing target.
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Invalid time range: {0}")]
    InvalidTimeRange(#[from] TimeError),

    #[error("Resolution budget must be positive")]
    InvalidBudget,

    #[error("Target {index} is misconfigured: {errors}")]
    InvalidTarget {
        index: usize,
        errors: ValidationErrors,
    },

    #[error("Target {index}: {source}")]
    Query {
        index: usize,
        #[source]
        source: QueryError,
    },

    #[error("Target {index}: engine request failed: {source}")]
    Engine {
        index: usize,
        #[source]
        source: EngineError,
    },

    #[error("Target {index}: unexpected response shape: {source}")]
    Shape {
        index: usize,
        #[source]
        source: ShapeError,
    },
}

impl PanelError {
    pub(crate) fn from_query(index: usize, err: QueryError) -> Self {
        match err {
            QueryError::Validation(errors) => PanelError::InvalidTarget { index, errors },
            source => PanelError::Query { index, source },
        }
    }

    /// Index of the failing target, when one target is to blame
    pub fn target_index(&self) -> Option<usize> {
        match self {
            PanelError::InvalidTimeRange(_) | PanelError::InvalidBudget => None,
            PanelError::InvalidTarget { index, .. }
            | PanelError::Query { index, .. }
            | PanelError::Engine { index, .. }
            | PanelError::Shape { index, .. } => Some(*index),
        }
    }
}

pub type PanelResult<T> = Result<T, PanelError>;
