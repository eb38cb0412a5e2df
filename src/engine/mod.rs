//! Query Engine
//!
//! The analytics engine is an external collaborator: it receives a built
//! payload and answers with raw JSON rows. `HttpEngine` talks to a broker
//! over HTTP; anything else implementing `QueryEngine` (test doubles, a
//! caching layer) can stand in for it.

mod client;

pub use client::HttpEngine;

use async_trait::async_trait;
use serde_json::Value;

use crate::query::QueryPayload;

/// Executes query payloads
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Run one query and return the engine's raw response body
    async fn execute(&self, payload: &QueryPayload) -> Result<Value, EngineError>;

    /// Check if the engine is reachable
    async fn health_check(&self) -> Result<(), EngineError>;
}

/// Errors that can occur when talking to the engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Query engine unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    InvalidBody(String),
}

impl EngineError {
    /// Whether the engine could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, EngineError::Unavailable | EngineError::Timeout)
    }
}
