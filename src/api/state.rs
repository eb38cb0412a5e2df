//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ApiConfig;
use crate::engine::QueryEngine;
use crate::panel::PanelQueryRunner;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Runs panel queries against the engine
    pub runner: PanelQueryRunner,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: Arc<dyn QueryEngine>, config: ApiConfig) -> Self {
        Self {
            runner: PanelQueryRunner::new(engine),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Upper bound on one panel query
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }
}
