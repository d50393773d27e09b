//! Application state for API handlers

use jarvis_core::Time;
use jarvis_evolution::EvolutionEngine;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The evolution engine
    pub engine: Arc<EvolutionEngine>,

    /// Server version
    pub version: String,

    /// Server start time
    pub started_at: Time,
}

impl AppState {
    /// Create new application state
    pub fn new(engine: Arc<EvolutionEngine>) -> Self {
        Self {
            engine,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Seconds since the server started
    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.started_at).num_seconds().max(0) as u64
    }
}
