//! Metric samples - atoms of the performance timeline.

use crate::Time;
use serde::{Deserialize, Serialize};

/// A single performance observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// When it was observed
    pub timestamp: Time,

    /// Module the observation belongs to
    pub module: String,

    /// What was measured (see [`metric_names`])
    pub metric_name: String,

    /// Observed value
    pub value: f64,
}

impl MetricSample {
    /// Create a sample stamped with the current time.
    pub fn new(module: impl Into<String>, metric_name: impl Into<String>, value: f64) -> Self {
        Self::at(chrono::Utc::now(), module, metric_name, value)
    }

    /// Create a sample with an explicit timestamp.
    pub fn at(
        timestamp: Time,
        module: impl Into<String>,
        metric_name: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            timestamp,
            module: module.into(),
            metric_name: metric_name.into(),
            value,
        }
    }
}

/// Well-known metric names understood by the improvement catalog.
pub mod metric_names {
    /// Operation latency in milliseconds (higher is worse)
    pub const LATENCY_MS: &str = "latency_ms";
    /// Fraction of successful operations, 0..1 (higher is better)
    pub const SUCCESS_RATE: &str = "success_rate";
    /// Resource utilisation, 0..1 (higher is worse)
    pub const RESOURCE_LOAD: &str = "resource_load";
    /// Suspicious events per interval (higher is worse)
    pub const SECURITY_EVENTS: &str = "security_events";
    /// Requests no capability could serve (higher is worse)
    pub const UNHANDLED_REQUESTS: &str = "unhandled_requests";
}
