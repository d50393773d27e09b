//! Trend patterns - the unit of learning.

use serde::{Deserialize, Serialize};

/// Shape of a metric trend that can trigger an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendShape {
    /// Latency rose sharply against its baseline
    LatencyRegression,
    /// Latency is drifting upward slowly
    LatencyCreep,
    /// Success rate fell against its baseline
    SuccessRateDrop,
    /// Sustained high resource load
    ResourcePressure,
    /// Security events spiked
    SecuritySpike,
    /// Requests are going unhandled
    CapabilityGap,
}

impl TrendShape {
    /// Wire name of the shape.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendShape::LatencyRegression => "latency_regression",
            TrendShape::LatencyCreep => "latency_creep",
            TrendShape::SuccessRateDrop => "success_rate_drop",
            TrendShape::ResourcePressure => "resource_pressure",
            TrendShape::SecuritySpike => "security_spike",
            TrendShape::CapabilityGap => "capability_gap",
        }
    }
}

/// A distinct trend observed on one metric of one module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrendPattern {
    /// Module the trend was seen on
    pub module: String,
    /// Metric that moved
    pub metric_name: String,
    /// How it moved
    pub shape: TrendShape,
}

impl TrendPattern {
    /// Create a new pattern.
    pub fn new(module: impl Into<String>, metric_name: impl Into<String>, shape: TrendShape) -> Self {
        Self {
            module: module.into(),
            metric_name: metric_name.into(),
            shape,
        }
    }
}

impl std::fmt::Display for TrendPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}:{}", self.module, self.metric_name, self.shape.as_str())
    }
}
