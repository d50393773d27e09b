//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest time budget given to one improvement application.
pub const MIN_APPLY_TIMEOUT_MS: u64 = 10;

/// Configuration for the evolution engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between scheduled cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Whether the interval scheduler runs at all
    #[serde(default = "default_true")]
    pub auto_evolve: bool,

    /// Number of metric samples retained
    #[serde(default = "default_metric_window")]
    pub metric_window: usize,

    /// Cycles during which a successfully applied change is not re-proposed
    #[serde(default = "default_cooldown_cycles")]
    pub cooldown_cycles: usize,

    /// Maximum selections per cycle before medium candidates are skipped
    #[serde(default = "default_medium_cap")]
    pub medium_cap: usize,

    /// Time budget per improvement application (milliseconds)
    #[serde(default = "default_apply_timeout_ms")]
    pub apply_timeout_ms: u64,

    /// Samples a metric series needs before trends are detected
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Trend detection thresholds
    #[serde(default)]
    pub thresholds: TrendThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            auto_evolve: true,
            metric_window: default_metric_window(),
            cooldown_cycles: default_cooldown_cycles(),
            medium_cap: default_medium_cap(),
            apply_timeout_ms: default_apply_timeout_ms(),
            min_samples: default_min_samples(),
            thresholds: TrendThresholds::default(),
        }
    }
}

impl EngineConfig {
    /// Interval between scheduled cycles (at least one second).
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    /// Time budget per improvement application (at least [`MIN_APPLY_TIMEOUT_MS`]).
    pub fn apply_timeout(&self) -> Duration {
        Duration::from_millis(self.apply_timeout_ms.max(MIN_APPLY_TIMEOUT_MS))
    }
}

/// Thresholds that turn metric movements into trend patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendThresholds {
    /// Relative latency increase treated as a regression
    pub latency_regression: f64,
    /// Relative latency increase treated as creep
    pub latency_creep: f64,
    /// Absolute success-rate drop that warrants a bug fix
    pub success_rate_drop: f64,
    /// Absolute success-rate drop that makes the bug fix high priority
    pub success_rate_severe_drop: f64,
    /// Mean resource load treated as pressure
    pub resource_pressure: f64,
    /// Growth factor of security events treated as a spike
    pub security_spike_factor: f64,
    /// Mean unhandled requests treated as a capability gap
    pub capability_gap: f64,
    /// Smallest absolute latency rise (milliseconds) treated as a trend
    pub latency_min_delta_ms: f64,
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self {
            latency_regression: 0.20,
            latency_creep: 0.05,
            success_rate_drop: 0.05,
            success_rate_severe_drop: 0.15,
            resource_pressure: 0.85,
            security_spike_factor: 2.0,
            capability_gap: 1.0,
            latency_min_delta_ms: 5.0,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    300
}

fn default_metric_window() -> usize {
    1024
}

fn default_cooldown_cycles() -> usize {
    5
}

fn default_medium_cap() -> usize {
    3
}

fn default_apply_timeout_ms() -> u64 {
    30_000
}

fn default_min_samples() -> usize {
    4
}
