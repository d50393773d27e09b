//! Jarvis core data models.
//!
//! This crate defines the records that flow through the autonomous
//! evolution loop: metric samples, improvements, evolution cycles and the
//! engine status derived from them.

#![warn(missing_docs)]

// Core identities
mod id;

// Observations
mod metric;
mod pattern;

// Improvements and their outcomes
mod improvement;
mod cycle;

// Derived state
mod status;

// Re-exports
pub use id::*;

pub use metric::{metric_names, MetricSample};
pub use pattern::{TrendPattern, TrendShape};
pub use improvement::{Improvement, ImprovementType, ParseEnumError, Priority};
pub use cycle::{CycleError, CycleErrorKind, EvolutionCycle, FailureKind, Outcome, Trigger};
pub use status::{EngineState, EngineStatus};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
