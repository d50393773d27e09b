//! Evolution layer - the autonomous improvement loop.
//!
//! ```text
//! Metric snapshot → Catalog → Decision policy → Executor → History → Status
//! ```

#![warn(missing_docs, unused_crate_dependencies)]

mod config;
mod error;
mod metrics;
mod catalog;
mod policy;
mod executor;
mod handlers;
mod engine;
mod scheduler;

pub use config::{EngineConfig, TrendThresholds, MIN_APPLY_TIMEOUT_MS};
pub use error::{EngineError, ProposalError};
pub use metrics::{MetricSnapshot, MetricStore};
pub use catalog::{ImprovementCatalog, Proposal};
pub use policy::DecisionPolicy;
pub use executor::{ApplicationExecutor, HandlerRegistry, ImprovementHandler};
pub use handlers::{JournalEntry, JournalHandler, StrategyAdjustment, StrategyTuner};
pub use engine::{CycleReport, EvolutionEngine};
pub use scheduler::Scheduler;
