//! Engine error types.

use jarvis_core::ImprovementId;
use jarvis_storage::StorageError;

/// Failure of the catalog or the decision policy.
///
/// Aborts a cycle before anything is applied; the cycle is still recorded.
#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    /// A metric sample carried NaN or an infinite value
    #[error("non-finite value {value} for {module}/{metric_name}")]
    NonFiniteMetric {
        /// Module of the sample
        module: String,
        /// Metric of the sample
        metric_name: String,
        /// Offending value
        value: f64,
    },

    /// The same candidate was offered twice
    #[error("duplicate candidate {0}")]
    DuplicateCandidate(ImprovementId),

    /// Recent history could not be read for the cooldown check
    #[error("history unavailable: {0}")]
    HistoryUnavailable(#[source] StorageError),
}

/// Errors surfaced by the engine to its callers.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A cycle is already in progress
    #[error("an evolution cycle is already running")]
    Busy,

    /// The cycle task panicked before it could report
    #[error("evolution cycle aborted: {0}")]
    Aborted(String),

    /// History could not be read
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
