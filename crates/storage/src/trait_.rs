//! History storage trait abstraction.

use async_trait::async_trait;
use jarvis_core::EvolutionCycle;

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored record could not be read back
    #[error("Corrupt history at line {line}: {reason}")]
    Corrupt {
        /// 1-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// Another process holds the history for writing
    #[error("History in {} is locked by another process", .0.display())]
    Locked(std::path::PathBuf),

    /// The history was opened read-only
    #[error("History {} is open read-only", .0.display())]
    ReadOnly(std::path::PathBuf),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Append-only log of completed evolution cycles.
///
/// Appends are atomic: concurrent readers observe either the state before
/// or after an append, never a partial record. Existing records are never
/// edited or removed.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Durably append a completed cycle.
    async fn append(&self, cycle: &EvolutionCycle) -> Result<()>;

    /// The most recent `n` cycles, newest first.
    async fn tail(&self, n: usize) -> Result<Vec<EvolutionCycle>>;

    /// Up to `limit` most recent cycles that identified an improvement for
    /// `target_module`, newest first.
    async fn query_by_module(&self, target_module: &str, limit: usize) -> Result<Vec<EvolutionCycle>>;

    /// Number of recorded cycles.
    async fn len(&self) -> Result<usize>;

    /// Every recorded cycle, oldest first.
    async fn load_all(&self) -> Result<Vec<EvolutionCycle>>;
}

/// Newest-first tail over a chronological slice.
pub(crate) fn tail_of(cycles: &[EvolutionCycle], n: usize) -> Vec<EvolutionCycle> {
    cycles.iter().rev().take(n).cloned().collect()
}

/// Newest-first module query over a chronological slice.
pub(crate) fn by_module(cycles: &[EvolutionCycle], target_module: &str, limit: usize) -> Vec<EvolutionCycle> {
    cycles
        .iter()
        .rev()
        .filter(|c| c.touches_module(target_module))
        .take(limit)
        .cloned()
        .collect()
}
