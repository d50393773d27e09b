//! In-memory history, for tests and ephemeral runs.

use super::trait_::{by_module, tail_of};
use super::{HistoryStore, Result};
use async_trait::async_trait;
use jarvis_core::EvolutionCycle;
use tokio::sync::RwLock;

/// Volatile history backend.
#[derive(Default)]
pub struct MemoryHistory {
    cycles: RwLock<Vec<EvolutionCycle>>,
}

impl MemoryHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn append(&self, cycle: &EvolutionCycle) -> Result<()> {
        self.cycles.write().await.push(cycle.clone());
        Ok(())
    }

    async fn tail(&self, n: usize) -> Result<Vec<EvolutionCycle>> {
        Ok(tail_of(&self.cycles.read().await, n))
    }

    async fn query_by_module(&self, target_module: &str, limit: usize) -> Result<Vec<EvolutionCycle>> {
        Ok(by_module(&self.cycles.read().await, target_module, limit))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.cycles.read().await.len())
    }

    async fn load_all(&self) -> Result<Vec<EvolutionCycle>> {
        Ok(self.cycles.read().await.clone())
    }
}
