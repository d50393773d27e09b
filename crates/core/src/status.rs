//! Engine status - derived state, always reconstructable from history.

use crate::cycle::EvolutionCycle;
use crate::Time;
use serde::{Deserialize, Serialize};

/// Whether a cycle is currently executing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Waiting for the next trigger
    #[default]
    Idle,
    /// A cycle is in progress
    Running,
}

/// Status of the evolution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Whether scheduled evolution is enabled
    pub evolution_active: bool,

    /// Idle or running
    pub state: EngineState,

    /// Completed cycles recorded in history
    pub total_evolutions: u64,

    /// Distinct trend patterns learned so far
    pub learning_patterns: u64,

    /// Share of attempted applications that succeeded (1.0 when none)
    pub performance_score: f64,

    /// Completion time of the latest cycle
    pub last_evolution: Option<Time>,

    /// Candidates of the latest cycle left for manual review
    pub improvement_suggestions: Vec<String>,

    /// Improvement applications attempted across history
    pub applications_attempted: u64,

    /// Improvement applications that succeeded across history
    pub applications_succeeded: u64,

    /// The latest completed cycle
    pub last_cycle_summary: Option<EvolutionCycle>,
}

impl Default for EngineStatus {
    fn default() -> Self {
        Self {
            evolution_active: false,
            state: EngineState::Idle,
            total_evolutions: 0,
            learning_patterns: 0,
            performance_score: 1.0,
            last_evolution: None,
            improvement_suggestions: Vec::new(),
            applications_attempted: 0,
            applications_succeeded: 0,
            last_cycle_summary: None,
        }
    }
}

impl EngineStatus {
    /// Rebuild status from chronological history (oldest first).
    pub fn rebuild<'a>(history: impl IntoIterator<Item = &'a EvolutionCycle>) -> Self {
        let mut status = Self::default();
        for cycle in history {
            status.absorb(cycle);
        }
        status
    }

    /// Advance the status by one completed, recorded cycle.
    pub fn absorb(&mut self, cycle: &EvolutionCycle) {
        self.total_evolutions += 1;
        self.learning_patterns = cycle.learning_patterns_count;
        self.applications_attempted += cycle.outcomes.len() as u64;
        self.applications_succeeded += cycle.applied_count() as u64;
        self.performance_score = if self.applications_attempted == 0 {
            1.0
        } else {
            self.applications_succeeded as f64 / self.applications_attempted as f64
        };
        self.last_evolution = Some(cycle.completed_at);
        self.improvement_suggestions = cycle.deferred().map(|c| c.description.clone()).collect();
        self.last_cycle_summary = Some(cycle.clone());
    }
}
