//! Evolution cycle model - one pass of the evolution loop.

use crate::id::{CycleId, ImprovementId};
use crate::improvement::{Improvement, ImprovementType};
use crate::pattern::TrendPattern;
use crate::Time;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Requested by a caller
    Manual,
    /// Started by the interval scheduler
    Scheduled,
}

/// Why a single improvement application failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No handler is registered for the improvement type
    NoHandler,
    /// The handler exceeded its time budget
    Timeout,
    /// The handler returned an error or panicked
    HandlerFailed,
}

/// Result of applying one improvement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Whether the improvement was applied
    pub success: bool,
    /// Error message on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error category on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    /// Time spent applying (milliseconds)
    pub duration_ms: u64,
}

impl Outcome {
    /// A successful application.
    pub fn succeeded(elapsed: Duration) -> Self {
        Self {
            success: true,
            error: None,
            error_kind: None,
            duration_ms: elapsed_ms(elapsed),
        }
    }

    /// A failed application.
    pub fn failed(kind: FailureKind, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            error_kind: Some(kind),
            duration_ms: elapsed_ms(elapsed),
        }
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Category of a cycle-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleErrorKind {
    /// Catalog or policy failed before anything was applied
    Proposal,
    /// The history log could not record the cycle
    Persistence,
}

/// Cycle-level error tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleError {
    /// Error category
    pub kind: CycleErrorKind,
    /// Error message
    pub message: String,
}

/// One execution of the evolution loop, from metric snapshot to history append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionCycle {
    /// Unique identifier
    pub cycle_id: CycleId,

    /// What started the cycle
    pub trigger: Trigger,

    /// When the cycle started
    pub started_at: Time,

    /// When the cycle finished
    pub completed_at: Time,

    /// Every candidate the catalog proposed, in proposal order
    pub candidates_identified: Vec<Improvement>,

    /// Candidates the policy selected, in application order
    pub candidates_applied: Vec<Improvement>,

    /// One outcome per applied candidate
    pub outcomes: BTreeMap<ImprovementId, Outcome>,

    /// Size of the learning-pattern index after this cycle
    pub learning_patterns_count: u64,

    /// Patterns first observed during this cycle
    #[serde(default)]
    pub new_patterns: Vec<TrendPattern>,

    /// Cycle-level error, if the cycle failed as a whole
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CycleError>,
}

impl EvolutionCycle {
    /// Begin a new cycle now.
    pub fn begin(trigger: Trigger) -> Self {
        let now = chrono::Utc::now();
        Self {
            cycle_id: CycleId::new(),
            trigger,
            started_at: now,
            completed_at: now,
            candidates_identified: Vec::new(),
            candidates_applied: Vec::new(),
            outcomes: BTreeMap::new(),
            learning_patterns_count: 0,
            new_patterns: Vec::new(),
            error: None,
        }
    }

    /// Record the outcome of applying an identified candidate.
    ///
    /// Candidates that were never identified are ignored, keeping
    /// `candidates_applied` a subset of `candidates_identified`.
    pub fn record_outcome(&mut self, improvement: &Improvement, outcome: Outcome) -> bool {
        let identified = self.candidates_identified.iter().any(|c| c.id == improvement.id);
        if !identified || self.outcomes.contains_key(&improvement.id) {
            return false;
        }
        self.candidates_applied.push(improvement.clone());
        self.outcomes.insert(improvement.id, outcome);
        true
    }

    /// Tag the cycle with a cycle-level error.
    pub fn fail(&mut self, kind: CycleErrorKind, message: impl Into<String>) {
        self.error = Some(CycleError {
            kind,
            message: message.into(),
        });
    }

    /// Stamp completion.
    pub fn finish(&mut self, learning_patterns_count: u64, new_patterns: Vec<TrendPattern>) {
        self.completed_at = chrono::Utc::now();
        self.learning_patterns_count = learning_patterns_count;
        self.new_patterns = new_patterns;
    }

    /// Cycle-level success: no cycle error and every application succeeded.
    pub fn success(&self) -> bool {
        self.error.is_none() && self.outcomes.values().all(|o| o.success)
    }

    /// Number of improvements applied successfully.
    pub fn applied_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.success).count()
    }

    /// First applied improvement, if any.
    pub fn primary_improvement(&self) -> Option<&Improvement> {
        self.candidates_applied.first()
    }

    /// Identified candidates that were not applied.
    pub fn deferred(&self) -> impl Iterator<Item = &Improvement> {
        self.candidates_identified
            .iter()
            .filter(|c| !self.outcomes.contains_key(&c.id))
    }

    /// Whether this cycle successfully applied the given type to the module.
    pub fn applied_change(&self, kind: ImprovementType, target_module: &str) -> bool {
        self.candidates_applied.iter().any(|applied| {
            applied.same_change(kind, target_module)
                && self.outcomes.get(&applied.id).is_some_and(|o| o.success)
        })
    }

    /// Whether any identified improvement targets the module.
    pub fn touches_module(&self, target_module: &str) -> bool {
        self.candidates_identified
            .iter()
            .any(|c| c.target_module == target_module)
    }

    /// Check the applied/identified/outcome invariants.
    pub fn is_consistent(&self) -> bool {
        let applied_identified = self
            .candidates_applied
            .iter()
            .all(|a| self.candidates_identified.iter().any(|c| c.id == a.id));
        let keys_match = self.outcomes.len() == self.candidates_applied.len()
            && self
                .candidates_applied
                .iter()
                .all(|a| self.outcomes.contains_key(&a.id));
        applied_identified && keys_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Priority;

    fn candidate(kind: ImprovementType, priority: Priority) -> Improvement {
        Improvement::new(kind, priority, "router", "test candidate")
    }

    #[test]
    fn test_record_outcome_keeps_invariants() {
        let mut cycle = EvolutionCycle::begin(Trigger::Manual);
        let a = candidate(ImprovementType::PerformanceEnhancement, Priority::High);
        let b = candidate(ImprovementType::BugFix, Priority::Low);
        let stranger = candidate(ImprovementType::NewCapability, Priority::High);
        cycle.candidates_identified = vec![a.clone(), b.clone()];

        assert!(cycle.record_outcome(&a, Outcome::succeeded(Duration::from_millis(5))));
        assert!(!cycle.record_outcome(&a, Outcome::succeeded(Duration::ZERO)));
        assert!(!cycle.record_outcome(&stranger, Outcome::succeeded(Duration::ZERO)));

        assert!(cycle.is_consistent());
        assert_eq!(cycle.candidates_applied.len(), 1);
        assert_eq!(cycle.deferred().count(), 1);
        assert_eq!(cycle.deferred().next().unwrap().id, b.id);
    }

    #[test]
    fn test_success_requires_every_outcome() {
        let mut cycle = EvolutionCycle::begin(Trigger::Scheduled);
        let a = candidate(ImprovementType::PerformanceEnhancement, Priority::High);
        let b = candidate(ImprovementType::BugFix, Priority::High);
        cycle.candidates_identified = vec![a.clone(), b.clone()];
        cycle.record_outcome(&a, Outcome::succeeded(Duration::ZERO));
        assert!(cycle.success());

        cycle.record_outcome(&b, Outcome::failed(FailureKind::Timeout, "too slow", Duration::ZERO));
        assert!(!cycle.success());
        assert_eq!(cycle.applied_count(), 1);
        assert!(cycle.applied_change(a.kind, &a.target_module));
        assert!(!cycle.applied_change(b.kind, &b.target_module));
    }

    #[test]
    fn test_cycle_error_marks_failure() {
        let mut cycle = EvolutionCycle::begin(Trigger::Manual);
        cycle.fail(CycleErrorKind::Proposal, "bad metric");
        assert!(!cycle.success());
        assert!(cycle.is_consistent());
    }

    #[test]
    fn test_cycle_json_roundtrip_keeps_outcome_keys() {
        let mut cycle = EvolutionCycle::begin(Trigger::Manual);
        let a = candidate(ImprovementType::CodeOptimization, Priority::Medium);
        cycle.candidates_identified = vec![a.clone()];
        cycle.record_outcome(&a, Outcome::succeeded(Duration::from_millis(12)));
        cycle.finish(2, vec![]);

        let json = serde_json::to_string(&cycle).unwrap();
        let back: EvolutionCycle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cycle);
        assert_eq!(back.outcomes[&a.id].duration_ms, 12);
    }
}
