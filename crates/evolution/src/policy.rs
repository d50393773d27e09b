//! Decision policy - chooses which candidates a cycle applies.

use crate::ProposalError;
use jarvis_core::{Improvement, Priority};
use std::collections::HashSet;

/// Selects candidates by priority, bounding how much one cycle changes.
///
/// - `high`: always selected
/// - `medium`: selected while fewer than `medium_cap` selections exist
/// - `low`: never selected automatically; left in history for review
#[derive(Debug, Clone)]
pub struct DecisionPolicy {
    medium_cap: usize,
}

impl DecisionPolicy {
    /// Create a policy with the given medium cap.
    pub fn new(medium_cap: usize) -> Self {
        Self { medium_cap }
    }

    /// Select candidates to apply this cycle, high priority first.
    pub fn select(&self, candidates: &[Improvement]) -> Result<Vec<Improvement>, ProposalError> {
        let mut seen = HashSet::with_capacity(candidates.len());
        for candidate in candidates {
            if !seen.insert(candidate.id) {
                return Err(ProposalError::DuplicateCandidate(candidate.id));
            }
        }

        let mut selected: Vec<Improvement> = candidates
            .iter()
            .filter(|c| c.priority == Priority::High)
            .cloned()
            .collect();

        for candidate in candidates.iter().filter(|c| c.priority == Priority::Medium) {
            if selected.len() >= self.medium_cap {
                break;
            }
            selected.push(candidate.clone());
        }

        Ok(selected)
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jarvis_core::ImprovementType;

    fn candidate(priority: Priority, module: &str) -> Improvement {
        Improvement::new(ImprovementType::CodeOptimization, priority, module, "candidate")
    }

    #[test]
    fn test_highs_first_then_medium_never_low() {
        let candidates = vec![
            candidate(Priority::Low, "a"),
            candidate(Priority::High, "b"),
            candidate(Priority::Medium, "c"),
            candidate(Priority::High, "d"),
        ];

        let selected = DecisionPolicy::default().select(&candidates).unwrap();
        let modules: Vec<&str> = selected.iter().map(|c| c.target_module.as_str()).collect();
        assert_eq!(modules, vec!["b", "d", "c"]);
        assert!(selected.iter().all(|c| c.priority != Priority::Low));
    }

    #[test]
    fn test_medium_cap_counts_all_selections() {
        let mut candidates: Vec<Improvement> =
            (0..3).map(|i| candidate(Priority::High, &format!("h{}", i))).collect();
        candidates.push(candidate(Priority::Medium, "m"));

        let selected = DecisionPolicy::new(3).select(&candidates).unwrap();
        assert_eq!(selected.len(), 3);
        assert!(selected.iter().all(|c| c.priority == Priority::High));
    }

    #[test]
    fn test_medium_cap_limits_mediums() {
        let candidates: Vec<Improvement> =
            (0..5).map(|i| candidate(Priority::Medium, &format!("m{}", i))).collect();

        let selected = DecisionPolicy::new(2).select(&candidates).unwrap();
        let modules: Vec<&str> = selected.iter().map(|c| c.target_module.as_str()).collect();
        assert_eq!(modules, vec!["m0", "m1"]);
    }

    #[test]
    fn test_high_is_not_capped() {
        let candidates: Vec<Improvement> =
            (0..6).map(|i| candidate(Priority::High, &format!("h{}", i))).collect();
        assert_eq!(DecisionPolicy::new(3).select(&candidates).unwrap().len(), 6);
    }

    #[test]
    fn test_duplicate_candidate_is_rejected() {
        let one = candidate(Priority::High, "a");
        let err = DecisionPolicy::default().select(&[one.clone(), one]).unwrap_err();
        assert!(matches!(err, ProposalError::DuplicateCandidate(_)));
    }

    #[test]
    fn test_selection_is_deterministic() {
        let candidates = vec![
            candidate(Priority::Medium, "a"),
            candidate(Priority::High, "b"),
            candidate(Priority::Medium, "c"),
        ];
        let policy = DecisionPolicy::default();
        let first: Vec<_> = policy.select(&candidates).unwrap().iter().map(|c| c.id).collect();
        let second: Vec<_> = policy.select(&candidates).unwrap().iter().map(|c| c.id).collect();
        assert_eq!(first, second);
    }
}
