//! Improvement catalog - turns metric trends into candidate improvements.

use crate::{MetricSnapshot, ProposalError, TrendThresholds};
use jarvis_core::{
    metric_names, EvolutionCycle, Improvement, ImprovementType, MetricSample, Priority, Time,
    TrendPattern, TrendShape,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Candidates proposed for one cycle.
#[derive(Debug, Clone, Default)]
pub struct Proposal {
    /// Candidates, highest priority and most recent trend first
    pub candidates: Vec<Improvement>,
    /// Patterns seen for the first time
    pub new_patterns: Vec<TrendPattern>,
    /// Candidates dropped by the cooldown rule
    pub suppressed: usize,
}

/// A detected trend and the improvement it calls for.
#[derive(Debug, Clone)]
struct Trend {
    pattern: TrendPattern,
    kind: ImprovementType,
    priority: Priority,
    impact: f64,
    description: String,
    observed_at: Time,
}

/// Generates candidate improvements and maintains the learning-pattern index.
pub struct ImprovementCatalog {
    thresholds: TrendThresholds,
    min_samples: usize,
    patterns: BTreeSet<TrendPattern>,
}

impl ImprovementCatalog {
    /// Create a catalog with an empty pattern index.
    pub fn new(thresholds: TrendThresholds, min_samples: usize) -> Self {
        Self {
            thresholds,
            min_samples: min_samples.max(2),
            patterns: BTreeSet::new(),
        }
    }

    /// Add patterns learned in earlier runs.
    pub fn seed(&mut self, patterns: impl IntoIterator<Item = TrendPattern>) {
        self.patterns.extend(patterns);
    }

    /// Remove patterns whose cycle could not be recorded.
    pub fn forget(&mut self, patterns: &[TrendPattern]) {
        for pattern in patterns {
            self.patterns.remove(pattern);
        }
    }

    /// Size of the learning-pattern index.
    pub fn pattern_count(&self) -> u64 {
        self.patterns.len() as u64
    }

    /// Propose candidates from a metric snapshot and the recent history tail.
    ///
    /// A candidate is suppressed when a cycle in `history_tail` already
    /// applied the same type to the same module successfully.
    pub fn propose(
        &mut self,
        snapshot: &MetricSnapshot,
        history_tail: &[EvolutionCycle],
    ) -> Result<Proposal, ProposalError> {
        if let Some(bad) = snapshot.samples().iter().find(|s| !s.value.is_finite()) {
            return Err(ProposalError::NonFiniteMetric {
                module: bad.module.clone(),
                metric_name: bad.metric_name.clone(),
                value: bad.value,
            });
        }

        let mut proposal = Proposal::default();
        let mut best: BTreeMap<(ImprovementType, String), Trend> = BTreeMap::new();

        for ((module, metric_name), samples) in snapshot.series() {
            if samples.len() < self.min_samples {
                continue;
            }
            let Some(trend) = self.detect(module, metric_name, &samples) else {
                continue;
            };

            if self.patterns.insert(trend.pattern.clone()) {
                debug!("Learned new trend pattern {}", trend.pattern);
                proposal.new_patterns.push(trend.pattern.clone());
            }

            // One candidate per change; the more urgent trend wins.
            let key = (trend.kind, trend.pattern.module.clone());
            match best.get(&key) {
                Some(existing)
                    if (existing.priority, existing.observed_at) >= (trend.priority, trend.observed_at) => {}
                _ => {
                    best.insert(key, trend);
                }
            }
        }

        let mut trends: Vec<Trend> = Vec::with_capacity(best.len());
        for trend in best.into_values() {
            let cooling_down = history_tail
                .iter()
                .any(|cycle| cycle.applied_change(trend.kind, &trend.pattern.module));
            if cooling_down {
                debug!(
                    "Suppressing {} for {} during cooldown",
                    trend.kind, trend.pattern.module
                );
                proposal.suppressed += 1;
                continue;
            }
            trends.push(trend);
        }

        trends.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.observed_at.cmp(&a.observed_at))
                .then_with(|| a.pattern.module.cmp(&b.pattern.module))
                .then_with(|| a.kind.cmp(&b.kind))
        });

        proposal.candidates = trends
            .into_iter()
            .map(|t| {
                Improvement::new(t.kind, t.priority, t.pattern.module, t.description).with_impact(t.impact)
            })
            .collect();

        Ok(proposal)
    }

    /// Classify one series by comparing its older half against its newer half.
    fn detect(&self, module: &str, metric_name: &str, samples: &[&MetricSample]) -> Option<Trend> {
        let split = samples.len() / 2;
        let baseline = mean(&samples[..split]);
        let recent = mean(&samples[split..]);
        let observed_at = samples.last()?.timestamp;
        let t = &self.thresholds;

        let (shape, kind, priority, impact, description) = match metric_name {
            metric_names::LATENCY_MS if baseline > 0.0 => {
                if recent - baseline < t.latency_min_delta_ms {
                    return None;
                }
                let rise = recent / baseline - 1.0;
                if rise >= t.latency_regression {
                    (
                        TrendShape::LatencyRegression,
                        ImprovementType::PerformanceEnhancement,
                        Priority::High,
                        rise,
                        format!(
                            "Latency on {} regressed {:.0}% ({:.1}ms -> {:.1}ms); optimise the hot path",
                            module, rise * 100.0, baseline, recent
                        ),
                    )
                } else if rise >= t.latency_creep {
                    (
                        TrendShape::LatencyCreep,
                        ImprovementType::CodeOptimization,
                        Priority::Low,
                        rise,
                        format!(
                            "Latency on {} is creeping up {:.0}%; review recent changes",
                            module, rise * 100.0
                        ),
                    )
                } else {
                    return None;
                }
            }
            metric_names::SUCCESS_RATE => {
                let drop = baseline - recent;
                if drop < t.success_rate_drop {
                    return None;
                }
                let priority = if drop >= t.success_rate_severe_drop {
                    Priority::High
                } else {
                    Priority::Medium
                };
                (
                    TrendShape::SuccessRateDrop,
                    ImprovementType::BugFix,
                    priority,
                    drop,
                    format!(
                        "Success rate on {} fell from {:.1}% to {:.1}%; fix the failing path",
                        module, baseline * 100.0, recent * 100.0
                    ),
                )
            }
            metric_names::RESOURCE_LOAD if recent >= t.resource_pressure => (
                TrendShape::ResourcePressure,
                ImprovementType::CodeOptimization,
                Priority::Medium,
                recent,
                format!(
                    "Resource load on {} averages {:.0}%; reduce allocation and batching overhead",
                    module, recent * 100.0
                ),
            ),
            metric_names::SECURITY_EVENTS
                if recent > 0.0 && recent >= baseline * t.security_spike_factor =>
            {
                let impact = if baseline > 0.0 { 1.0 - baseline / recent } else { 1.0 };
                (
                    TrendShape::SecuritySpike,
                    ImprovementType::SecurityImprovement,
                    Priority::High,
                    impact,
                    format!(
                        "Security events on {} spiked to {:.1} per interval; tighten validation",
                        module, recent
                    ),
                )
            }
            metric_names::UNHANDLED_REQUESTS if recent >= t.capability_gap => (
                TrendShape::CapabilityGap,
                ImprovementType::NewCapability,
                Priority::Medium,
                recent / (recent + 10.0),
                format!(
                    "{} averages {:.1} unhandled requests; add a capability to serve them",
                    module, recent
                ),
            ),
            _ => return None,
        };

        Some(Trend {
            pattern: TrendPattern::new(module, metric_name, shape),
            kind,
            priority,
            impact,
            description,
            observed_at,
        })
    }
}

fn mean(samples: &[&MetricSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.value).sum::<f64>() / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use jarvis_core::{Outcome, Trigger};
    use std::time::Duration;

    fn catalog() -> ImprovementCatalog {
        ImprovementCatalog::new(TrendThresholds::default(), 4)
    }

    fn series(module: &str, metric: &str, values: &[f64], start_secs: i64) -> Vec<MetricSample> {
        let base = chrono::Utc::now() - chrono::Duration::seconds(1000);
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                MetricSample::at(
                    base + chrono::Duration::seconds(start_secs + i as i64),
                    module,
                    metric,
                    *v,
                )
            })
            .collect()
    }

    fn latency_regression(module: &str) -> Vec<MetricSample> {
        series(module, metric_names::LATENCY_MS, &[100.0, 100.0, 100.0, 100.0, 150.0, 160.0, 170.0, 180.0], 0)
    }

    fn applied(improvement: &Improvement, success: bool) -> EvolutionCycle {
        let mut cycle = EvolutionCycle::begin(Trigger::Manual);
        cycle.candidates_identified.push(improvement.clone());
        let outcome = if success {
            Outcome::succeeded(Duration::ZERO)
        } else {
            Outcome::failed(jarvis_core::FailureKind::HandlerFailed, "no", Duration::ZERO)
        };
        cycle.record_outcome(improvement, outcome);
        cycle
    }

    #[test]
    fn test_latency_regression_proposes_high_performance_enhancement() {
        let mut catalog = catalog();
        let snapshot = MetricSnapshot::from_samples(latency_regression("router"));

        let proposal = catalog.propose(&snapshot, &[]).unwrap();
        assert_eq!(proposal.candidates.len(), 1);
        let candidate = &proposal.candidates[0];
        assert_eq!(candidate.kind, ImprovementType::PerformanceEnhancement);
        assert_eq!(candidate.priority, Priority::High);
        assert_eq!(candidate.target_module, "router");
        assert!(candidate.estimated_impact > 0.5);
        assert_eq!(proposal.new_patterns.len(), 1);
        assert_eq!(catalog.pattern_count(), 1);
    }

    #[test]
    fn test_stable_metrics_propose_nothing() {
        let mut catalog = catalog();
        let mut samples = series("router", metric_names::LATENCY_MS, &[100.0; 8], 0);
        samples.extend(series("router", metric_names::SUCCESS_RATE, &[0.99; 8], 0));
        samples.extend(series("router", "queue_depth", &[1.0, 1.0, 50.0, 90.0], 0));

        let proposal = catalog.propose(&MetricSnapshot::from_samples(samples), &[]).unwrap();
        assert!(proposal.candidates.is_empty());
        assert_eq!(catalog.pattern_count(), 0);
    }

    #[test]
    fn test_sub_millisecond_latency_jitter_is_ignored() {
        let mut catalog = catalog();
        let samples = series("http", metric_names::LATENCY_MS, &[0.1, 0.1, 0.1, 0.2, 0.2, 0.3], 0);
        let proposal = catalog.propose(&MetricSnapshot::from_samples(samples), &[]).unwrap();
        assert!(proposal.candidates.is_empty());
        assert_eq!(catalog.pattern_count(), 0);

        // The same ratio on a slow path is a regression.
        let samples = series("http", metric_names::LATENCY_MS, &[100.0, 100.0, 100.0, 200.0, 200.0, 300.0], 0);
        let proposal = catalog.propose(&MetricSnapshot::from_samples(samples), &[]).unwrap();
        assert_eq!(proposal.candidates.len(), 1);
        assert_eq!(proposal.candidates[0].priority, Priority::High);
    }

    #[test]
    fn test_too_few_samples_are_ignored() {
        let mut catalog = catalog();
        let samples = series("router", metric_names::LATENCY_MS, &[100.0, 500.0, 900.0], 0);
        let proposal = catalog.propose(&MetricSnapshot::from_samples(samples), &[]).unwrap();
        assert!(proposal.candidates.is_empty());
    }

    #[test]
    fn test_cooldown_suppresses_recently_applied_change() {
        let mut catalog = catalog();
        let snapshot = MetricSnapshot::from_samples(latency_regression("router"));

        let first = catalog.propose(&snapshot, &[]).unwrap();
        let history = vec![applied(&first.candidates[0], true)];

        for _ in 0..2 {
            let again = catalog.propose(&snapshot, &history).unwrap();
            assert!(again
                .candidates
                .iter()
                .all(|c| !c.same_change(ImprovementType::PerformanceEnhancement, "router")));
            assert_eq!(again.suppressed, 1);
            assert!(again.new_patterns.is_empty());
        }
    }

    #[test]
    fn test_failed_application_does_not_cool_down() {
        let mut catalog = catalog();
        let snapshot = MetricSnapshot::from_samples(latency_regression("router"));
        let first = catalog.propose(&snapshot, &[]).unwrap();
        let history = vec![applied(&first.candidates[0], false)];

        let again = catalog.propose(&snapshot, &history).unwrap();
        assert_eq!(again.candidates.len(), 1);
    }

    #[test]
    fn test_cooldown_is_per_module() {
        let mut catalog = catalog();
        let mut samples = latency_regression("router");
        samples.extend(latency_regression("memory"));
        let snapshot = MetricSnapshot::from_samples(samples);

        let first = catalog.propose(&snapshot, &[]).unwrap();
        let router = first.candidates.iter().find(|c| c.target_module == "router").unwrap();
        let history = vec![applied(router, true)];

        let again = catalog.propose(&snapshot, &history).unwrap();
        assert_eq!(again.candidates.len(), 1);
        assert_eq!(again.candidates[0].target_module, "memory");
    }

    #[test]
    fn test_candidates_ordered_by_priority_then_recency() {
        let mut catalog = catalog();
        let mut samples = Vec::new();
        // medium: resource pressure on cache
        samples.extend(series("cache", metric_names::RESOURCE_LOAD, &[0.9, 0.9, 0.9, 0.95], 0));
        // low: latency creep on memory
        samples.extend(series("memory", metric_names::LATENCY_MS, &[100.0, 100.0, 110.0, 110.0], 0));
        // high, older trend
        samples.extend(series("router", metric_names::SUCCESS_RATE, &[0.99, 0.99, 0.7, 0.7], 0));
        // high, most recent trend
        samples.extend(series("auth", metric_names::SECURITY_EVENTS, &[1.0, 1.0, 5.0, 6.0], 100));

        let proposal = catalog.propose(&MetricSnapshot::from_samples(samples), &[]).unwrap();
        let order: Vec<(&str, Priority)> = proposal
            .candidates
            .iter()
            .map(|c| (c.target_module.as_str(), c.priority))
            .collect();
        assert_eq!(
            order,
            vec![
                ("auth", Priority::High),
                ("router", Priority::High),
                ("cache", Priority::Medium),
                ("memory", Priority::Low),
            ]
        );
        assert_eq!(proposal.candidates[0].kind, ImprovementType::SecurityImprovement);
        assert_eq!(proposal.candidates[1].kind, ImprovementType::BugFix);
    }

    #[test]
    fn test_one_candidate_per_change_keeps_highest_priority() {
        let mut catalog = catalog();
        let mut samples = series("router", metric_names::LATENCY_MS, &[100.0, 100.0, 110.0, 110.0], 0);
        samples.extend(series("router", metric_names::RESOURCE_LOAD, &[0.9, 0.9, 0.9, 0.9], 0));

        let proposal = catalog.propose(&MetricSnapshot::from_samples(samples), &[]).unwrap();
        assert_eq!(proposal.candidates.len(), 1);
        assert_eq!(proposal.candidates[0].kind, ImprovementType::CodeOptimization);
        assert_eq!(proposal.candidates[0].priority, Priority::Medium);
        // both trends are still learned
        assert_eq!(catalog.pattern_count(), 2);
    }

    #[test]
    fn test_patterns_counted_once_and_forgettable() {
        let mut catalog = catalog();
        let snapshot = MetricSnapshot::from_samples(latency_regression("router"));
        let first = catalog.propose(&snapshot, &[]).unwrap();
        let second = catalog.propose(&snapshot, &[]).unwrap();

        assert_eq!(first.new_patterns.len(), 1);
        assert!(second.new_patterns.is_empty());
        assert_eq!(catalog.pattern_count(), 1);

        catalog.forget(&first.new_patterns);
        assert_eq!(catalog.pattern_count(), 0);

        catalog.seed(first.new_patterns);
        assert_eq!(catalog.pattern_count(), 1);
    }

    #[test]
    fn test_non_finite_sample_is_a_proposal_error() {
        let mut catalog = catalog();
        let mut samples = latency_regression("router");
        samples.push(MetricSample::new("router", metric_names::LATENCY_MS, f64::NAN));

        let err = catalog.propose(&MetricSnapshot::from_samples(samples), &[]).unwrap_err();
        assert!(matches!(err, ProposalError::NonFiniteMetric { .. }));
        assert_eq!(catalog.pattern_count(), 0);
    }

    #[test]
    fn test_capability_gap_and_severe_success_drop() {
        let mut catalog = catalog();
        let mut samples = series("automation", metric_names::UNHANDLED_REQUESTS, &[0.0, 1.0, 3.0, 4.0], 0);
        samples.extend(series("copy", metric_names::SUCCESS_RATE, &[0.95, 0.95, 0.88, 0.88], 0));

        let proposal = catalog.propose(&MetricSnapshot::from_samples(samples), &[]).unwrap();
        let gap = proposal.candidates.iter().find(|c| c.target_module == "automation").unwrap();
        assert_eq!(gap.kind, ImprovementType::NewCapability);
        assert_eq!(gap.priority, Priority::Medium);

        let fix = proposal.candidates.iter().find(|c| c.target_module == "copy").unwrap();
        assert_eq!(fix.kind, ImprovementType::BugFix);
        assert_eq!(fix.priority, Priority::Medium);
    }
}
