//! The evolution engine - runs the improvement loop.

use crate::{
    ApplicationExecutor, DecisionPolicy, EngineConfig, EngineError, HandlerRegistry, ImprovementCatalog,
    MetricSnapshot, MetricStore, ProposalError,
};
use jarvis_core::{
    CycleErrorKind, EngineState, EngineStatus, EvolutionCycle, Improvement, MetricSample, TrendPattern,
    Trigger,
};
use jarvis_storage::HistoryStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

/// Result of one cycle, as returned to a trigger caller.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// The cycle, as recorded (or as it would have been recorded)
    pub cycle: EvolutionCycle,
    /// Number of cycles in history after this one
    pub evolution_log_size: u64,
    /// Size of the learning-pattern index after this cycle
    pub learning_patterns: u64,
}

impl CycleReport {
    /// Whether the cycle succeeded as a whole.
    pub fn success(&self) -> bool {
        self.cycle.success()
    }
}

/// The evolution engine.
///
/// Runs the improvement loop, one cycle at a time:
/// ```text
/// Snapshot metrics → Propose → Select → Apply → Append → Publish status
/// ```
pub struct EvolutionEngine {
    config: EngineConfig,
    metrics: MetricStore,
    history: Arc<dyn HistoryStore>,
    policy: DecisionPolicy,
    executor: ApplicationExecutor,
    // Held for the whole cycle; a failed `try_lock` means a cycle is running.
    catalog: Mutex<ImprovementCatalog>,
    status: watch::Sender<EngineStatus>,
    active: AtomicBool,
    running: AtomicBool,
}

impl EvolutionEngine {
    /// Open an engine over existing history and rebuild its derived state.
    pub async fn open(
        config: EngineConfig,
        history: Arc<dyn HistoryStore>,
        registry: HandlerRegistry,
    ) -> Result<Self, EngineError> {
        let cycles = history.load_all().await?;

        let mut catalog = ImprovementCatalog::new(config.thresholds.clone(), config.min_samples);
        catalog.seed(cycles.iter().flat_map(|c| c.new_patterns.iter().cloned()));

        let mut status = EngineStatus::rebuild(&cycles);
        status.learning_patterns = catalog.pattern_count();
        info!(
            cycles = status.total_evolutions,
            patterns = status.learning_patterns,
            handlers = ?registry.kinds(),
            "Evolution engine opened"
        );

        let (status_tx, _) = watch::channel(status);
        Ok(Self {
            metrics: MetricStore::new(config.metric_window),
            policy: DecisionPolicy::new(config.medium_cap),
            executor: ApplicationExecutor::new(registry, config.apply_timeout()),
            catalog: Mutex::new(catalog),
            status: status_tx,
            active: AtomicBool::new(false),
            running: AtomicBool::new(false),
            history,
            config,
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The metric window fed by producers.
    pub fn metrics(&self) -> &MetricStore {
        &self.metrics
    }

    /// Record one metric sample.
    pub fn record_metric(&self, sample: MetricSample) {
        self.metrics.record(sample);
    }

    /// Run one cycle. Rejects with [`EngineError::Busy`] if one is running.
    ///
    /// The cycle runs on its own task, so dropping the returned future does
    /// not stop it halfway.
    pub async fn run_cycle(self: &Arc<Self>, trigger: Trigger) -> Result<CycleReport, EngineError> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.cycle(trigger).await })
            .await
            .map_err(|e| EngineError::Aborted(e.to_string()))?
    }

    async fn cycle(&self, trigger: Trigger) -> Result<CycleReport, EngineError> {
        let mut catalog = self.catalog.try_lock().map_err(|_| EngineError::Busy)?;
        let _running = RunningFlag::raise(&self.running);

        let mut cycle = EvolutionCycle::begin(trigger);
        info!(cycle_id = %cycle.cycle_id, ?trigger, "Starting evolution cycle");

        // 1. Snapshot metrics
        let snapshot = self.metrics.snapshot();
        debug!(cycle_id = %cycle.cycle_id, samples = snapshot.len(), "Took metric snapshot");

        // 2. Propose and select
        let mut new_patterns = Vec::new();
        match self.propose(&mut catalog, &snapshot, &mut cycle, &mut new_patterns).await {
            Ok(selected) => {
                // 3. Apply, in selection order
                for improvement in &selected {
                    debug!(
                        cycle_id = %cycle.cycle_id,
                        improvement_id = %improvement.id,
                        kind = %improvement.kind,
                        module = %improvement.target_module,
                        "Applying improvement"
                    );
                    let outcome = self.executor.apply(improvement).await;
                    cycle.record_outcome(improvement, outcome);
                }
            }
            Err(e) => {
                warn!(cycle_id = %cycle.cycle_id, error = %e, "Proposal failed");
                cycle.fail(CycleErrorKind::Proposal, e.to_string());
            }
        }
        cycle.finish(catalog.pattern_count(), new_patterns);

        // 4. Record
        if let Err(e) = self.history.append(&cycle).await {
            error!(cycle_id = %cycle.cycle_id, error = %e, "Failed to record evolution cycle");
            catalog.forget(&cycle.new_patterns);
            cycle.learning_patterns_count = catalog.pattern_count();
            cycle.fail(CycleErrorKind::Persistence, e.to_string());
            return Ok(self.report(cycle, catalog.pattern_count()));
        }

        // 5. Publish
        self.status.send_modify(|status| status.absorb(&cycle));
        info!(
            cycle_id = %cycle.cycle_id,
            identified = cycle.candidates_identified.len(),
            applied = cycle.applied_count(),
            success = cycle.success(),
            "Evolution cycle finished"
        );

        Ok(self.report(cycle, catalog.pattern_count()))
    }

    async fn propose(
        &self,
        catalog: &mut ImprovementCatalog,
        snapshot: &MetricSnapshot,
        cycle: &mut EvolutionCycle,
        new_patterns: &mut Vec<TrendPattern>,
    ) -> Result<Vec<Improvement>, ProposalError> {
        let recent = self
            .history
            .tail(self.config.cooldown_cycles)
            .await
            .map_err(ProposalError::HistoryUnavailable)?;

        let proposal = catalog.propose(snapshot, &recent)?;
        debug!(
            cycle_id = %cycle.cycle_id,
            candidates = proposal.candidates.len(),
            suppressed = proposal.suppressed,
            "Proposed candidates"
        );
        cycle.candidates_identified = proposal.candidates;
        *new_patterns = proposal.new_patterns;

        self.policy.select(&cycle.candidates_identified)
    }

    fn report(&self, cycle: EvolutionCycle, learning_patterns: u64) -> CycleReport {
        CycleReport {
            cycle,
            evolution_log_size: self.status.borrow().total_evolutions,
            learning_patterns,
        }
    }

    /// Current status, with live activity flags.
    pub fn status(&self) -> EngineStatus {
        let mut status = self.status.borrow().clone();
        status.evolution_active = self.is_active();
        status.state = if self.running.load(Ordering::SeqCst) {
            EngineState::Running
        } else {
            EngineState::Idle
        };
        status
    }

    /// Watch status as cycles complete.
    ///
    /// Published values carry the history-derived fields only; use
    /// [`EvolutionEngine::status`] for the activity flags.
    pub fn subscribe(&self) -> watch::Receiver<EngineStatus> {
        self.status.subscribe()
    }

    /// Mark scheduled evolution as running or stopped.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Whether scheduled evolution is running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// The most recent `limit` cycles, newest first.
    pub async fn history(&self, limit: usize) -> Result<Vec<EvolutionCycle>, EngineError> {
        Ok(self.history.tail(limit).await?)
    }

    /// The most recent `limit` cycles touching a module, newest first.
    pub async fn history_for_module(
        &self,
        target_module: &str,
        limit: usize,
    ) -> Result<Vec<EvolutionCycle>, EngineError> {
        Ok(self.history.query_by_module(target_module, limit).await?)
    }
}

/// Sets a flag for the lifetime of the guard.
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
