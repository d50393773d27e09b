//! Built-in improvement handlers.

use crate::ImprovementHandler;
use async_trait::async_trait;
use jarvis_core::{Improvement, ImprovementId, ImprovementType, Time};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Smallest change the tuner makes to a parameter.
const MIN_STEP: f32 = 0.05;

/// Modules the tuner keeps parameters for.
pub const MAX_TUNED_MODULES: usize = 1024;

/// Adjustments retained by the tuner, newest kept.
pub const ADJUSTMENT_CAPACITY: usize = 256;

/// Entries retained by a journal, newest kept.
pub const JOURNAL_CAPACITY: usize = 256;

/// Adjustment to a strategy parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyAdjustment {
    /// Module whose strategy changed
    pub module: String,
    /// Parameter name
    pub parameter: String,
    /// New value
    pub value: f32,
    /// Reason for adjustment
    pub reason: String,
}

/// Tunes per-module strategy parameters in a shared table.
///
/// Each improvement type moves one parameter:
///
/// | type | parameter | ceiling |
/// |---|---|---|
/// | `performance_enhancement` | `cache_ratio` | 1.0 |
/// | `bug_fix` | `retry_budget` | 10.0 |
/// | `code_optimization` | `batch_factor` | 10.0 |
/// | `new_capability` | `capability_level` | 10.0 |
/// | `security_improvement` | `auth_strictness` | 1.0 |
///
/// The step is the improvement's estimated impact, never less than 0.05.
/// At most [`MAX_TUNED_MODULES`] modules are tuned; only the last
/// [`ADJUSTMENT_CAPACITY`] adjustments are kept.
#[derive(Debug, Default)]
pub struct StrategyTuner {
    params: RwLock<HashMap<String, HashMap<String, f32>>>,
    adjustments: RwLock<VecDeque<StrategyAdjustment>>,
}

impl StrategyTuner {
    /// Create a tuner with an empty parameter table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameter an improvement type adjusts.
    pub fn parameter_for(kind: ImprovementType) -> &'static str {
        match kind {
            ImprovementType::PerformanceEnhancement => "cache_ratio",
            ImprovementType::BugFix => "retry_budget",
            ImprovementType::CodeOptimization => "batch_factor",
            ImprovementType::NewCapability => "capability_level",
            ImprovementType::SecurityImprovement => "auth_strictness",
        }
    }

    fn ceiling(kind: ImprovementType) -> f32 {
        match kind {
            ImprovementType::PerformanceEnhancement | ImprovementType::SecurityImprovement => 1.0,
            ImprovementType::BugFix | ImprovementType::CodeOptimization | ImprovementType::NewCapability => 10.0,
        }
    }

    /// Current value of a module parameter.
    pub fn parameter(&self, module: &str, parameter: &str) -> Option<f32> {
        let params = self.params.read().unwrap_or_else(PoisonError::into_inner);
        params.get(module).and_then(|p| p.get(parameter)).copied()
    }

    /// All parameters of a module.
    pub fn parameters(&self, module: &str) -> HashMap<String, f32> {
        let params = self.params.read().unwrap_or_else(PoisonError::into_inner);
        params.get(module).cloned().unwrap_or_default()
    }

    /// Retained adjustments, oldest first.
    pub fn adjustments(&self) -> Vec<StrategyAdjustment> {
        let adjustments = self.adjustments.read().unwrap_or_else(PoisonError::into_inner);
        adjustments.iter().cloned().collect()
    }

    /// Number of modules with tuned parameters.
    pub fn module_count(&self) -> usize {
        self.params.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// The adjustment an improvement implies, without applying it.
    pub fn suggest_adjustment(&self, improvement: &Improvement) -> anyhow::Result<StrategyAdjustment> {
        let module = improvement.target_module.trim();
        if module.is_empty() {
            anyhow::bail!("improvement {} has no target module", improvement.id);
        }

        {
            let params = self.params.read().unwrap_or_else(PoisonError::into_inner);
            if !params.contains_key(module) && params.len() >= MAX_TUNED_MODULES {
                anyhow::bail!("parameter table is full ({} modules)", MAX_TUNED_MODULES);
            }
        }

        let parameter = Self::parameter_for(improvement.kind);
        let ceiling = Self::ceiling(improvement.kind);
        let current = self.parameter(module, parameter).unwrap_or(0.0);
        if current >= ceiling {
            anyhow::bail!("{} for {} already at {}", parameter, module, ceiling);
        }

        let step = (improvement.estimated_impact as f32).max(MIN_STEP);
        Ok(StrategyAdjustment {
            module: module.to_string(),
            parameter: parameter.to_string(),
            value: (current + step).min(ceiling),
            reason: improvement.description.clone(),
        })
    }

    /// Apply an adjustment to the parameter table.
    pub fn apply_adjustment(&self, adjustment: &StrategyAdjustment) {
        let mut params = self.params.write().unwrap_or_else(PoisonError::into_inner);
        params
            .entry(adjustment.module.clone())
            .or_default()
            .insert(adjustment.parameter.clone(), adjustment.value);
        drop(params);

        let mut adjustments = self.adjustments.write().unwrap_or_else(PoisonError::into_inner);
        if adjustments.len() == ADJUSTMENT_CAPACITY {
            adjustments.pop_front();
        }
        adjustments.push_back(adjustment.clone());
    }
}

#[async_trait]
impl ImprovementHandler for StrategyTuner {
    fn name(&self) -> &str {
        "strategy_tuner"
    }

    async fn apply(&self, improvement: &Improvement) -> anyhow::Result<()> {
        let adjustment = self.suggest_adjustment(improvement)?;
        tracing::debug!(
            module = %adjustment.module,
            parameter = %adjustment.parameter,
            value = adjustment.value,
            "Adjusting strategy"
        );
        self.apply_adjustment(&adjustment);
        Ok(())
    }
}

/// A record of one applied improvement.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    /// Improvement that was applied
    pub improvement_id: ImprovementId,
    /// Its type
    pub kind: ImprovementType,
    /// Its target
    pub target_module: String,
    /// Its description
    pub description: String,
    /// Handler that carried it out
    pub handler: String,
    /// When it finished
    pub applied_at: Time,
}

/// Wraps another handler and journals every improvement it applies.
///
/// The journal is a ring: once full, the oldest entry is dropped.
pub struct JournalHandler {
    inner: Arc<dyn ImprovementHandler>,
    name: String,
    capacity: usize,
    entries: Mutex<VecDeque<JournalEntry>>,
}

impl JournalHandler {
    /// Journal the applications of `inner`, keeping [`JOURNAL_CAPACITY`] entries.
    pub fn new(inner: Arc<dyn ImprovementHandler>) -> Self {
        Self::with_capacity(inner, JOURNAL_CAPACITY)
    }

    /// Journal the applications of `inner`, keeping `capacity` entries (minimum one).
    pub fn with_capacity(inner: Arc<dyn ImprovementHandler>, capacity: usize) -> Self {
        let name = format!("journal({})", inner.name());
        let capacity = capacity.max(1);
        Self {
            inner,
            name,
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Retained applications, oldest first.
    pub fn entries(&self) -> Vec<JournalEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().cloned().collect()
    }

    /// The most recent application.
    pub fn last(&self) -> Option<JournalEntry> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).back().cloned()
    }

    /// Number of journaled applications.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been journaled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ImprovementHandler for JournalHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, improvement: &Improvement) -> anyhow::Result<()> {
        self.inner.apply(improvement).await?;

        let entry = JournalEntry {
            improvement_id: improvement.id,
            kind: improvement.kind,
            target_module: improvement.target_module.clone(),
            description: improvement.description.clone(),
            handler: self.inner.name().to_string(),
            applied_at: chrono::Utc::now(),
        };
        tracing::info!(
            improvement_id = %entry.improvement_id,
            kind = %entry.kind,
            module = %entry.target_module,
            "Journaled improvement"
        );
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
        Ok(())
    }
}
