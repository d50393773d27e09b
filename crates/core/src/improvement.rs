//! Improvement model - discrete changes proposed by the evolution loop.

use crate::id::ImprovementId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of improvement. Closed set; every match over it is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImprovementType {
    /// Make something faster
    PerformanceEnhancement,
    /// Fix a defect behind a falling success rate
    BugFix,
    /// Reduce resource usage or incremental slowdowns
    CodeOptimization,
    /// Serve requests nothing handles today
    NewCapability,
    /// Harden against suspicious activity
    SecurityImprovement,
}

impl ImprovementType {
    /// All improvement types.
    pub const ALL: [ImprovementType; 5] = [
        ImprovementType::PerformanceEnhancement,
        ImprovementType::BugFix,
        ImprovementType::CodeOptimization,
        ImprovementType::NewCapability,
        ImprovementType::SecurityImprovement,
    ];

    /// Wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImprovementType::PerformanceEnhancement => "performance_enhancement",
            ImprovementType::BugFix => "bug_fix",
            ImprovementType::CodeOptimization => "code_optimization",
            ImprovementType::NewCapability => "new_capability",
            ImprovementType::SecurityImprovement => "security_improvement",
        }
    }
}

impl fmt::Display for ImprovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for parsing enums from their wire names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl std::str::FromStr for ImprovementType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ImprovementType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| ParseEnumError {
                kind: "improvement type",
                value: s.to_string(),
            })
    }
}

/// Priority of an improvement. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Never applied automatically
    Low,
    /// Applied while the per-cycle cap allows
    Medium,
    /// Always applied
    High,
}

impl Priority {
    /// Wire name of the priority.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(ParseEnumError {
                kind: "priority",
                value: s.to_string(),
            }),
        }
    }
}

/// A proposed improvement. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    /// Unique identifier
    pub id: ImprovementId,

    /// Kind of improvement
    #[serde(rename = "type")]
    pub kind: ImprovementType,

    /// How urgently it should be applied
    pub priority: Priority,

    /// Human-readable summary
    pub description: String,

    /// Module the improvement targets
    pub target_module: String,

    /// Relative size of the triggering trend, 0..1
    pub estimated_impact: f64,
}

impl Improvement {
    /// Create a new improvement with a fresh id.
    pub fn new(
        kind: ImprovementType,
        priority: Priority,
        target_module: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: ImprovementId::new(),
            kind,
            priority,
            description: description.into(),
            target_module: target_module.into(),
            estimated_impact: 0.0,
        }
    }

    /// Set the estimated impact, clamped to `0..=1`.
    pub fn with_impact(mut self, impact: f64) -> Self {
        self.estimated_impact = if impact.is_finite() { impact.clamp(0.0, 1.0) } else { 0.0 };
        self
    }

    /// Whether another improvement is the same change (type and target).
    pub fn same_change(&self, kind: ImprovementType, target_module: &str) -> bool {
        self.kind == kind && self.target_module == target_module
    }
}
