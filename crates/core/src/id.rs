//! Unique identifiers for evolution records.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for an Improvement, generated at proposal time.
///
/// ULIDs sort by creation time, so ordering ids orders improvements by
/// when they were proposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImprovementId(Ulid);

impl ImprovementId {
    /// Generate a new ImprovementId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ImprovementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ImprovementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for ImprovementId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Unique identifier for an EvolutionCycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleId(Ulid);

impl CycleId {
    /// Generate a new CycleId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for CycleId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}
