//! Per-cycle decision records.

use serde::{Deserialize, Serialize};

use crate::domain::decision::AgentDecision;

/// The set of agent decisions from one simulation cycle.
///
/// Cycle indexes are 0-based, unique, and contiguous within a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleRecord {
    /// 0-based cycle index.
    pub index: u32,

    /// All decisions produced this cycle, valid and invalid.
    pub decisions: Vec<AgentDecision>,

    /// Count of invalid decisions this cycle.
    pub invalid_count: usize,

    /// Whether the invalid fraction exceeded the configured threshold.
    /// Degraded cycles still contribute their valid decisions.
    pub degraded: bool,
}

impl CycleRecord {
    pub fn new(index: u32, decisions: Vec<AgentDecision>, degraded_ratio: f64) -> Self {
        let invalid_count = decisions.iter().filter(|d| !d.valid).count();
        let total = decisions.len();
        let degraded = total > 0 && (invalid_count as f64 / total as f64) > degraded_ratio;
        Self {
            index,
            decisions,
            invalid_count,
            degraded,
        }
    }

    /// Decisions that passed parsing and validation.
    pub fn valid_decisions(&self) -> impl Iterator<Item = &AgentDecision> {
        self.decisions.iter().filter(|d| d.valid)
    }
}
