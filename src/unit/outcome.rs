//! What a unit hands back when it settles.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::{ParentId, UnitId};
use super::state::UnitState;
use crate::memory::MemoryUsage;

/// One executed step: what ran, with which parameters, and how it went.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub step: String,
    /// `None` when no tool could be chosen for the step.
    pub tool: Option<String>,
    pub params: Value,
    pub result: Value,
    pub success: bool,
    pub duration_ms: u64,
}

impl StepRecord {
    pub fn error(&self) -> Option<&str> {
        self.result.get("error").and_then(Value::as_str)
    }
}

/// Result of a unit that completed or was aborted.
///
/// An aborted report carries only the steps that ran before cancellation
/// was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    pub id: UnitId,
    pub parent_id: ParentId,
    pub task: String,
    pub steps: Vec<String>,
    pub results: Vec<StepRecord>,
    pub summary: String,
    pub duration_ms: u64,
    pub memory_usage: MemoryUsage,
    pub state: UnitState,
}

impl UnitReport {
    pub fn is_completed(&self) -> bool {
        self.state == UnitState::Completed
    }

    pub fn is_aborted(&self) -> bool {
        self.state == UnitState::Aborted
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// A unit that failed, or could not be run at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("unit {id} failed: {error}")]
pub struct UnitFailure {
    pub id: UnitId,
    pub parent_id: ParentId,
    pub task: String,
    pub error: String,
    pub duration_ms: u64,
    pub state: UnitState,
}

impl UnitFailure {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

pub type UnitOutcome = std::result::Result<UnitReport, UnitFailure>;
