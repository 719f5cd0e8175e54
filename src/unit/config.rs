//! Per-unit configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::memory::MemoryConfig;

pub const DEFAULT_UNIT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_UNIT_CONCURRENCY: usize = 4;
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Limits a unit runs under. Nested units receive a copy of their parent's.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitConfig {
    /// Ceiling for sibling units fanned out on this unit's behalf.
    pub max_concurrency: usize,
    pub timeout: Duration,
    /// Tools refuse paths outside `working_dir` when set.
    pub sandbox: bool,
    /// Deepest nesting level the Task tool may create.
    pub max_depth: usize,
    pub working_dir: PathBuf,
    pub memory: MemoryConfig,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_UNIT_CONCURRENCY,
            timeout: DEFAULT_UNIT_TIMEOUT,
            sandbox: true,
            max_depth: DEFAULT_MAX_DEPTH,
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            memory: MemoryConfig::default(),
        }
    }
}

impl UnitConfig {
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_memory(mut self, memory: MemoryConfig) -> Self {
        self.memory = memory;
        self
    }
}
