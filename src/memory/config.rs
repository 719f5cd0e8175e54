//! Memory store limits.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONTEXT_BUDGET: usize = 4000;
pub const DEFAULT_COMPRESSION_THRESHOLD: f64 = 0.92;
pub const DEFAULT_MESSAGE_CEILING: usize = 100;
pub const DEFAULT_RETENTION_WINDOW: usize = 20;

/// When compression runs once a limit has been crossed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMode {
    /// Inside the `append` call that crossed the limit.
    #[default]
    Inline,
    /// At the next explicit `compact_if_needed` call.
    Deferred,
}

impl CompressionMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Some(Self::Inline),
            "deferred" => Some(Self::Deferred),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub context_budget: usize,
    /// Fraction of `context_budget` above which compression triggers.
    pub threshold: f64,
    pub message_ceiling: usize,
    pub retention_window: usize,
    pub compression: CompressionMode,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            context_budget: DEFAULT_CONTEXT_BUDGET,
            threshold: DEFAULT_COMPRESSION_THRESHOLD,
            message_ceiling: DEFAULT_MESSAGE_CEILING,
            retention_window: DEFAULT_RETENTION_WINDOW,
            compression: CompressionMode::Inline,
        }
    }
}

impl MemoryConfig {
    pub fn with_context_budget(mut self, tokens: usize) -> Self {
        self.context_budget = tokens;
        self
    }

    pub fn with_threshold(mut self, fraction: f64) -> Self {
        self.threshold = fraction;
        self
    }

    pub fn with_message_ceiling(mut self, count: usize) -> Self {
        self.message_ceiling = count;
        self
    }

    pub fn with_retention_window(mut self, count: usize) -> Self {
        self.retention_window = count;
        self
    }

    pub fn with_compression(mut self, mode: CompressionMode) -> Self {
        self.compression = mode;
        self
    }

    pub fn token_threshold(&self) -> f64 {
        self.context_budget as f64 * self.threshold
    }
}
