//! What callers hand to the manager.

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::unit::{ParentId, UnitConfig};

/// Description of a unit to create.
#[derive(Debug, Clone, Default)]
pub struct TaskRequest {
    pub task: String,
    pub parent_id: ParentId,
    /// Nesting level; 0 for top-level requests.
    pub depth: usize,
    /// Falls back to the manager's unit config when `None`.
    pub config: Option<UnitConfig>,
    pub context: Map<String, Value>,
    /// Lets nested units share cancellation with their parent.
    pub cancel: Option<CancellationToken>,
}

impl TaskRequest {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: ParentId) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_config(mut self, config: UnitConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl From<&str> for TaskRequest {
    fn from(task: &str) -> Self {
        Self::new(task)
    }
}

impl From<String> for TaskRequest {
    fn from(task: String) -> Self {
        Self::new(task)
    }
}
