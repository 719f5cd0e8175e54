//! Prelude module for convenient imports.
//!
//! ```rust
//! use task_agent::prelude::*;
//! ```

// Core types
pub use crate::Error;
pub use crate::Result;

// Units
pub use crate::unit::{
    LifecycleEvent, LifecycleObserver, ParentId, TaskUnit, UnitConfig, UnitId, UnitOutcome,
    UnitReport, UnitState,
};

// Manager
pub use crate::manager::{ExecutionManager, ManagerConfig, TaskRequest};

// Memory
pub use crate::memory::{MemoryConfig, MemoryStore, MessageDraft, MessageRole, SessionSnapshot};

// Tools
pub use crate::tools::{ParamType, Tool, ToolContext, ToolRegistry, ToolResult, ToolSchema};

// Analysis
pub use crate::analyzer::{Analyzer, Decomposition, RuleBasedAnalyzer};
