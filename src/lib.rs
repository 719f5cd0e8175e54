//! # task-agent
//!
//! Execution core for task-running sub-agents.
//!
//! A [`TaskUnit`] takes a free-form task, breaks it into steps with an
//! [`Analyzer`], runs each step through a [`Tool`], and records everything in
//! a tiered [`MemoryStore`]. The [`ExecutionManager`] bounds how many units
//! may be alive and how many run at once, and lets a unit spawn nested units
//! through the builtin `Task` tool.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use task_agent::{ExecutionManager, ManagerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), task_agent::Error> {
//!     let manager = ExecutionManager::new(ManagerConfig::default());
//!     let report = manager
//!         .execute("Read Cargo.toml, then search for 'tokio' in src")
//!         .await?;
//!     println!("{} ({:?})", report.summary, report.state);
//!     Ok(())
//! }
//! ```
//!
//! ## Driving a unit directly
//!
//! ```rust,no_run
//! use task_agent::{TaskUnit, UnitConfig};
//!
//! # async fn example() -> task_agent::Result<()> {
//! let mut unit = TaskUnit::builder("run `cargo --version`")
//!     .config(UnitConfig::default().with_sandbox(false))
//!     .build();
//! let report = unit.execute().await?;
//! let snapshot = unit.memory().export_session();
//! println!("{} steps, {} messages", report.steps.len(), snapshot.short_term.len());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod analyzer;
pub mod config;
pub mod manager;
pub mod memory;
pub mod observability;
pub mod prelude;
pub mod tools;
pub mod unit;

pub use analyzer::{
    AnalysisContext, Analyzer, AnalyzerError, CompletionBackend, Decomposition, ModelAnalyzer,
    ModelSummarizer, RuleBasedAnalyzer, Summarizer, SummaryRequest, summarize_results,
};
pub use config::{
    CompositeConfigProvider, ConfigBuilder, ConfigError, ConfigProvider, ConfigProviderExt,
    EnvConfigProvider, FileConfigProvider, MemoryConfigProvider,
};
pub use manager::{
    ActiveUnit, ExecutionManager, ExecutionManagerBuilder, ManagerConfig, TASK_TOOL_NAME,
    TaskRequest, TaskTool, TracingObserver,
};
pub use memory::{
    CompressedSummary, CompressionMode, ContextStats, MemoryConfig, MemoryStore, MemoryUsage,
    Message, MessageDraft, MessageRole, SessionSnapshot, estimate_tokens,
};
#[cfg(feature = "logging")]
pub use observability::init_tracing;
pub use observability::{ExecutionMetrics, MetricsSnapshot};
pub use tools::{
    ParamType, Tool, ToolAccess, ToolContext, ToolError, ToolKind, ToolRegistry, ToolResult,
    ToolSchema, TypedTool,
};
pub use unit::{
    LifecycleEvent, LifecycleObserver, ParentId, StepRecord, TaskUnit, TaskUnitBuilder,
    UnitConfig, UnitFailure, UnitId, UnitOutcome, UnitReport, UnitState,
};

/// Error type for task-agent operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The manager already holds `max` live units.
    #[error("Capacity exceeded: {active}/{max} units active")]
    CapacityExceeded { active: usize, max: usize },

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// File system operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tool execution failed.
    #[error("Tool execution failed: {0}")]
    Tool(#[from] ToolError),

    /// Step decomposition failed.
    #[error("Analyzer error: {0}")]
    Analyzer(String),

    /// A session snapshot could not be imported.
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// A unit ended in a fatal error.
    #[error(transparent)]
    UnitFailed(Box<UnitFailure>),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration, parsing, or setup errors
    Configuration,
    /// Snapshot import and other stateful operation errors
    Stateful,
    /// Internal errors (IO, JSON, tool and unit failures)
    Internal,
    /// Capacity limits that may clear once running units finish
    ResourceLimit,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) => ErrorCategory::Configuration,
            Error::Snapshot(_) => ErrorCategory::Stateful,
            Error::CapacityExceeded { .. } => ErrorCategory::ResourceLimit,
            Error::Json(_)
            | Error::Io(_)
            | Error::Tool(_)
            | Error::Analyzer(_)
            | Error::UnitFailed(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the same call may succeed later without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::CapacityExceeded { .. })
    }

    /// The failed unit's record, for [`Error::UnitFailed`].
    pub fn unit_failure(&self) -> Option<&UnitFailure> {
        match self {
            Error::UnitFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<UnitFailure> for Error {
    fn from(failure: UnitFailure) -> Self {
        Error::UnitFailed(Box::new(failure))
    }
}

impl From<Box<UnitFailure>> for Error {
    fn from(failure: Box<UnitFailure>) -> Self {
        Error::UnitFailed(failure)
    }
}

impl From<AnalyzerError> for Error {
    fn from(err: AnalyzerError) -> Self {
        Error::Analyzer(err.to_string())
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => Error::Io(e),
            ConfigError::Serialization(e) => Error::Json(e),
            other => Error::Config(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
