//! Tool contract, registry and builtin tools.
//!
//! Every tool exposes a name, a declarative [`ToolSchema`] and an async
//! `execute`. [`ToolRegistry::invoke`] validates parameters first, so a
//! missing required parameter is reported without running the tool:
//!
//! ```rust
//! # tokio_test::block_on(async {
//! use task_agent::tools::{ToolAccess, ToolContext, ToolRegistry};
//!
//! let registry = ToolRegistry::builtin(&ToolAccess::all());
//! let context = ToolContext::detached(std::env::temp_dir());
//! let result = registry.invoke("Read", serde_json::json!({}), &context).await;
//! assert_eq!(
//!     result.error_message().as_deref(),
//!     Some("missing required parameter: file_path")
//! );
//! # });
//! ```

mod access;
mod bash;
mod context;
mod edit;
mod error;
mod grep;
mod kind;
mod read;
mod registry;
mod result;
mod schema;
mod traits;
mod write;

pub use access::ToolAccess;
pub use bash::{BashInput, BashTool};
pub use context::ToolContext;
pub use edit::{EditInput, EditTool};
pub use error::ToolError;
pub use grep::{GrepInput, GrepTool};
pub use kind::{ToolKind, delegated_task, select_tool, step_params};
pub use read::{ReadInput, ReadTool};
pub use registry::ToolRegistry;
pub use result::ToolResult;
pub use schema::{ParamSpec, ParamType, ToolSchema};
pub use traits::{Tool, ToolDefinition, TypedTool};
pub use write::{WriteInput, WriteTool};
