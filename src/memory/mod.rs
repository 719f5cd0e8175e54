//! Per-unit memory.
//!
//! A [`MemoryStore`] keeps recent messages verbatim, folds older ones into
//! [`CompressedSummary`] records once the token budget or message ceiling
//! is crossed, and holds long-lived facts that are never evicted.
//!
//! ```rust
//! use task_agent::memory::{MemoryConfig, MemoryStore, MessageDraft};
//!
//! let mut store = MemoryStore::with_config(MemoryConfig::default().with_message_ceiling(10));
//! for i in 0..11 {
//!     store.append(MessageDraft::user(format!("message {i}")));
//! }
//! assert_eq!(store.medium_term().len(), 1);
//! ```

mod config;
mod message;
mod snapshot;
mod stats;
mod store;
mod summary;
mod tokens;

pub use config::{
    CompressionMode, DEFAULT_COMPRESSION_THRESHOLD, DEFAULT_CONTEXT_BUDGET,
    DEFAULT_MESSAGE_CEILING, DEFAULT_RETENTION_WINDOW, MemoryConfig,
};
pub use message::{
    DEFAULT_MESSAGE_KIND, Message, MessageDraft, MessageId, MessageRole, TASK_KIND,
    TASK_RESULT_KIND, TOOL_RESULT_KIND,
};
pub use snapshot::{SNAPSHOT_VERSION, SessionSnapshot};
pub use stats::{ContextStats, RoleCounts};
pub use store::{MemoryStore, MemoryUsage};
pub use summary::{CompressedSummary, SummaryMetadata, ToolUsage};
pub use tokens::{estimate_tokens, word_count};
