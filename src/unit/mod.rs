//! Task units.
//!
//! A [`TaskUnit`] owns one task, its own [`MemoryStore`](crate::memory::MemoryStore)
//! and a cancellation token. Running it decomposes the task into steps,
//! executes each step through a tool, and summarizes the results.

mod config;
mod events;
mod id;
mod outcome;
mod state;
mod task;

pub use config::{DEFAULT_MAX_DEPTH, DEFAULT_UNIT_CONCURRENCY, DEFAULT_UNIT_TIMEOUT, UnitConfig};
pub use events::{LifecycleEvent, LifecycleObserver};
pub use id::{ParentId, UnitId};
pub use outcome::{StepRecord, UnitFailure, UnitOutcome, UnitReport};
pub use state::UnitState;
pub use task::{TaskUnit, TaskUnitBuilder};
