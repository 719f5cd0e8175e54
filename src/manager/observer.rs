//! Lifecycle observers shipped with the manager.

use tracing::{info, warn};

use crate::unit::{LifecycleEvent, LifecycleObserver};

/// Logs every lifecycle event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl LifecycleObserver for TracingObserver {
    fn on_event(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Start { id, task } => {
                info!(unit_id = %id, task = %task, "unit.start");
            }
            LifecycleEvent::Complete {
                id,
                parent_id,
                summary,
                duration_ms,
            } => {
                info!(unit_id = %id, parent_id = %parent_id, duration_ms, summary = %summary, "unit.complete");
            }
            LifecycleEvent::Error {
                id,
                parent_id,
                error,
                duration_ms,
            } => {
                warn!(unit_id = %id, parent_id = %parent_id, duration_ms, error = %error, "unit.error");
            }
            LifecycleEvent::Aborted { id } => {
                info!(unit_id = %id, "unit.aborted");
            }
        }
    }
}
