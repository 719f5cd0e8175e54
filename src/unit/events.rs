//! Lifecycle notifications.

use serde::{Deserialize, Serialize};

use super::id::{ParentId, UnitId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Start {
        id: UnitId,
        task: String,
    },
    Complete {
        id: UnitId,
        parent_id: ParentId,
        summary: String,
        duration_ms: u64,
    },
    Error {
        id: UnitId,
        parent_id: ParentId,
        error: String,
        duration_ms: u64,
    },
    Aborted {
        id: UnitId,
    },
}

impl LifecycleEvent {
    pub fn id(&self) -> UnitId {
        match self {
            Self::Start { id, .. }
            | Self::Complete { id, .. }
            | Self::Error { id, .. }
            | Self::Aborted { id } => *id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
            Self::Aborted { .. } => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Start { .. })
    }
}

/// Receives lifecycle events in emission order.
///
/// Called synchronously from the emitting unit, so implementations should
/// hand work off rather than block.
pub trait LifecycleObserver: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent);

    /// The unit was dropped before it reached a terminal state.
    fn on_dropped(&self, _id: UnitId) {}
}

impl<F> LifecycleObserver for F
where
    F: Fn(&LifecycleEvent) + Send + Sync,
{
    fn on_event(&self, event: &LifecycleEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let id = UnitId::new();
        let value = serde_json::to_value(LifecycleEvent::Aborted { id }).unwrap();
        assert_eq!(value["event"], "aborted");
        assert_eq!(value["id"], id.to_string());
    }

    #[test]
    fn test_terminal_events() {
        let id = UnitId::new();
        assert!(
            !LifecycleEvent::Start {
                id,
                task: "t".into()
            }
            .is_terminal()
        );
        assert!(LifecycleEvent::Aborted { id }.is_terminal());
    }
}
