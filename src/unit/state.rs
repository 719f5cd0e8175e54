//! Unit state machine.

use serde::{Deserialize, Serialize};

/// `Created -> Running -> {Completed, Failed, Aborted}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    #[default]
    Created,
    Running,
    Completed,
    Failed,
    Aborted,
}

impl UnitState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Aborted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!UnitState::Created.is_terminal());
        assert!(!UnitState::Running.is_terminal());
        assert!(UnitState::Completed.is_terminal());
        assert!(UnitState::Failed.is_terminal());
        assert!(UnitState::Aborted.is_terminal());
    }

    #[test]
    fn test_serde_snake_case() {
        assert_eq!(serde_json::to_string(&UnitState::Aborted).unwrap(), r#""aborted""#);
    }
}
