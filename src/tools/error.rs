//! Tool error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("missing required parameter: {name}")]
    MissingParameter { name: String },

    #[error("invalid type for parameter {name}: expected {expected}")]
    InvalidType { name: String, expected: String },

    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("not found: {path}")]
    NotFound { path: String },

    #[error("execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("security violation: {message}")]
    SecurityViolation { message: String },

    #[error("unknown tool: {name}")]
    UnknownTool { name: String },
}

impl ToolError {
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    pub fn invalid_type(name: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidType {
            name: name.into(),
            expected: expected.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: message.into(),
        }
    }

    pub fn security_violation(message: impl Into<String>) -> Self {
        Self::SecurityViolation {
            message: message.into(),
        }
    }

    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    /// Rejected before the tool ran.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter { .. } | Self::InvalidType { .. } | Self::InvalidInput { .. }
        )
    }
}
