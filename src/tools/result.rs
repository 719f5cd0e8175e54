//! Tool results.

use serde_json::{Value, json};

use super::error::ToolError;

/// Outcome of one tool call.
///
/// Failures are values: a tool never throws into the step loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success(Value),
    Error(ToolError),
}

impl ToolResult {
    pub fn success(output: impl Into<Value>) -> Self {
        Self::Success(output.into())
    }

    pub fn text(output: impl Into<String>) -> Self {
        Self::Success(Value::String(output.into()))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ToolError::execution_failed(message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn output(&self) -> Option<&Value> {
        match self {
            Self::Success(value) => Some(value),
            Self::Error(_) => None,
        }
    }

    /// Output rendered as text; strings are returned without JSON quoting.
    pub fn output_text(&self) -> Option<String> {
        self.output().map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Success(_) => None,
            Self::Error(e) => Some(e.to_string()),
        }
    }

    /// `{"success": true, "output": ...}` or `{"success": false, "error": "..."}`.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Success(output) => json!({"success": true, "output": output}),
            Self::Error(e) => json!({"success": false, "error": e.to_string()}),
        }
    }
}

impl From<ToolError> for ToolResult {
    fn from(error: ToolError) -> Self {
        Self::Error(error)
    }
}
