//! Messages held by the memory store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::tokens::estimate_tokens;

pub const DEFAULT_MESSAGE_KIND: &str = "message";
pub const TASK_KIND: &str = "task";
pub const TOOL_RESULT_KIND: &str = "tool_result";
pub const TASK_RESULT_KIND: &str = "task_result";

#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    #[default]
    System,
    Tool,
}

impl MessageRole {
    pub const ALL: [MessageRole; 4] = [
        MessageRole::User,
        MessageRole::Assistant,
        MessageRole::System,
        MessageRole::Tool,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
            MessageRole::Tool => "tool",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored message. `token_count` is fixed when the message is appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub token_count: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Message {
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

/// Input to [`MemoryStore::append`](super::MemoryStore::append).
///
/// Every field is optional. A missing role becomes `system` and missing
/// content is stored as empty text.
#[derive(Clone, Debug, Default)]
pub struct MessageDraft {
    pub role: Option<MessageRole>,
    pub content: Option<String>,
    pub kind: Option<String>,
    pub metadata: Option<Value>,
}

impl MessageDraft {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Tool, content)
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Coerces a loosely shaped JSON value into a draft.
    ///
    /// Unknown roles fall back to `system`; non-string content is kept as its
    /// JSON text; a bare string is treated as content.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                let role = map
                    .get("role")
                    .and_then(Value::as_str)
                    .and_then(MessageRole::parse);
                let content = match map.get("content") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(other) => Some(other.to_string()),
                };
                let kind = map
                    .get("type")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Self {
                    role,
                    content,
                    kind,
                    metadata: map.get("metadata").cloned(),
                }
            }
            Value::String(s) => Self {
                content: Some(s.clone()),
                ..Default::default()
            },
            Value::Null => Self::default(),
            other => Self {
                content: Some(other.to_string()),
                ..Default::default()
            },
        }
    }

    pub(crate) fn into_message(self) -> Message {
        let content = self.content.unwrap_or_default();
        let token_count = estimate_tokens(&content);
        Message {
            id: MessageId::new(),
            role: self.role.unwrap_or_default(),
            content,
            timestamp: Utc::now(),
            token_count,
            kind: self
                .kind
                .unwrap_or_else(|| DEFAULT_MESSAGE_KIND.to_string()),
            metadata: self.metadata,
        }
    }
}

impl From<&str> for MessageDraft {
    fn from(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
            ..Default::default()
        }
    }
}

impl From<String> for MessageDraft {
    fn from(content: String) -> Self {
        Self {
            content: Some(content),
            ..Default::default()
        }
    }
}
