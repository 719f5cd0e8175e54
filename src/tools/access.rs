//! Which tools a registry exposes to units.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::kind::ToolKind;

/// Allow-list or deny-list over tool names.
///
/// Serialized as `{"mode": "only", "tools": ["Read"]}` so it can sit in a
/// config file next to the unit limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "tools")]
pub enum ToolAccess {
    None,
    #[default]
    All,
    Only(BTreeSet<String>),
    Except(BTreeSet<String>),
}

impl ToolAccess {
    pub fn all() -> Self {
        Self::All
    }

    pub fn none() -> Self {
        Self::None
    }

    pub fn only(tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Only(tools.into_iter().map(Into::into).collect())
    }

    pub fn except(tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Except(tools.into_iter().map(Into::into).collect())
    }

    /// Builtins that never modify the working directory.
    pub fn read_only() -> Self {
        Self::only([ToolKind::Read.tool_name(), ToolKind::Search.tool_name()])
    }

    /// Everything except the `Task` tool, so units cannot nest.
    pub fn without_nesting() -> Self {
        Self::except([ToolKind::Task.tool_name()])
    }

    pub fn is_allowed(&self, tool_name: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Only(allowed) => allowed.contains(tool_name),
            Self::Except(denied) => !denied.contains(tool_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_and_except() {
        let access = ToolAccess::only(["Read", "Grep"]);
        assert!(access.is_allowed("Grep"));
        assert!(!access.is_allowed("Bash"));

        let access = ToolAccess::except(["Bash"]);
        assert!(access.is_allowed("Edit"));
        assert!(!access.is_allowed("Bash"));
        assert!(!ToolAccess::none().is_allowed("Read"));
    }

    #[test]
    fn test_presets() {
        let read_only = ToolAccess::read_only();
        assert!(read_only.is_allowed("Read"));
        assert!(read_only.is_allowed("Grep"));
        assert!(!read_only.is_allowed("Write"));

        let flat = ToolAccess::without_nesting();
        assert!(!flat.is_allowed("Task"));
        assert!(flat.is_allowed("Bash"));
    }

    #[test]
    fn test_serde_shape() {
        let access: ToolAccess =
            serde_json::from_str(r#"{"mode": "only", "tools": ["Read"]}"#).unwrap();
        assert!(access.is_allowed("Read"));
        assert!(!access.is_allowed("Write"));

        let all: ToolAccess = serde_json::from_str(r#"{"mode": "all"}"#).unwrap();
        assert_eq!(all, ToolAccess::All);
        assert_eq!(
            serde_json::to_value(ToolAccess::read_only()).unwrap(),
            serde_json::json!({"mode": "only", "tools": ["Grep", "Read"]})
        );
    }
}
