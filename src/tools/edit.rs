//! Edit tool - exact string replacement in files.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::{ToolContext, ToolError, ToolResult, TypedTool};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EditInput {
    /// Path of the file to modify
    pub file_path: String,
    /// The text to replace
    pub old_string: String,
    /// The text to replace it with (must be different from old_string)
    pub new_string: String,
    /// Replace every occurrence of old_string (default false)
    #[serde(default)]
    pub replace_all: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EditTool;

#[async_trait]
impl TypedTool for EditTool {
    type Input = EditInput;

    const NAME: &'static str = "Edit";
    const DESCRIPTION: &'static str = "Performs exact string replacements in a file. Fails when \
        old_string is absent, or appears more than once without replace_all.";

    async fn handle(&self, input: EditInput, context: &ToolContext) -> ToolResult {
        if input.old_string == input.new_string {
            return ToolError::invalid_input("old_string and new_string must be different").into();
        }

        let path = match context.resolve(&input.file_path) {
            Ok(p) => p,
            Err(e) => return e.into(),
        };

        let original = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ToolError::not_found(path.display().to_string()).into();
            }
            Err(e) => return ToolResult::error(format!("Failed to read file: {}", e)),
        };

        let count = original.matches(&input.old_string).count();
        if count == 0 {
            return ToolResult::error("old_string not found in file");
        }
        if count > 1 && !input.replace_all {
            return ToolResult::error(format!(
                "old_string found {} times; use replace_all or provide more context",
                count
            ));
        }

        let updated = if input.replace_all {
            original.replace(&input.old_string, &input.new_string)
        } else {
            original.replacen(&input.old_string, &input.new_string, 1)
        };

        let replacements = if input.replace_all { count } else { 1 };
        match tokio::fs::write(&path, updated).await {
            Ok(()) => ToolResult::success(json!({
                "path": path.display().to_string(),
                "replacements": replacements,
            })),
            Err(e) => ToolResult::error(format!("Failed to write file: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use tempfile::tempdir;

    async fn setup(content: &str) -> (tempfile::TempDir, ToolContext) {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), content)
            .await
            .unwrap();
        let context = ToolContext::detached(dir.path());
        (dir, context)
    }

    #[tokio::test]
    async fn test_edit_single() {
        let (dir, context) = setup("Hello, World!").await;
        let result = EditTool
            .execute(
                json!({"file_path": "a.txt", "old_string": "World", "new_string": "Rust"}),
                &context,
            )
            .await;
        assert!(result.is_success());
        let content = tokio::fs::read_to_string(dir.path().join("a.txt")).await.unwrap();
        assert_eq!(content, "Hello, Rust!");
    }

    #[tokio::test]
    async fn test_edit_ambiguous_without_replace_all() {
        let (_dir, context) = setup("x x x").await;
        let result = EditTool
            .execute(
                json!({"file_path": "a.txt", "old_string": "x", "new_string": "y"}),
                &context,
            )
            .await;
        assert!(result.error_message().unwrap().contains("found 3 times"));
    }

    #[tokio::test]
    async fn test_edit_replace_all() {
        let (dir, context) = setup("x x x").await;
        let result = EditTool
            .execute(
                json!({"file_path": "a.txt", "old_string": "x", "new_string": "y", "replace_all": true}),
                &context,
            )
            .await;
        assert_eq!(result.output().unwrap()["replacements"], 3);
        let content = tokio::fs::read_to_string(dir.path().join("a.txt")).await.unwrap();
        assert_eq!(content, "y y y");
    }

    #[tokio::test]
    async fn test_edit_identical_strings_rejected() {
        let (_dir, context) = setup("abc").await;
        let result = EditTool
            .execute(
                json!({"file_path": "a.txt", "old_string": "a", "new_string": "a"}),
                &context,
            )
            .await;
        assert!(matches!(result, ToolResult::Error(ToolError::InvalidInput { .. })));
    }
}
