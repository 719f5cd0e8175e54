//! Write tool - creates or overwrites files.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::{ToolContext, ToolResult, TypedTool};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteInput {
    /// Path of the file to write
    pub file_path: String,
    /// The content to write to the file
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WriteTool;

#[async_trait]
impl TypedTool for WriteTool {
    type Input = WriteInput;

    const NAME: &'static str = "Write";
    const DESCRIPTION: &'static str = "Writes content to a file. Creates the file and any missing \
        parent directories, or completely overwrites an existing file.";

    async fn handle(&self, input: WriteInput, context: &ToolContext) -> ToolResult {
        let path = match context.resolve(&input.file_path) {
            Ok(p) => p,
            Err(e) => return e.into(),
        };

        if let Some(parent) = path.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return ToolResult::error(format!("Failed to create directories: {}", e));
        }

        match tokio::fs::write(&path, &input.content).await {
            Ok(()) => ToolResult::success(json!({
                "path": path.display().to_string(),
                "bytes_written": input.content.len(),
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

    #[tokio::test]
    async fn test_write_creates_directories() {
        let dir = tempdir().unwrap();
        let context = ToolContext::detached(dir.path());

        let result = WriteTool
            .execute(
                json!({"file_path": "nested/deeper/out.txt", "content": "Hello"}),
                &context,
            )
            .await;

        assert_eq!(result.output().unwrap()["bytes_written"], 5);
        let written = tokio::fs::read_to_string(dir.path().join("nested/deeper/out.txt"))
            .await
            .unwrap();
        assert_eq!(written, "Hello");
    }

    #[tokio::test]
    async fn test_write_requires_content() {
        let dir = tempdir().unwrap();
        let context = ToolContext::detached(dir.path());
        let schema = WriteTool.schema();
        let err = schema
            .validate(&json!({"file_path": "a.txt"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "missing required parameter: content");

        let result = WriteTool.execute(json!({"file_path": "a.txt"}), &context).await;
        assert!(result.is_error());
    }
}
