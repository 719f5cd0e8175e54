//! Read tool - reads file contents.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{ToolContext, ToolError, ToolResult, TypedTool};

const DEFAULT_LINE_LIMIT: usize = 2000;
const MAX_LINE_CHARS: usize = 2000;

/// Input for the Read tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadInput {
    /// Path of the file to read, absolute or relative to the working directory.
    pub file_path: String,
    /// The line number to start reading from (0-indexed).
    #[serde(default)]
    pub offset: Option<usize>,
    /// The number of lines to read.
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadTool;

#[async_trait]
impl TypedTool for ReadTool {
    type Input = ReadInput;

    const NAME: &'static str = "Read";
    const DESCRIPTION: &'static str = "Reads a text file and returns numbered lines. \
        Reads up to 2000 lines from the start unless offset and limit are given.";

    async fn handle(&self, input: ReadInput, context: &ToolContext) -> ToolResult {
        let path = match context.resolve(&input.file_path) {
            Ok(p) => p,
            Err(e) => return e.into(),
        };

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ToolError::not_found(path.display().to_string()).into();
            }
            Err(e) => return ToolResult::error(format!("Failed to read file: {}", e)),
        };

        let offset = input.offset.unwrap_or(0);
        let limit = input.limit.unwrap_or(DEFAULT_LINE_LIMIT);
        let total_lines = content.lines().count();

        let selected: Vec<String> = content
            .lines()
            .skip(offset)
            .take(limit)
            .enumerate()
            .map(|(i, line)| {
                let line = if line.chars().count() > MAX_LINE_CHARS {
                    let cut: String = line.chars().take(MAX_LINE_CHARS).collect();
                    format!("{}...", cut)
                } else {
                    line.to_string()
                };
                format!("{:>6}\t{}", offset + i + 1, line)
            })
            .collect();

        if selected.is_empty() {
            return ToolResult::text(format!(
                "File is empty or offset {} exceeds file length {}",
                offset, total_lines
            ));
        }
        ToolResult::text(selected.join("\n"))
    }
}
