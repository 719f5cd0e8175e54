//! Grep tool - regex content search.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::{ToolContext, ToolError, ToolResult, TypedTool};

const DEFAULT_MAX_RESULTS: usize = 200;
const SKIPPED_DIRS: &[&str] = &[".git", "target", "node_modules"];

/// Input for the Grep tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GrepInput {
    /// The regular expression pattern to search for.
    pub pattern: String,
    /// File or directory to search in (defaults to the working directory).
    #[serde(default)]
    pub path: Option<String>,
    /// Glob pattern to filter file names (e.g. "*.rs").
    #[serde(default)]
    pub glob: Option<String>,
    /// Case insensitive search.
    #[serde(default)]
    pub case_insensitive: bool,
    /// Maximum number of matching lines to return.
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GrepTool;

#[async_trait]
impl TypedTool for GrepTool {
    type Input = GrepInput;

    const NAME: &'static str = "Grep";
    const DESCRIPTION: &'static str = "Searches file contents with a regular expression. \
        Returns matching lines as path:line:text, relative to the working directory.";

    async fn handle(&self, input: GrepInput, context: &ToolContext) -> ToolResult {
        let regex = match RegexBuilder::new(&input.pattern)
            .case_insensitive(input.case_insensitive)
            .build()
        {
            Ok(r) => r,
            Err(e) => return ToolError::invalid_input(format!("invalid pattern: {}", e)).into(),
        };

        let root = match context.resolve_or_root(input.path.as_deref()) {
            Ok(p) => p,
            Err(e) => return e.into(),
        };
        let base = context.working_dir().to_path_buf();
        let file_glob = input.glob.unwrap_or_else(|| "*".to_string());
        let max_results = input.max_results.unwrap_or(DEFAULT_MAX_RESULTS);

        let search = tokio::task::spawn_blocking(move || {
            search_files(&regex, &root, &base, &file_glob, max_results)
        })
        .await;

        match search {
            Ok(Ok((matches, truncated))) => ToolResult::success(json!({
                "count": matches.len(),
                "truncated": truncated,
                "matches": matches,
            })),
            Ok(Err(e)) => e.into(),
            Err(e) => ToolResult::error(format!("Search task failed: {}", e)),
        }
    }
}

fn search_files(
    regex: &Regex,
    root: &Path,
    base: &Path,
    file_glob: &str,
    max_results: usize,
) -> Result<(Vec<String>, bool), ToolError> {
    if !root.exists() {
        return Err(ToolError::not_found(root.display().to_string()));
    }

    let files: Vec<PathBuf> = if root.is_file() {
        vec![root.to_path_buf()]
    } else {
        let pattern = format!(
            "{}/**/{}",
            glob::Pattern::escape(&root.to_string_lossy()),
            file_glob
        );
        let paths = glob::glob(&pattern)
            .map_err(|e| ToolError::invalid_input(format!("invalid glob: {}", e)))?;
        let mut files: Vec<PathBuf> = paths
            .filter_map(Result::ok)
            .filter(|p| p.is_file() && !in_skipped_dir(p, root))
            .collect();
        files.sort();
        files
    };

    let mut matches = Vec::new();
    for file in files {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let display = file.strip_prefix(base).unwrap_or(&file).display().to_string();
        for (number, line) in content.lines().enumerate() {
            if regex.is_match(line) {
                if matches.len() == max_results {
                    return Ok((matches, true));
                }
                matches.push(format!("{}:{}:{}", display, number + 1, line.trim_end()));
            }
        }
    }
    Ok((matches, false))
}

fn in_skipped_dir(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| SKIPPED_DIRS.iter().any(|skip| c.as_os_str() == *skip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use tempfile::tempdir;

    async fn fixture() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("src")).await.unwrap();
        tokio::fs::create_dir_all(dir.path().join("target")).await.unwrap();
        tokio::fs::write(dir.path().join("src/main.rs"), "fn main() {\n    // TODO: args\n}\n")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("src/notes.md"), "todo: docs\n")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("target/gen.rs"), "// TODO generated\n")
            .await
            .unwrap();
        dir
    }

    #[tokio::test]
    async fn test_search_with_glob() {
        let dir = fixture().await;
        let context = ToolContext::detached(dir.path());
        let result = GrepTool
            .execute(json!({"pattern": "TODO", "glob": "*.rs"}), &context)
            .await;
        let output = result.output().unwrap();
        assert_eq!(output["count"], 1);
        assert_eq!(output["matches"][0], "src/main.rs:2:    // TODO: args");
    }

    #[tokio::test]
    async fn test_case_insensitive() {
        let dir = fixture().await;
        let context = ToolContext::detached(dir.path());
        let result = GrepTool
            .execute(json!({"pattern": "todo", "case_insensitive": true, "path": "src"}), &context)
            .await;
        assert_eq!(result.output().unwrap()["count"], 2);
    }

    #[tokio::test]
    async fn test_max_results_truncates() {
        let dir = fixture().await;
        let context = ToolContext::detached(dir.path());
        let result = GrepTool
            .execute(
                json!({"pattern": "(?i)todo", "path": "src", "max_results": 1}),
                &context,
            )
            .await;
        let output = result.output().unwrap();
        assert_eq!(output["count"], 1);
        assert_eq!(output["truncated"], true);
    }

    #[tokio::test]
    async fn test_invalid_pattern() {
        let dir = fixture().await;
        let context = ToolContext::detached(dir.path());
        let result = GrepTool.execute(json!({"pattern": "("}), &context).await;
        assert!(matches!(result, ToolResult::Error(ToolError::InvalidInput { .. })));
    }
}
