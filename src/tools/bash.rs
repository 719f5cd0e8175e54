//! Bash tool - shell command execution.

use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tokio::process::Command;
use tokio::time::timeout;

use super::{ToolContext, ToolError, ToolResult, TypedTool};

const DEFAULT_TIMEOUT_MS: u64 = 120_000;
const MAX_TIMEOUT_MS: u64 = 600_000;
const MAX_OUTPUT: usize = 30_000;

static DANGEROUS_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"rm\s+(-[rfRPd]+\s+)*/(\s|$|\*)").unwrap(), "rm root"),
        (Regex::new(r"rm\s+(-[rfRPd]+\s+)*~/?(\s|$)").unwrap(), "rm home"),
        (Regex::new(r"\b(sudo|doas)\s+rm\b").unwrap(), "privileged rm"),
        (Regex::new(r"dd\s+.*if\s*=\s*/dev/zero").unwrap(), "dd zero"),
        (Regex::new(r"\bmkfs(\.[a-z0-9]+)?\s").unwrap(), "mkfs"),
        (Regex::new(r">\s*/dev/sd[a-z]").unwrap(), "overwrite disk"),
        (Regex::new(r"chmod\s+-R\s+777\s+/(\s|$)").unwrap(), "chmod root"),
        (
            Regex::new(r":\s*\(\s*\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:").unwrap(),
            "fork bomb",
        ),
    ]
});

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BashInput {
    /// The command to execute
    pub command: String,
    /// Timeout in milliseconds (max 600000)
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BashTool;

impl BashTool {
    fn dangerous_reason(command: &str) -> Option<&'static str> {
        DANGEROUS_PATTERNS
            .iter()
            .find(|(pattern, _)| pattern.is_match(command))
            .map(|(_, reason)| *reason)
    }
}

fn truncate_output(mut text: String) -> String {
    if text.len() > MAX_OUTPUT {
        let mut cut = MAX_OUTPUT;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("\n... (output truncated)");
    }
    text
}

#[async_trait]
impl TypedTool for BashTool {
    type Input = BashInput;

    const NAME: &'static str = "Bash";
    const DESCRIPTION: &'static str = "Executes a bash command in the working directory. \
        Default timeout is 120 seconds, maximum is 600 seconds. A non-zero exit status is a failure.";

    async fn handle(&self, input: BashInput, context: &ToolContext) -> ToolResult {
        if let Some(reason) = Self::dangerous_reason(&input.command) {
            return ToolError::security_violation(format!("command blocked ({})", reason)).into();
        }

        let timeout_ms = input
            .timeout_ms
            .unwrap_or(DEFAULT_TIMEOUT_MS)
            .min(MAX_TIMEOUT_MS);

        let mut cmd = Command::new("bash");
        cmd.arg("-c")
            .arg(&input.command)
            .current_dir(context.working_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(Duration::from_millis(timeout_ms), cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return ToolResult::error(format!("Failed to execute command: {}", e)),
            Err(_) => return ToolError::timeout(timeout_ms).into(),
        };

        let stdout = truncate_output(String::from_utf8_lossy(&output.stdout).into_owned());
        let stderr = truncate_output(String::from_utf8_lossy(&output.stderr).into_owned());

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let detail = if stderr.trim().is_empty() { &stdout } else { &stderr };
            return ToolResult::error(format!("exit code {}: {}", code, detail.trim()));
        }

        ToolResult::success(json!({
            "exit_code": output.status.code().unwrap_or(0),
            "stdout": stdout,
            "stderr": stderr,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;

    #[test]
    fn test_dangerous_commands() {
        assert!(BashTool::dangerous_reason("rm -rf /").is_some());
        assert!(BashTool::dangerous_reason("sudo rm -rf /home").is_some());
        assert!(BashTool::dangerous_reason("rm -rf ./build").is_none());
        assert!(BashTool::dangerous_reason("ls -la").is_none());
    }

    #[tokio::test]
    async fn test_simple_command() {
        let dir = tempfile::tempdir().unwrap();
        let context = ToolContext::detached(dir.path());
        let result = BashTool
            .execute(json!({"command": "echo 'hello world'"}), &context)
            .await;
        assert_eq!(result.output().unwrap()["stdout"], "hello world\n");
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("marker.txt"), "").await.unwrap();
        let context = ToolContext::detached(dir.path());
        let result = BashTool.execute(json!({"command": "ls"}), &context).await;
        let stdout = result.output().unwrap()["stdout"].as_str().unwrap().to_string();
        assert!(stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let context = ToolContext::detached(dir.path());
        let result = BashTool
            .execute(json!({"command": "echo oops >&2; exit 3"}), &context)
            .await;
        assert_eq!(result.error_message().unwrap(), "execution failed: exit code 3: oops");
    }

    #[tokio::test]
    async fn test_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let context = ToolContext::detached(dir.path());
        let result = BashTool
            .execute(json!({"command": "sleep 5", "timeout_ms": 50}), &context)
            .await;
        assert_eq!(result, ToolResult::Error(ToolError::timeout(50)));
    }
}
