//! Final summaries.

use async_trait::async_trait;

use super::AnalyzerError;
use crate::unit::StepRecord;

/// Inputs for refining a unit's summary.
#[derive(Debug, Clone, Copy)]
pub struct SummaryRequest<'a> {
    pub task: &'a str,
    pub results: &'a [StepRecord],
    /// Deterministic summary; kept when refinement fails.
    pub baseline: &'a str,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn refine(&self, request: SummaryRequest<'_>) -> Result<String, AnalyzerError>;
}

/// `"<n> succeeded, <m> failed, tools: <names>"`, tools in first-use order.
pub fn summarize_results(results: &[StepRecord]) -> String {
    let succeeded = results.iter().filter(|r| r.success).count();
    let failed = results.len() - succeeded;
    let mut tools: Vec<&str> = Vec::new();
    for name in results.iter().filter_map(|r| r.tool.as_deref()) {
        if !tools.contains(&name) {
            tools.push(name);
        }
    }
    let tools = if tools.is_empty() {
        "none".to_string()
    } else {
        tools.join(", ")
    };
    format!("{succeeded} succeeded, {failed} failed, tools: {tools}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(index: usize, tool: Option<&str>, success: bool) -> StepRecord {
        StepRecord {
            index,
            step: format!("step {index}"),
            tool: tool.map(String::from),
            params: json!({}),
            result: json!({"success": success}),
            success,
            duration_ms: 1,
        }
    }

    #[test]
    fn test_summary_counts_and_tools() {
        let results = vec![
            record(0, Some("Read"), true),
            record(1, Some("Bash"), false),
            record(2, Some("Read"), true),
            record(3, None, false),
        ];
        assert_eq!(
            summarize_results(&results),
            "2 succeeded, 2 failed, tools: Read, Bash"
        );
    }

    #[test]
    fn test_summary_without_steps() {
        assert_eq!(summarize_results(&[]), "0 succeeded, 0 failed, tools: none");
    }
}
