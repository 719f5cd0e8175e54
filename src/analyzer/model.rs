//! Analyzers backed by a text-completion service.

use std::fmt::Write as _;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::summarizer::{SummaryRequest, Summarizer};
use super::{AnalysisContext, Analyzer, AnalyzerError, Decomposition};

const DEFAULT_MAX_STEPS: usize = 20;

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AnalyzerError>;
}

#[async_trait]
impl<B: CompletionBackend + ?Sized> CompletionBackend for std::sync::Arc<B> {
    async fn complete(&self, prompt: &str) -> Result<String, AnalyzerError> {
        (**self).complete(prompt).await
    }
}

/// Asks the backend for a JSON plan: `{"steps": [...], "tool_hints": [...]}`.
pub struct ModelAnalyzer<B> {
    backend: B,
    max_steps: usize,
}

impl<B: CompletionBackend> ModelAnalyzer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max.max(1);
        self
    }

    fn prompt(&self, task: &str, context: &AnalysisContext) -> String {
        let mut prompt = String::from(
            "Break the task into short, concrete steps. Each step should be doable with one tool.\n",
        );
        if !context.available_tools.is_empty() {
            let _ = writeln!(prompt, "Tools: {}", context.available_tools.join(", "));
        }
        for (key, value) in &context.facts {
            let _ = writeln!(prompt, "Known: {key} = {value}");
        }
        let _ = writeln!(
            prompt,
            "Reply with JSON only: {{\"steps\": [\"...\"], \"tool_hints\": [\"<tool or empty>\"]}}"
        );
        let _ = write!(prompt, "Task: {task}");
        prompt
    }
}

#[async_trait]
impl<B: CompletionBackend> Analyzer for ModelAnalyzer<B> {
    fn name(&self) -> &str {
        "model"
    }

    async fn decompose(
        &self,
        task: &str,
        context: &AnalysisContext,
    ) -> Result<Decomposition, AnalyzerError> {
        let raw = self.backend.complete(&self.prompt(task, context)).await?;
        let mut plan = parse_decomposition(&raw)?;
        plan.steps.truncate(self.max_steps);
        plan.tool_hints.truncate(plan.steps.len());
        debug!(steps = plan.len(), "Model decomposition parsed");
        Ok(plan)
    }
}

/// Reads a plan from backend output.
///
/// Accepts a JSON object anywhere in the text (fenced or not), or a bare
/// JSON array of steps, or one step per non-empty line.
pub fn parse_decomposition(raw: &str) -> Result<Decomposition, AnalyzerError> {
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}'))
        && start < end
        && let Ok(plan) = serde_json::from_str::<Decomposition>(&raw[start..=end])
    {
        return non_empty(plan);
    }

    if let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']'))
        && start < end
        && let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&raw[start..=end])
    {
        let steps: Vec<String> = items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect();
        return non_empty(Decomposition::new(steps));
    }

    let steps: Vec<String> = raw
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '.' | ')' | '-' | '*'))
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty() && !line.starts_with("```"))
        .collect();
    if steps.is_empty() {
        return Err(AnalyzerError::Parse(raw.chars().take(80).collect()));
    }
    non_empty(Decomposition::new(steps))
}

fn non_empty(plan: Decomposition) -> Result<Decomposition, AnalyzerError> {
    if plan.is_empty() {
        Err(AnalyzerError::Empty)
    } else {
        Ok(plan)
    }
}

/// Rewrites the deterministic summary into prose via the backend.
pub struct ModelSummarizer<B> {
    backend: B,
}

impl<B: CompletionBackend> ModelSummarizer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<B: CompletionBackend> Summarizer for ModelSummarizer<B> {
    async fn refine(&self, request: SummaryRequest<'_>) -> Result<String, AnalyzerError> {
        let mut prompt = format!(
            "Summarize the outcome of this task in two or three sentences.\nTask: {}\nOutcome: {}\n",
            request.task, request.baseline
        );
        for record in request.results {
            let status = if record.success { "ok" } else { "failed" };
            let _ = writeln!(
                prompt,
                "- {} [{}] {}",
                record.step,
                record.tool.as_deref().unwrap_or("-"),
                status
            );
        }
        let text = self.backend.complete(&prompt).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(AnalyzerError::Empty);
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(&'static str);

    #[async_trait]
    impl CompletionBackend for Canned {
        async fn complete(&self, _prompt: &str) -> Result<String, AnalyzerError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "Here you go:\n```json\n{\"steps\": [\"read a.txt\", \"run `ls`\"], \"tool_hints\": [\"Read\", \"\"]}\n```";
        let plan = parse_decomposition(raw).unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.hint(0), Some("Read"));
        assert_eq!(plan.hint(1), None);
    }

    #[test]
    fn test_parse_array_and_lines() {
        assert_eq!(parse_decomposition(r#"["a", "b"]"#).unwrap().steps, vec!["a", "b"]);
        assert_eq!(
            parse_decomposition("1. read x.txt\n2) run `ls`\n").unwrap().steps,
            vec!["read x.txt", "run `ls`"]
        );
    }

    #[test]
    fn test_parse_empty_plan() {
        assert_eq!(
            parse_decomposition(r#"{"steps": []}"#),
            Err(AnalyzerError::Empty)
        );
        assert!(parse_decomposition("   \n").is_err());
    }

    #[tokio::test]
    async fn test_model_analyzer_truncates() {
        let analyzer = ModelAnalyzer::new(Canned(r#"{"steps":["a","b","c"],"tool_hints":["Read","Bash","Grep"]}"#))
            .with_max_steps(2);
        let plan = analyzer
            .decompose("task", &AnalysisContext::default())
            .await
            .unwrap();
        assert_eq!(plan.steps, vec!["a", "b"]);
        assert_eq!(plan.tool_hints.len(), 2);
    }

    #[tokio::test]
    async fn test_model_summarizer() {
        let summarizer = ModelSummarizer::new(Canned("  All good.  "));
        let text = summarizer
            .refine(SummaryRequest {
                task: "t",
                results: &[],
                baseline: "0 succeeded, 0 failed, tools: none",
            })
            .await
            .unwrap();
        assert_eq!(text, "All good.");
    }
}
