//! Structured summaries produced by compression.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::{Message, MessageRole, TASK_RESULT_KIND, TOOL_RESULT_KIND};
use super::tokens::estimate_tokens;

const MAX_SECTION_ENTRIES: usize = 8;
const MAX_EXCERPT_CHARS: usize = 160;

const DECISION_MARKERS: &[&str] = &["decided", "decision", "chose", "selected", "going with"];
const PLAN_MARKERS: &[&str] = &["next", "plan", "will ", "later", "follow up", "follow-up"];
const ISSUE_MARKERS: &[&str] = &["todo", "unresolved", "pending", "blocked", "unknown", "?"];
const ERROR_MARKERS: &[&str] = &["error", "failed", "failure", "exception", "panic"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUsage {
    pub calls: usize,
    pub failures: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetadata {
    pub original_message_count: usize,
    pub original_token_count: usize,
    pub compressed_at: DateTime<Utc>,
    /// Summary tokens divided by original tokens; 0 when nothing was summarized.
    pub compression_ratio: f64,
}

/// One compression event's digest of the short-term tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompressedSummary {
    pub background: Vec<String>,
    pub key_decisions: Vec<String>,
    pub tool_usage: BTreeMap<String, ToolUsage>,
    pub user_intent: Vec<String>,
    pub execution_results: Vec<String>,
    pub error_records: Vec<String>,
    pub open_issues: Vec<String>,
    pub future_plans: Vec<String>,
    pub metadata: SummaryMetadata,
}

impl CompressedSummary {
    pub fn from_messages(messages: &[Message]) -> Self {
        let mut sections = Sections::default();
        for message in messages {
            sections.absorb(message);
        }

        let original_token_count: usize = messages.iter().map(|m| m.token_count).sum();
        let mut summary = Self {
            background: sections.background.finish(),
            key_decisions: sections.key_decisions.finish(),
            tool_usage: sections.tool_usage,
            user_intent: sections.user_intent.finish(),
            execution_results: sections.execution_results.finish(),
            error_records: sections.error_records.finish(),
            open_issues: sections.open_issues.finish(),
            future_plans: sections.future_plans.finish(),
            metadata: SummaryMetadata {
                original_message_count: messages.len(),
                original_token_count,
                compressed_at: Utc::now(),
                compression_ratio: 0.0,
            },
        };

        if original_token_count > 0 {
            summary.metadata.compression_ratio =
                summary.token_estimate() as f64 / original_token_count as f64;
        }
        summary
    }

    pub fn token_estimate(&self) -> usize {
        estimate_tokens(&self.render())
    }

    pub fn total_tool_calls(&self) -> usize {
        self.tool_usage.values().map(|u| u.calls).sum()
    }

    /// Renders the summary as plain text for downstream prompts.
    pub fn render(&self) -> String {
        let mut out = format!(
            "[Summary of {} messages]\n",
            self.metadata.original_message_count
        );
        render_section(&mut out, "Background", &self.background);
        render_section(&mut out, "Key decisions", &self.key_decisions);
        if !self.tool_usage.is_empty() {
            out.push_str("## Tool usage\n");
            for (tool, usage) in &self.tool_usage {
                out.push_str(&format!(
                    "- {}: {} calls, {} failed\n",
                    tool, usage.calls, usage.failures
                ));
            }
        }
        render_section(&mut out, "User intent", &self.user_intent);
        render_section(&mut out, "Execution results", &self.execution_results);
        render_section(&mut out, "Errors", &self.error_records);
        render_section(&mut out, "Open issues", &self.open_issues);
        render_section(&mut out, "Future plans", &self.future_plans);
        out
    }
}

fn render_section(out: &mut String, title: &str, entries: &[String]) {
    if entries.is_empty() {
        return;
    }
    out.push_str("## ");
    out.push_str(title);
    out.push('\n');
    for entry in entries {
        out.push_str("- ");
        out.push_str(entry);
        out.push('\n');
    }
}

/// Keeps the most recent entries of a section.
#[derive(Default)]
struct Section(Vec<String>);

impl Section {
    fn push(&mut self, entry: String) {
        if entry.is_empty() {
            return;
        }
        if self.0.len() == MAX_SECTION_ENTRIES {
            self.0.remove(0);
        }
        self.0.push(entry);
    }

    fn finish(self) -> Vec<String> {
        self.0
    }
}

#[derive(Default)]
struct Sections {
    background: Section,
    key_decisions: Section,
    tool_usage: BTreeMap<String, ToolUsage>,
    user_intent: Section,
    execution_results: Section,
    error_records: Section,
    open_issues: Section,
    future_plans: Section,
}

impl Sections {
    fn absorb(&mut self, message: &Message) {
        if message.role == MessageRole::Tool || message.is_kind(TOOL_RESULT_KIND) {
            self.absorb_tool_result(message);
            return;
        }

        let excerpt = excerpt(&message.content);
        let lower = message.content.to_lowercase();

        match message.role {
            MessageRole::User => self.user_intent.push(excerpt.clone()),
            MessageRole::System => self.background.push(excerpt.clone()),
            MessageRole::Assistant if message.is_kind(TASK_RESULT_KIND) => {
                self.execution_results.push(excerpt.clone())
            }
            _ => {}
        }

        if message.role == MessageRole::Assistant && contains_any(&lower, DECISION_MARKERS) {
            self.key_decisions.push(excerpt.clone());
        }
        if contains_any(&lower, ERROR_MARKERS) {
            self.error_records.push(excerpt.clone());
        }
        if contains_any(&lower, ISSUE_MARKERS) {
            self.open_issues.push(excerpt.clone());
        }
        if message.role != MessageRole::System && contains_any(&lower, PLAN_MARKERS) {
            self.future_plans.push(excerpt);
        }
    }

    fn absorb_tool_result(&mut self, message: &Message) {
        let Ok(Value::Object(record)) = serde_json::from_str::<Value>(&message.content) else {
            let text = excerpt(&message.content);
            if contains_any(&message.content.to_lowercase(), ERROR_MARKERS) {
                self.error_records.push(text);
            } else {
                self.execution_results.push(text);
            }
            return;
        };

        let tool = record
            .get("tool")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let step = record.get("step").and_then(Value::as_str).unwrap_or("");
        let success = record
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let usage = self.tool_usage.entry(tool.clone()).or_default();
        usage.calls += 1;

        if success {
            self.execution_results
                .push(excerpt(&format!("{}: {}", tool, step)));
        } else {
            usage.failures += 1;
            let error = record
                .get("result")
                .and_then(|r| r.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("failed");
            self.error_records
                .push(excerpt(&format!("{}: {} ({})", tool, step, error)));
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn excerpt(text: &str) -> String {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() <= MAX_EXCERPT_CHARS {
        return line;
    }
    let cut: String = line.chars().take(MAX_EXCERPT_CHARS).collect();
    format!("{}...", cut)
}
