//! Backend-free decomposition by clause splitting and keyword matching.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::{AnalysisContext, Analyzer, AnalyzerError, Decomposition};
use crate::tools::ToolKind;

static CLAUSE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i);|\.\s+|,?\s+(?:and\s+)?then\s+|,\s*finally\s+").unwrap()
});
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-*])\s+").unwrap());
static AND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i),?\s+and\s+").unwrap());

/// Steps used when nothing in an exploratory task names an action.
const SURVEY_WORDS: &[&str] = &["analyze", "analyse", "review", "audit", "explore", "overview"];
const SURVEY_PLAN: &[(&str, &str)] = &[
    ("List files with `ls -la`", "Bash"),
    ("Search for 'TODO|FIXME'", "Grep"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedAnalyzer;

impl RuleBasedAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Always yields at least one step.
    pub fn plan(&self, task: &str) -> Decomposition {
        let clauses = split_clauses(task);
        let mut plan = Decomposition::default();
        let mut matched = false;
        for clause in clauses {
            let kind = ToolKind::match_step(&clause);
            matched |= kind.is_some();
            plan.push(clause, kind.map(|k| k.tool_name()));
        }

        if !matched {
            let lower = task.to_lowercase();
            if SURVEY_WORDS.iter().any(|w| lower.contains(w)) {
                let mut survey = Decomposition::default();
                for (step, hint) in SURVEY_PLAN {
                    survey.push(*step, Some(hint));
                }
                return survey;
            }
        }

        if plan.is_empty() {
            plan = Decomposition::new([task.trim()]);
        }
        plan
    }
}

#[async_trait]
impl Analyzer for RuleBasedAnalyzer {
    fn name(&self) -> &str {
        "rule_based"
    }

    async fn decompose(
        &self,
        task: &str,
        _context: &AnalysisContext,
    ) -> Result<Decomposition, AnalyzerError> {
        Ok(self.plan(task))
    }
}

fn split_clauses(task: &str) -> Vec<String> {
    let mut clauses = Vec::new();
    let raws = task
        .lines()
        .map(|line| LIST_MARKER.replace(line, "").into_owned())
        .collect::<Vec<_>>();
    for raw in raws.iter().flat_map(|line| CLAUSE_BREAK.split(line)) {
        let clause = clean(raw);
        if clause.is_empty() {
            continue;
        }
        // "read a and run b" becomes two steps only when both halves act.
        let parts: Vec<String> = AND.split(&clause).map(clean).collect();
        if parts.len() > 1
            && parts
                .iter()
                .all(|p| !p.is_empty() && ToolKind::match_step(p).is_some())
        {
            clauses.extend(parts);
        } else {
            clauses.push(clause);
        }
    }
    clauses
}

fn clean(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(['.', ','])
        .trim()
        .to_string()
}
