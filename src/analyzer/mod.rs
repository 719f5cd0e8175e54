//! Task decomposition.
//!
//! An [`Analyzer`] turns a task description into ordered steps, optionally
//! with a tool hint per step. [`RuleBasedAnalyzer`] needs no backend and is
//! what a unit falls back to when its configured analyzer errors or returns
//! nothing. [`ModelAnalyzer`] delegates to any [`CompletionBackend`].

mod model;
mod rule;
mod summarizer;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use model::{CompletionBackend, ModelAnalyzer, ModelSummarizer, parse_decomposition};
pub use rule::RuleBasedAnalyzer;
pub use summarizer::{SummaryRequest, Summarizer, summarize_results};

use crate::unit::{ParentId, UnitId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalyzerError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("unparseable response: {0}")]
    Parse(String),

    #[error("no steps produced")]
    Empty,
}

/// Ordered steps plus optional per-step tool hints.
///
/// `tool_hints[i]` applies to `steps[i]`; a missing or empty hint leaves the
/// choice to keyword matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decomposition {
    pub steps: Vec<String>,
    #[serde(default)]
    pub tool_hints: Vec<String>,
}

impl Decomposition {
    pub fn new(steps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            steps: steps.into_iter().map(Into::into).collect(),
            tool_hints: Vec::new(),
        }
    }

    pub fn with_hints(mut self, hints: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tool_hints = hints.into_iter().map(Into::into).collect();
        self
    }

    pub fn push(&mut self, step: impl Into<String>, hint: Option<&str>) {
        // Keep hints index-aligned with steps.
        self.tool_hints.resize(self.steps.len(), String::new());
        self.steps.push(step.into());
        self.tool_hints.push(hint.unwrap_or_default().to_string());
    }

    pub fn hint(&self, index: usize) -> Option<&str> {
        self.tool_hints
            .get(index)
            .map(String::as_str)
            .filter(|h| !h.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.iter().all(|s| s.trim().is_empty())
    }
}

/// What an analyzer may consult besides the task text.
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    pub unit_id: UnitId,
    pub parent_id: ParentId,
    pub available_tools: Vec<String>,
    pub facts: BTreeMap<String, Value>,
    pub extra: Map<String, Value>,
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &str {
        "analyzer"
    }

    async fn decompose(
        &self,
        task: &str,
        context: &AnalysisContext,
    ) -> Result<Decomposition, AnalyzerError>;
}
