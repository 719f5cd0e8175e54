//! The task unit: decompose, execute steps, summarize.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::config::UnitConfig;
use super::events::{LifecycleEvent, LifecycleObserver};
use super::id::{ParentId, UnitId};
use super::outcome::{StepRecord, UnitFailure, UnitOutcome, UnitReport};
use super::state::UnitState;
use crate::analyzer::{
    AnalysisContext, Analyzer, Decomposition, RuleBasedAnalyzer, SummaryRequest, Summarizer,
    summarize_results,
};
use crate::memory::{MemoryStore, MessageDraft, TASK_KIND, TASK_RESULT_KIND, TOOL_RESULT_KIND};
use crate::tools::{ToolAccess, ToolContext, ToolRegistry, ToolResult, select_tool, step_params};

enum PipelineEnd {
    Completed(String),
    Aborted,
}

/// One unit of work with its own memory and cancellation token.
///
/// A unit runs at most once. Cancellation is cooperative and checked before
/// each step; a step already dispatched runs to completion.
pub struct TaskUnit {
    id: UnitId,
    parent_id: ParentId,
    depth: usize,
    task: String,
    context: Map<String, Value>,
    state: UnitState,
    config: UnitConfig,
    memory: MemoryStore,
    cancel: CancellationToken,
    tools: Arc<ToolRegistry>,
    analyzer: Arc<dyn Analyzer>,
    summarizer: Option<Arc<dyn Summarizer>>,
    observer: Option<Arc<dyn LifecycleObserver>>,
    steps: Vec<String>,
    results: Vec<StepRecord>,
}

impl TaskUnit {
    pub fn builder(task: impl Into<String>) -> TaskUnitBuilder {
        TaskUnitBuilder::new(task)
    }

    pub fn new(task: impl Into<String>) -> Self {
        Self::builder(task).build()
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn parent_id(&self) -> ParentId {
        self.parent_id
    }

    /// 0 for units created by a top-level request.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn config(&self) -> &UnitConfig {
        &self.config
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryStore {
        &mut self.memory
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn results(&self) -> &[StepRecord] {
        &self.results
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Requests cooperative cancellation.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs the unit to a terminal state.
    ///
    /// Completed and aborted runs yield `Ok`; a panic in the analyzer or a
    /// tool yields `Err` with state `Failed`. Calling this on a unit that
    /// has already left `Created` fails without touching its state.
    #[instrument(skip(self), fields(unit_id = %self.id, parent_id = %self.parent_id))]
    pub async fn execute(&mut self) -> UnitOutcome {
        if self.state != UnitState::Created {
            return Err(self.failure(format!("unit is already {}", self.state), Duration::ZERO));
        }

        let started = Instant::now();
        self.state = UnitState::Running;
        info!(task = %self.task, depth = self.depth, "Unit started");
        self.emit(LifecycleEvent::Start {
            id: self.id,
            task: self.task.clone(),
        });
        self.memory
            .append(MessageDraft::user(self.task.clone()).with_kind(TASK_KIND));

        let pipeline = AssertUnwindSafe(self.run_pipeline()).catch_unwind().await;
        let duration = started.elapsed();

        match pipeline {
            Ok(PipelineEnd::Completed(summary)) => {
                self.memory
                    .append(MessageDraft::assistant(summary.clone()).with_kind(TASK_RESULT_KIND));
                self.state = UnitState::Completed;
                info!(
                    steps = self.results.len(),
                    duration_ms = duration.as_millis() as u64,
                    "Unit completed"
                );
                self.emit(LifecycleEvent::Complete {
                    id: self.id,
                    parent_id: self.parent_id,
                    summary: summary.clone(),
                    duration_ms: duration.as_millis() as u64,
                });
                Ok(self.report(summary, duration))
            }
            Ok(PipelineEnd::Aborted) => {
                self.state = UnitState::Aborted;
                let summary = format!(
                    "aborted after {} of {} steps",
                    self.results.len(),
                    self.steps.len()
                );
                info!(completed_steps = self.results.len(), "Unit aborted");
                self.emit(LifecycleEvent::Aborted { id: self.id });
                Ok(self.report(summary, duration))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.state = UnitState::Failed;
                error!(error = %message, "Unit failed");
                self.emit(LifecycleEvent::Error {
                    id: self.id,
                    parent_id: self.parent_id,
                    error: message.clone(),
                    duration_ms: duration.as_millis() as u64,
                });
                Err(self.failure(message, duration))
            }
        }
    }

    async fn run_pipeline(&mut self) -> PipelineEnd {
        let plan = self.decompose().await;
        self.steps = plan.steps.clone();
        debug!(steps = plan.len(), "Task decomposed");

        for (index, step) in plan.steps.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(next_step = index, "Cancellation observed");
                return PipelineEnd::Aborted;
            }
            let record = self.run_step(index, step, plan.hint(index)).await;
            self.record(record);
            self.memory.compact_if_needed();
        }

        // A cancel during the final step still wins over completion.
        if self.cancel.is_cancelled() {
            info!(next_step = plan.len(), "Cancellation observed");
            return PipelineEnd::Aborted;
        }
        PipelineEnd::Completed(self.summarize().await)
    }

    async fn decompose(&self) -> Decomposition {
        let context = AnalysisContext {
            unit_id: self.id,
            parent_id: self.parent_id,
            available_tools: self.tools.names(),
            facts: self.memory.long_term().clone(),
            extra: self.context.clone(),
        };
        match self.analyzer.decompose(&self.task, &context).await {
            Ok(plan) if !plan.is_empty() => plan,
            Ok(_) => {
                warn!(
                    analyzer = self.analyzer.name(),
                    "Analyzer returned no steps, using rule-based decomposition"
                );
                RuleBasedAnalyzer.plan(&self.task)
            }
            Err(e) => {
                warn!(
                    analyzer = self.analyzer.name(),
                    error = %e,
                    "Analyzer failed, using rule-based decomposition"
                );
                RuleBasedAnalyzer.plan(&self.task)
            }
        }
    }

    async fn run_step(&self, index: usize, step: &str, hint: Option<&str>) -> StepRecord {
        let started = Instant::now();
        let Some(tool) = select_tool(step, hint) else {
            warn!(step = index, "No tool matches step");
            return StepRecord {
                index,
                step: step.to_string(),
                tool: None,
                params: json!({}),
                result: ToolResult::error("no tool matches step").to_value(),
                success: false,
                duration_ms: started.elapsed().as_millis() as u64,
            };
        };

        let params = step_params(&tool, step);
        let context = ToolContext::new(
            self.id,
            self.parent_id,
            self.depth,
            self.config.clone(),
            self.cancel.clone(),
        )
        .with_task(self.task.as_str());
        debug!(step = index, tool = %tool, "Dispatching step");
        let result = self.tools.invoke(&tool, params.clone(), &context).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            ToolResult::Success(_) => {
                debug!(step = index, tool = %tool, duration_ms, "Step succeeded");
            }
            ToolResult::Error(e) => {
                warn!(step = index, tool = %tool, error = %e, "Step failed");
            }
        }

        StepRecord {
            index,
            step: step.to_string(),
            tool: Some(tool),
            params,
            success: result.is_success(),
            result: result.to_value(),
            duration_ms,
        }
    }

    fn record(&mut self, record: StepRecord) {
        let content = serde_json::to_string(&record).unwrap_or_default();
        self.memory.append(
            MessageDraft::tool(content)
                .with_kind(TOOL_RESULT_KIND)
                .with_metadata(json!({ "step": record.index })),
        );
        self.results.push(record);
    }

    async fn summarize(&self) -> String {
        let baseline = summarize_results(&self.results);
        let Some(summarizer) = &self.summarizer else {
            return baseline;
        };
        let request = SummaryRequest {
            task: &self.task,
            results: &self.results,
            baseline: &baseline,
        };
        match summarizer.refine(request).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => baseline,
            Err(e) => {
                warn!(error = %e, "Summary refinement failed, keeping baseline");
                baseline
            }
        }
    }

    fn emit(&self, event: LifecycleEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event);
        }
    }

    fn report(&self, summary: String, duration: Duration) -> UnitReport {
        UnitReport {
            id: self.id,
            parent_id: self.parent_id,
            task: self.task.clone(),
            steps: self.steps.clone(),
            results: self.results.clone(),
            summary,
            duration_ms: duration.as_millis() as u64,
            memory_usage: self.memory.usage(),
            state: self.state,
        }
    }

    fn failure(&self, error: String, duration: Duration) -> UnitFailure {
        UnitFailure {
            id: self.id,
            parent_id: self.parent_id,
            task: self.task.clone(),
            error,
            duration_ms: duration.as_millis() as u64,
            state: self.state,
        }
    }
}

impl Drop for TaskUnit {
    fn drop(&mut self) {
        if !self.state.is_terminal()
            && let Some(observer) = &self.observer
        {
            observer.on_dropped(self.id);
        }
    }
}

impl std::fmt::Debug for TaskUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskUnit")
            .field("id", &self.id)
            .field("parent_id", &self.parent_id)
            .field("depth", &self.depth)
            .field("task", &self.task)
            .field("state", &self.state)
            .field("analyzer", &self.analyzer.name())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("panicked: {detail}")
}

/// Assembles a [`TaskUnit`]. Missing collaborators default to the builtin
/// tool set and the rule-based analyzer.
pub struct TaskUnitBuilder {
    task: String,
    id: Option<UnitId>,
    parent_id: ParentId,
    depth: usize,
    config: UnitConfig,
    memory: Option<MemoryStore>,
    cancel: Option<CancellationToken>,
    tools: Option<Arc<ToolRegistry>>,
    analyzer: Option<Arc<dyn Analyzer>>,
    summarizer: Option<Arc<dyn Summarizer>>,
    observer: Option<Arc<dyn LifecycleObserver>>,
    context: Map<String, Value>,
}

impl TaskUnitBuilder {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            id: None,
            parent_id: ParentId::Root,
            depth: 0,
            config: UnitConfig::default(),
            memory: None,
            cancel: None,
            tools: None,
            analyzer: None,
            summarizer: None,
            observer: None,
            context: Map::new(),
        }
    }

    pub fn id(mut self, id: UnitId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn parent(mut self, parent_id: ParentId) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn config(mut self, config: UnitConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the fresh store built from `config.memory`.
    pub fn memory(mut self, memory: MemoryStore) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Extra data passed to the analyzer with the task.
    pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> TaskUnit {
        let memory = self
            .memory
            .unwrap_or_else(|| MemoryStore::with_config(self.config.memory.clone()));
        TaskUnit {
            id: self.id.unwrap_or_default(),
            parent_id: self.parent_id,
            depth: self.depth,
            task: self.task,
            context: self.context,
            state: UnitState::Created,
            config: self.config,
            memory,
            cancel: self.cancel.unwrap_or_default(),
            tools: self
                .tools
                .unwrap_or_else(|| Arc::new(ToolRegistry::builtin(&ToolAccess::all()))),
            analyzer: self
                .analyzer
                .unwrap_or_else(|| Arc::new(RuleBasedAnalyzer::new())),
            summarizer: self.summarizer,
            observer: self.observer,
            steps: Vec::new(),
            results: Vec::new(),
        }
    }
}
