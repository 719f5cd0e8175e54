//! The `Task` tool: nested units through the ordinary tool contract.

use std::sync::Weak;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::{ExecutionManager, Inner, TaskRequest};
use crate::tools::{ParamType, Tool, ToolContext, ToolError, ToolResult, ToolSchema};
use crate::unit::{ParentId, UnitOutcome, UnitReport};

pub const TASK_TOOL_NAME: &str = "Task";

/// Creates a child unit of the calling unit and runs it to completion.
///
/// The child inherits the caller's config and a child of its cancellation
/// token, so aborting the parent also aborts the child. With `subtasks`,
/// each entry becomes a sibling child and they run as one batch bounded by
/// the caller's `max_concurrency`.
///
/// The call fails unless every child completes with no failed step. A child
/// task equal to the caller's own task is refused before anything is created.
pub struct TaskTool {
    manager: Weak<Inner>,
}

impl TaskTool {
    pub(super) fn new(manager: Weak<Inner>) -> Self {
        Self { manager }
    }

    fn request(&self, task: String, context: &ToolContext) -> TaskRequest {
        TaskRequest::new(task)
            .with_parent(ParentId::Unit(context.unit_id()))
            .with_depth(context.depth() + 1)
            .with_config(context.config().clone())
            .with_cancellation(context.cancellation_token().child_token())
    }
}

/// Case and whitespace insensitive, so a step cannot hand its caller's own
/// task back to a fresh unit.
fn same_task(a: &str, b: &str) -> bool {
    let words = |s: &str| s.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>();
    words(a) == words(b)
}

/// Completed with every step succeeding.
fn fully_succeeded(report: &UnitReport) -> bool {
    report.is_completed() && report.failed() == 0
}

fn report_value(report: &UnitReport) -> Value {
    json!({
        "unit_id": report.id,
        "state": report.state,
        "summary": report.summary,
        "steps": report.steps.len(),
        "succeeded": report.succeeded(),
        "failed": report.failed(),
    })
}

fn outcome_value(outcome: &UnitOutcome) -> Value {
    match outcome {
        Ok(report) => report_value(report),
        Err(failure) => json!({
            "unit_id": failure.id,
            "state": failure.state,
            "error": failure.error,
        }),
    }
}

#[async_trait]
impl Tool for TaskTool {
    fn name(&self) -> &str {
        TASK_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Run a task, or a batch of subtasks, as nested units and report their summaries"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .required("task", ParamType::String, "Task for the nested unit")
            .optional(
                "subtasks",
                ParamType::Array,
                "Independent tasks to run concurrently instead of `task`",
            )
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let Some(inner) = self.manager.upgrade() else {
            return ToolError::execution_failed("execution manager is no longer running").into();
        };
        let manager = ExecutionManager::from_inner(inner);

        let depth = context.depth() + 1;
        let max_depth = context.config().max_depth;
        if depth > max_depth {
            return ToolError::permission_denied(format!(
                "nesting depth {depth} exceeds the limit of {max_depth}"
            ))
            .into();
        }

        let task = params["task"].as_str().unwrap_or_default().trim().to_string();
        let subtasks: Vec<String> = params
            .get("subtasks")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let children = if subtasks.is_empty() {
            std::slice::from_ref(&task)
        } else {
            subtasks.as_slice()
        };
        let caller = context.task();
        if let Some(repeated) = children
            .iter()
            .find(|t| !caller.is_empty() && same_task(t, caller))
        {
            return ToolError::invalid_input(format!(
                "nested task repeats the calling unit's task: {repeated}"
            ))
            .into();
        }

        if subtasks.is_empty() {
            debug!(parent = %context.unit_id(), depth, "Spawning nested unit");
            let unit = match manager.create(self.request(task, context)) {
                Ok(unit) => unit,
                Err(e) => return ToolError::execution_failed(e.to_string()).into(),
            };
            return match manager.run(unit).await {
                Ok(report) if fully_succeeded(&report) => {
                    ToolResult::success(report_value(&report))
                }
                Ok(report) => ToolError::execution_failed(format!(
                    "nested unit {}: {}",
                    report.id, report.summary
                ))
                .into(),
                Err(failure) => ToolError::execution_failed(failure.error).into(),
            };
        }

        let requested = subtasks.len();
        debug!(parent = %context.unit_id(), depth, requested, "Spawning nested batch");
        let requests = subtasks
            .into_iter()
            .map(|subtask| self.request(subtask, context))
            .collect();
        let outcomes = manager
            .run_batch(requests, context.config().max_concurrency)
            .await;

        let completed = outcomes
            .iter()
            .filter(|o| o.as_ref().is_ok_and(fully_succeeded))
            .count();
        if completed < requested {
            return ToolError::execution_failed(format!(
                "{} of {requested} subtasks did not complete cleanly ({} created)",
                requested - completed,
                outcomes.len()
            ))
            .into();
        }
        ToolResult::success(json!({
            "task": task,
            "subtasks": outcomes.iter().map(outcome_value).collect::<Vec<_>>(),
        }))
    }
}
