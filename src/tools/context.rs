//! Execution context handed to every tool call.

use std::path::{Component, Path, PathBuf};

use tokio_util::sync::CancellationToken;

use super::error::ToolError;
use crate::unit::{ParentId, UnitConfig, UnitId};

/// Who is calling a tool and under which limits.
///
/// Tools read the sandbox flag and working directory from here; the Task
/// tool also reads the caller's identity, nesting depth and config so a
/// nested unit inherits them.
#[derive(Clone, Debug)]
pub struct ToolContext {
    unit_id: UnitId,
    parent_id: ParentId,
    depth: usize,
    config: UnitConfig,
    cancel: CancellationToken,
    task: String,
}

impl ToolContext {
    pub fn new(
        unit_id: UnitId,
        parent_id: ParentId,
        depth: usize,
        config: UnitConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            unit_id,
            parent_id,
            depth,
            config,
            cancel,
            task: String::new(),
        }
    }

    /// Context for calling tools outside any unit.
    pub fn detached(working_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            UnitId::new(),
            ParentId::Root,
            0,
            UnitConfig::default().with_working_dir(working_dir),
            CancellationToken::new(),
        )
    }

    /// Records the calling unit's task text.
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = task.into();
        self
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    pub fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    pub fn parent_id(&self) -> ParentId {
        self.parent_id
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Task text of the calling unit; empty outside a unit.
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn config(&self) -> &UnitConfig {
        &self.config
    }

    pub fn working_dir(&self) -> &Path {
        &self.config.working_dir
    }

    pub fn is_sandboxed(&self) -> bool {
        self.config.sandbox
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token of the calling unit; nested work should use a child of it.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Resolves `input` against the working directory.
    ///
    /// With the sandbox on, paths that leave the working directory after
    /// lexical normalization are refused.
    pub fn resolve(&self, input: &str) -> Result<PathBuf, ToolError> {
        let raw = Path::new(input);
        let joined = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.working_dir().join(raw)
        };
        let resolved = normalize(&joined);

        if self.is_sandboxed() && !resolved.starts_with(normalize(self.working_dir())) {
            return Err(ToolError::security_violation(format!(
                "{} is outside the working directory",
                input
            )));
        }
        Ok(resolved)
    }

    pub fn resolve_or_root(&self, input: Option<&str>) -> Result<PathBuf, ToolError> {
        match input {
            Some(path) if !path.trim().is_empty() => self.resolve(path),
            _ => Ok(normalize(self.working_dir())),
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
