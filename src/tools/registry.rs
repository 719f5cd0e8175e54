//! Tool registry.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::access::ToolAccess;
use super::context::ToolContext;
use super::error::ToolError;
use super::result::ToolResult;
use super::traits::{Tool, ToolDefinition};

/// Named tools available to task units.
///
/// Constructed explicitly and handed to the execution manager; there is no
/// process-wide registry.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the builtin file, command and search tools permitted by `access`.
    pub fn builtin(access: &ToolAccess) -> Self {
        let all_tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(super::ReadTool),
            Arc::new(super::WriteTool),
            Arc::new(super::EditTool),
            Arc::new(super::GrepTool),
            Arc::new(super::BashTool),
        ];

        let mut registry = Self::new();
        for tool in all_tools {
            if access.is_allowed(tool.name()) {
                registry.register(tool);
            }
        }
        registry
    }

    /// Registers a tool, returning any tool it replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        self.tools.insert(tool.name().to_string(), tool)
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(Arc::new(tool));
        self
    }

    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<_> = self.tools.values().map(|t| t.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub fn filtered(&self, access: &ToolAccess) -> Self {
        Self {
            tools: self
                .tools
                .iter()
                .filter(|(name, _)| access.is_allowed(name))
                .map(|(name, tool)| (name.clone(), Arc::clone(tool)))
                .collect(),
        }
    }

    pub fn validate(&self, name: &str, params: &Value) -> Result<(), ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::unknown_tool(name))?;
        tool.schema().validate(params)
    }

    /// Validates `params` and runs the tool. Validation failures never reach the tool.
    pub async fn invoke(&self, name: &str, params: Value, context: &ToolContext) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            return ToolError::unknown_tool(name).into();
        };
        if let Err(e) = tool.schema().validate(&params) {
            return e.into();
        }
        tool.execute(params, context).await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
