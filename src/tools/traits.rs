//! Tool trait definitions.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::context::ToolContext;
use super::result::ToolResult;
use super::schema::ToolSchema;

/// Tool description handed to model-backed analyzers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// A named, schema-validated operation invoked by a step.
///
/// Callers validate `params` against [`schema`](Tool::schema) before
/// `execute` runs; the registry does this in [`ToolRegistry::invoke`](super::ToolRegistry::invoke).
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> ToolSchema;
    async fn execute(&self, params: serde_json::Value, context: &ToolContext) -> ToolResult;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.schema().to_json_schema(),
        }
    }
}

/// Tool with a typed input whose schema is derived via schemars.
#[async_trait]
pub trait TypedTool: Send + Sync {
    type Input: JsonSchema + DeserializeOwned + Send;
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    async fn handle(&self, input: Self::Input, context: &ToolContext) -> ToolResult;

    fn input_schema() -> ToolSchema {
        let schema = schemars::schema_for!(Self::Input);
        let value =
            serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}));
        ToolSchema::from_json_schema(&value)
    }
}

#[async_trait]
impl<T: TypedTool + 'static> Tool for T {
    fn name(&self) -> &str {
        T::NAME
    }

    fn description(&self) -> &str {
        T::DESCRIPTION
    }

    fn schema(&self) -> ToolSchema {
        T::input_schema()
    }

    async fn execute(&self, params: serde_json::Value, context: &ToolContext) -> ToolResult {
        match serde_json::from_value::<T::Input>(params) {
            Ok(typed) => TypedTool::handle(self, typed, context).await,
            Err(e) => ToolResult::Error(super::ToolError::invalid_input(e.to_string())),
        }
    }
}
