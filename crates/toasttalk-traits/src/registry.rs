//! Tool registry for managing available tools

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, ToolError};
use crate::tool::{Tool, ToolCallRecord, ToolOutput, ToolSchema};

/// Registry for managing available tools.
///
/// Populated once at startup and shared behind an `Arc`; after that it is
/// only read, so concurrent conversations can execute through it freely.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. A later registration under the same name wins.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    /// Register a tool from Arc
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::debug!(tool = %name, category = "tool", "Replaced previously registered tool");
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if tool exists
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all tool names, sorted
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get schemas for all registered tools, ordered by name so outbound
    /// requests are stable.
    pub fn describe(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Execute a tool by name with a parsed input
    pub async fn execute(&self, name: &str, input: Value) -> Result<ToolOutput> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(input).await
    }

    /// Execute a finalized tool call: look the tool up, parse its raw
    /// argument text into a JSON object, then invoke it.
    pub async fn execute_call(&self, call: &ToolCallRecord) -> Result<ToolOutput> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        let input = parse_arguments(&call.arguments)?;

        tracing::info!(
            tool = %call.name,
            call_id = %call.id,
            category = "tool",
            "Executing tool call"
        );

        match tool.execute(input).await {
            Ok(output) => Ok(output),
            // Typed input structs reject well-formed JSON with the wrong shape.
            Err(ToolError::Json(e)) => Err(ToolError::InvalidArguments(e.to_string())),
            Err(err) => Err(err),
        }
    }
}

/// Parse accumulated argument text. Blank text is treated as an empty
/// object, since models emit nothing for parameterless tools.
fn parse_arguments(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(ToolError::InvalidArguments(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ToolError::InvalidArguments(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
