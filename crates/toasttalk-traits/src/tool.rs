//! Tool trait and types for model-invocable tools.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::Result;

/// JSON Schema for tool parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value, // JSON Schema object
}

impl ToolSchema {
    /// Render as an entry of the `tools` array of a chat completion request.
    pub fn to_function_value(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// A tool invocation reconstructed from a streamed response.
///
/// `arguments` is the raw accumulated JSON text; it is only parsed when the
/// registry executes the call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCallRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Result of tool execution.
///
/// `result` is what goes back into the conversation. `presentation` carries
/// the full, unsimplified payload for a display layer; it never enters the
/// conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub result: Value,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation: Option<Value>,
}

impl ToolOutput {
    /// Create a successful tool output.
    pub fn success(result: Value) -> Self {
        Self {
            success: true,
            result,
            error: None,
            presentation: None,
        }
    }

    /// Create an error tool output.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: Value::Null,
            error: Some(message.into()),
            presentation: None,
        }
    }

    pub fn with_presentation(mut self, payload: Value) -> Self {
        self.presentation = Some(payload);
        self
    }

    /// Text placed in the tool-role turn for this output.
    pub fn conversation_content(&self) -> String {
        if self.success {
            serde_json::to_string(&self.result).unwrap_or_else(|_| "{}".to_string())
        } else {
            format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("tool reported failure")
            )
        }
    }
}

/// Core trait for model-invocable tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name (used in function calls).
    fn name(&self) -> &str;

    /// Human-readable description for the model.
    fn description(&self) -> &str;

    /// JSON Schema for input parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with an already-parsed JSON object.
    async fn execute(&self, input: Value) -> Result<ToolOutput>;

    /// Build complete schema for the model.
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

pub type ToolFuture = Pin<Box<dyn Future<Output = Result<ToolOutput>> + Send + 'static>>;
pub type ToolExecutor = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// A tool assembled from a name, description, schema and executor closure.
#[derive(Clone)]
pub struct FnTool {
    name: String,
    description: String,
    parameters: Value,
    executor: ToolExecutor,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        executor: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutput>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            executor: Arc::new(move |input| Box::pin(executor(input))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.parameters.clone()
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        (self.executor)(input).await
    }
}
