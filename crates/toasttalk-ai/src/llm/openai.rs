//! OpenAI-compatible streaming chat completions provider

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AiError, Result};
use crate::http_client::build_http_client;
use crate::llm::client::{ByteStream, CompletionRequest, LlmClient, Message, Role};

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI client
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::with_http_client(build_http_client()?, api_key))
    }

    /// Create a client around an existing reqwest client
    pub fn with_http_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set custom base URL (for API-compatible services)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let messages: Vec<OpenAIMessage> = request.messages.iter().map(OpenAIMessage::from).collect();

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": true,
        });

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request.tools.iter().map(|t| t.to_function_value()).collect();
            body["tools"] = Value::Array(tools);
            body["tool_choice"] = Value::String("auto".to_string());
        }

        body
    }
}

#[derive(Serialize, Debug)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIMessageToolCall<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

#[derive(Serialize, Debug)]
struct OpenAIMessageToolCall<'a> {
    id: &'a str,
    r#type: &'static str,
    function: OpenAIMessageFunction<'a>,
}

#[derive(Serialize, Debug)]
struct OpenAIMessageFunction<'a> {
    name: &'a str,
    arguments: &'a str,
}

impl<'a> From<&'a Message> for OpenAIMessage<'a> {
    fn from(m: &'a Message) -> Self {
        let role = match m.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };

        let tool_calls = m.tool_calls.as_ref().map(|tcs| {
            tcs.iter()
                .map(|tc| OpenAIMessageToolCall {
                    id: &tc.id,
                    r#type: "function",
                    function: OpenAIMessageFunction {
                        name: &tc.name,
                        arguments: &tc.arguments,
                    },
                })
                .collect()
        });

        // Assistant turns that only carry tool calls send a null content.
        let content = if m.tool_calls.is_some() && m.content.is_empty() {
            None
        } else {
            Some(m.content.as_str())
        };

        Self {
            role,
            content,
            tool_calls,
            tool_call_id: m.tool_call_id.as_deref(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    fn provider(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_completion(&self, request: CompletionRequest) -> Result<ByteStream> {
        let body = self.request_body(&request);
        let url = format!("{}/chat/completions", self.base_url);

        tracing::debug!(
            category = "stream",
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending streamed completion request"
        );

        let mut builder = self
            .client
            .post(&url)
            .header("Accept", "text/event-stream")
            .json(&body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                category = "stream",
                status = status.as_u16(),
                "Completion request rejected"
            );
            return Err(AiError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let stream = response.bytes_stream().map(|chunk| match chunk {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) => Err(AiError::Stream(e.to_string())),
        });
        Ok(Box::pin(stream))
    }
}
