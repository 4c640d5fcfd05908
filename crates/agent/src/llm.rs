use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

use hrbot_core::config::LlmConfig;
use hrbot_core::{Message, Role, ToolCall};

use crate::tools::ToolSchema;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One model invocation: fixed instruction, ordered history, available tools.
#[derive(Clone, Copy, Debug)]
pub struct ChatRequest<'a> {
    pub system: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a [ToolSchema],
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid provider response: {0}")]
    Decode(String),
}

impl LlmError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

/// Chat-completion with tool calling. Returns exactly one assistant message.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<Message, LlmError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, base_delay_ms: 500, max_delay_ms: 8_000 }
    }
}

impl RetryPolicy {
    /// Exponential backoff capped at `max_delay_ms`, plus up to 50% jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        let jitter_ms = rand::thread_rng().gen_range(0..=delay_ms / 2);
        Duration::from_millis(delay_ms + jitter_ms)
    }
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl AnthropicClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: RetryPolicy { max_retries: config.max_retries, ..RetryPolicy::default() },
        })
    }

    pub fn request_body(&self, request: &ChatRequest<'_>) -> Value {
        let tools = request
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.input_schema,
                })
            })
            .collect::<Vec<_>>();

        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "system": request.system,
            "messages": encode_messages(request.messages),
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools);
        }
        body
    }

    async fn send_once(&self, body: &Value) -> Result<Message, LlmError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let payload: Value = response.json().await.map_err(|e| LlmError::Decode(e.to_string()))?;
        decode_response(&payload)
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<Message, LlmError> {
        let body = self.request_body(request);
        let mut attempt = 0;
        loop {
            match self.send_once(&body).await {
                Ok(message) => return Ok(message),
                Err(error) if error.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        event_name = "agent.llm.retry",
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying language model call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Maps history onto Anthropic turns. Consecutive tool results are folded into
/// one user turn so every `tool_use` block is answered in the very next message.
fn encode_messages(messages: &[Message]) -> Vec<Value> {
    let mut encoded = Vec::with_capacity(messages.len());
    let mut pending_results: Vec<Value> = Vec::new();

    for message in messages {
        if message.role != Role::Tool && !pending_results.is_empty() {
            encoded.push(json!({ "role": "user", "content": std::mem::take(&mut pending_results) }));
        }

        match message.role {
            Role::User => {
                encoded.push(json!({
                    "role": "user",
                    "content": [{ "type": "text", "text": message.content }],
                }));
            }
            Role::Assistant => {
                let mut blocks = Vec::new();
                if !message.content.is_empty() {
                    blocks.push(json!({ "type": "text", "text": message.content }));
                }
                for call in &message.tool_calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.name,
                        "input": call.arguments,
                    }));
                }
                if !blocks.is_empty() {
                    encoded.push(json!({ "role": "assistant", "content": blocks }));
                }
            }
            Role::Tool => {
                pending_results.push(json!({
                    "type": "tool_result",
                    "tool_use_id": message.tool_call_id.as_deref().unwrap_or_default(),
                    "content": message.content,
                }));
            }
        }
    }

    if !pending_results.is_empty() {
        encoded.push(json!({ "role": "user", "content": pending_results }));
    }
    encoded
}

fn decode_response(payload: &Value) -> Result<Message, LlmError> {
    let blocks = payload
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::Decode("missing content blocks".to_string()))?;

    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();
    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(Value::as_str) {
                    text_parts.push(text);
                }
            }
            Some("tool_use") => {
                let id = block.get("id").and_then(Value::as_str).unwrap_or_default();
                let name = block.get("name").and_then(Value::as_str).unwrap_or_default();
                if id.is_empty() || name.is_empty() {
                    return Err(LlmError::Decode("tool_use block without id or name".to_string()));
                }
                tool_calls.push(ToolCall {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments: block.get("input").cloned().unwrap_or_else(|| json!({})),
                });
            }
            _ => {}
        }
    }

    Ok(Message::assistant(text_parts.join(""), tool_calls))
}
