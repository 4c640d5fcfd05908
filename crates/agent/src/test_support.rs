use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use hrbot_core::{BackingStore, Message, ThreadId, ToolCall};
use hrbot_db::repositories::{ConversationMemory, InMemoryConversationMemory};
use hrbot_db::{RepositoryError, VectorSearch};

use crate::llm::{ChatRequest, LlmClient, LlmError};
use crate::runtime::{AgentRuntime, AgentSettings};
use crate::tools::{EmployeeLookupTool, ToolRegistry};

/// Replays queued assistant replies and records what it was asked.
#[derive(Default)]
pub(crate) struct ScriptedLlm {
    replies: Mutex<VecDeque<Message>>,
    repeat_tool_call: bool,
    delay: Option<Duration>,
    seen: Mutex<Vec<(String, usize)>>,
}

impl ScriptedLlm {
    pub(crate) fn new(replies: Vec<Message>) -> Self {
        Self { replies: Mutex::new(replies.into()), ..Self::default() }
    }

    /// A model that never stops asking for the lookup tool.
    pub(crate) fn always_calls_tool() -> Self {
        Self { repeat_tool_call: true, ..Self::default() }
    }

    /// Holds every reply back by `delay`, keeping a turn in flight.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) async fn invocations(&self) -> usize {
        self.seen.lock().await.len()
    }

    pub(crate) async fn seen(&self) -> Vec<(String, usize)> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<Message, LlmError> {
        let mut seen = self.seen.lock().await;
        seen.push((request.system.to_string(), request.messages.len()));
        let step = seen.len();
        drop(seen);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.repeat_tool_call {
            let call = lookup_call(&format!("toolu_{step}"), "engineers");
            return Ok(Message::assistant("", vec![call]));
        }
        self.replies
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| LlmError::Decode("script exhausted".to_string()))
    }
}

pub(crate) fn lookup_call(id: &str, query: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: "employee_lookup".to_string(),
        arguments: json!({ "query": query }),
    }
}

/// Vector search returning a canned payload.
pub(crate) struct FixedSearch {
    payload: Option<String>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl FixedSearch {
    pub(crate) fn new(payload: &str) -> Self {
        Self { payload: Some(payload.to_string()), calls: Mutex::new(Vec::new()) }
    }

    pub(crate) fn failing() -> Self {
        Self { payload: None, calls: Mutex::new(Vec::new()) }
    }

    pub(crate) async fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl VectorSearch for FixedSearch {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<String, RepositoryError> {
        self.calls.lock().await.push((query.to_string(), k));
        self.payload.clone().ok_or_else(|| RepositoryError::Decode("index unavailable".to_string()))
    }
}

pub(crate) fn settings() -> AgentSettings {
    AgentSettings { max_steps: 15, call_timeout: Duration::from_secs(5) }
}

/// Memory whose backing store cannot be reached.
pub(crate) struct UnreachableMemory;

#[async_trait]
impl ConversationMemory for UnreachableMemory {
    async fn load(&self, _thread_id: &ThreadId) -> Result<Vec<Message>, RepositoryError> {
        Err(RepositoryError::Decode("store unreachable".to_string()))
    }

    async fn save(
        &self,
        _thread_id: &ThreadId,
        _messages: &[Message],
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Decode("store unreachable".to_string()))
    }

    async fn contains(&self, _thread_id: &ThreadId) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Decode("store unreachable".to_string()))
    }
}

pub(crate) fn runtime_over(
    store: BackingStore,
    llm: Arc<ScriptedLlm>,
    memory: Arc<dyn ConversationMemory>,
    settings: AgentSettings,
) -> AgentRuntime {
    let mut tools = ToolRegistry::default();
    tools.register(EmployeeLookupTool::new(Arc::new(FixedSearch::new("[]"))));
    AgentRuntime::new(store, llm, tools, memory, settings)
}

pub(crate) fn runtime_with(
    store: BackingStore,
    llm: Arc<ScriptedLlm>,
    memory: Arc<InMemoryConversationMemory>,
    settings: AgentSettings,
) -> AgentRuntime {
    runtime_over(store, llm, memory, settings)
}
