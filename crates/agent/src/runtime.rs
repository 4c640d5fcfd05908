use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};

use hrbot_core::config::AgentConfig;
use hrbot_core::domain::message::validate_ordering;
use hrbot_core::{ApplicationError, BackingStore, DomainError, Message, ThreadId, ToolCall};
use hrbot_db::ConversationMemory;

use crate::llm::{ChatRequest, LlmClient};
use crate::tools::{ToolError, ToolRegistry};

const SYSTEM_PROMPT: &str = "You are a helpful HR AI assistant with access to an employee database. \n\
Use the provided tools to search for employee information and answer questions accurately.\n\
If you need to look up employee information, use the employee_lookup tool.\n\
Always provide helpful, accurate responses based on the data you find.\n\
You have access to the following tools: {tool_names}.\n\
Current time: {time}.";

pub fn system_prompt(tool_names: &[&str], now: DateTime<Utc>) -> String {
    SYSTEM_PROMPT
        .replace("{tool_names}", &tool_names.join(", "))
        .replace("{time}", &now.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentSettings {
    /// Maximum model invocations per turn.
    pub max_steps: usize,
    pub call_timeout: Duration,
}

impl From<&AgentConfig> for AgentSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            max_steps: config.max_steps,
            call_timeout: Duration::from_secs(config.call_timeout_secs),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AgentResponse {
    pub content: String,
    pub messages: Vec<Message>,
}

enum TurnState {
    Thinking,
    AwaitingToolResults(Vec<ToolCall>),
    Done,
}

/// The agent loop bound to one backing store: its conversation memory and
/// the tools searching that store's employee index.
pub struct AgentRuntime {
    store: BackingStore,
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    memory: Arc<dyn ConversationMemory>,
    settings: AgentSettings,
}

impl AgentRuntime {
    pub fn new(
        store: BackingStore,
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        memory: Arc<dyn ConversationMemory>,
        settings: AgentSettings,
    ) -> Self {
        Self { store, llm, tools, memory, settings }
    }

    pub fn store(&self) -> BackingStore {
        self.store
    }

    pub async fn holds_thread(&self, thread_id: &ThreadId) -> Result<bool, ApplicationError> {
        self.bounded("conversation memory", self.memory.contains(thread_id)).await
    }

    /// Runs one turn. Nothing is persisted unless the model reaches a final answer.
    pub async fn execute(
        &self,
        query: &str,
        thread_id: &ThreadId,
    ) -> Result<AgentResponse, ApplicationError> {
        if query.trim().is_empty() {
            let violation = DomainError::InvariantViolation("query must not be empty".to_string());
            return Err(violation.into());
        }

        info!(
            event_name = "agent.turn.started",
            thread_id = %thread_id,
            database_type = %self.store,
            "agent turn started"
        );

        let mut messages =
            self.bounded("conversation memory", self.memory.load(thread_id)).await?;
        messages.push(Message::user(query));

        let schemas = self.tools.schemas();
        let tool_names = self.tools.names();
        let mut steps = 0;
        let mut state = TurnState::Thinking;

        loop {
            state = match state {
                TurnState::Thinking => {
                    steps += 1;
                    let system = system_prompt(&tool_names, Utc::now());
                    let request =
                        ChatRequest { system: &system, messages: &messages, tools: &schemas };
                    let reply = self.bounded("language model", self.llm.chat(&request)).await?;

                    let calls = reply.tool_calls.clone();
                    messages.push(reply);
                    if calls.is_empty() {
                        TurnState::Done
                    } else {
                        TurnState::AwaitingToolResults(calls)
                    }
                }
                TurnState::AwaitingToolResults(calls) => {
                    if steps >= self.settings.max_steps {
                        warn!(
                            event_name = "agent.turn.ceiling_exceeded",
                            thread_id = %thread_id,
                            database_type = %self.store,
                            max_steps = self.settings.max_steps,
                            "model kept requesting tools past the step ceiling"
                        );
                        return Err(ApplicationError::TurnCeilingExceeded {
                            max_steps: self.settings.max_steps,
                        });
                    }
                    for call in &calls {
                        let observation = self.run_tool(call).await?;
                        messages.push(Message::tool_result(call, observation));
                    }
                    TurnState::Thinking
                }
                TurnState::Done => break,
            };
        }

        if let Err(violation) = validate_ordering(&messages) {
            warn!(
                event_name = "agent.turn.malformed_history",
                thread_id = %thread_id,
                database_type = %self.store,
                error = %violation,
                "model produced a history that cannot be persisted"
            );
            return Err(ApplicationError::dependency("language model", violation.to_string()));
        }
        self.bounded("conversation memory", self.memory.save(thread_id, &messages)).await?;

        info!(
            event_name = "agent.turn.completed",
            thread_id = %thread_id,
            database_type = %self.store,
            steps,
            history_len = messages.len(),
            "agent turn completed"
        );

        let content = messages.last().map(|message| message.content.clone()).unwrap_or_default();
        Ok(AgentResponse { content, messages })
    }

    /// Unknown tools and bad arguments are the model's mistake: they come back
    /// as an error observation. Search failures end the turn.
    async fn run_tool(&self, call: &ToolCall) -> Result<String, ApplicationError> {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(
                event_name = "agent.tool.unknown",
                tool = %call.name,
                tool_call_id = %call.id,
                "model requested an unknown tool"
            );
            return Ok(format!(
                "Error: unknown tool `{}`. Available tools: {}.",
                call.name,
                self.tools.names().join(", ")
            ));
        };

        info!(
            event_name = "agent.tool.invoked",
            tool = %call.name,
            tool_call_id = %call.id,
            "invoking tool"
        );
        match tokio::time::timeout(self.settings.call_timeout, tool.invoke(&call.arguments)).await {
            Ok(Ok(observation)) => Ok(observation),
            Ok(Err(ToolError::InvalidArguments(message))) => {
                warn!(
                    event_name = "agent.tool.invalid_arguments",
                    tool = %call.name,
                    tool_call_id = %call.id,
                    error = %message,
                    "tool arguments rejected"
                );
                Ok(format!("Error: {message}"))
            }
            Ok(Err(error)) => Err(error.into()),
            Err(_) => Err(self.timed_out("vector search")),
        }
    }

    async fn bounded<T, E, F>(
        &self,
        dependency: &'static str,
        call: F,
    ) -> Result<T, ApplicationError>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        match tokio::time::timeout(self.settings.call_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(ApplicationError::dependency(dependency, error.to_string())),
            Err(_) => Err(self.timed_out(dependency)),
        }
    }

    fn timed_out(&self, dependency: &'static str) -> ApplicationError {
        ApplicationError::dependency(
            dependency,
            format!("timed out after {}s", self.settings.call_timeout.as_secs()),
        )
    }
}
