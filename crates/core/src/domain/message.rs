use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A tool invocation requested by the model inside an assistant message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// One entry of a thread's history. Messages are immutable once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn tool_result(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call.id.clone()),
            tool_name: Some(call.name.clone()),
        }
    }

    pub fn requests_tools(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// Checks that every tool call is answered by a `tool` message, in the same
/// batch, before the next assistant or user message appears.
pub fn validate_ordering(messages: &[Message]) -> Result<(), DomainError> {
    let mut pending: HashSet<&str> = HashSet::new();

    for (index, message) in messages.iter().enumerate() {
        match message.role {
            Role::Tool => {
                let Some(call_id) = message.tool_call_id.as_deref() else {
                    return Err(DomainError::InvariantViolation(format!(
                        "tool message at position {index} has no tool_call_id"
                    )));
                };
                if !pending.remove(call_id) {
                    return Err(DomainError::InvariantViolation(format!(
                        "tool message at position {index} answers unknown call `{call_id}`"
                    )));
                }
            }
            Role::User | Role::Assistant => {
                if !pending.is_empty() {
                    return Err(DomainError::InvariantViolation(format!(
                        "message at position {index} arrived before {} tool call(s) were answered",
                        pending.len()
                    )));
                }
                if message.role == Role::Assistant {
                    pending.extend(message.tool_calls.iter().map(|call| call.id.as_str()));
                }
            }
        }
    }

    if pending.is_empty() {
        Ok(())
    } else {
        Err(DomainError::InvariantViolation(format!(
            "history ends with {} unanswered tool call(s)",
            pending.len()
        )))
    }
}
