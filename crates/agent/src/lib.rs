//! Agent runtime for the HR assistant.
//!
//! One chat turn flows through:
//! 1. **Routing** (`router`) - pick the runtime bound to the requested backing store,
//!    serialise turns per thread and reject threads owned by another store
//! 2. **Agent loop** (`runtime`) - alternate language-model calls and tool calls until
//!    the model answers without requesting tools, bounded by a step ceiling
//! 3. **Tools** (`tools`) - schema-validated callables the model may request
//! 4. **Persistence** - the full history is written back through `ConversationMemory`
//!
//! The language model and the embedding provider are reached over HTTP (`llm`,
//! `embeddings`); both sit behind traits so tests can script them.

pub mod embeddings;
pub mod llm;
pub mod router;
pub mod runtime;
pub mod tools;

pub use embeddings::OpenAiEmbedder;
pub use llm::{AnthropicClient, ChatRequest, LlmClient, LlmError};
pub use router::{AgentRouter, ThreadOrigin};
pub use runtime::{AgentResponse, AgentRuntime, AgentSettings};
pub use tools::{EmployeeLookupTool, Tool, ToolError, ToolRegistry, ToolSchema};

#[cfg(test)]
pub(crate) mod test_support;
