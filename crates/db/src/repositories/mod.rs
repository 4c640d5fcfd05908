use async_trait::async_trait;
use thiserror::Error;

use hrbot_core::domain::message::Message;
use hrbot_core::domain::thread::ThreadId;
use hrbot_core::EmbeddingError;

pub mod conversation;
pub mod memory;
pub mod mongo_conversation;

pub use conversation::SqlConversationMemory;
pub use memory::InMemoryConversationMemory;
pub use mongo_conversation::MongoConversationMemory;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Durable, thread-keyed message history.
///
/// `save` replaces the whole history of a thread in one atomic write; callers
/// never append incrementally through this interface.
#[async_trait]
pub trait ConversationMemory: Send + Sync {
    /// Returns the stored history, or an empty vec for an unseen thread.
    async fn load(&self, thread_id: &ThreadId) -> Result<Vec<Message>, RepositoryError>;

    async fn save(&self, thread_id: &ThreadId, messages: &[Message])
        -> Result<(), RepositoryError>;

    async fn contains(&self, thread_id: &ThreadId) -> Result<bool, RepositoryError>;
}
