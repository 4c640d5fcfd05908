use std::collections::HashMap;

use tokio::sync::RwLock;

use hrbot_core::domain::message::Message;
use hrbot_core::domain::thread::ThreadId;

use super::{ConversationMemory, RepositoryError};

/// Process-local memory used by tests and single-process tooling.
#[derive(Default)]
pub struct InMemoryConversationMemory {
    threads: RwLock<HashMap<String, Vec<Message>>>,
}

#[async_trait::async_trait]
impl ConversationMemory for InMemoryConversationMemory {
    async fn load(&self, thread_id: &ThreadId) -> Result<Vec<Message>, RepositoryError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id.as_str()).cloned().unwrap_or_default())
    }

    async fn save(
        &self,
        thread_id: &ThreadId,
        messages: &[Message],
    ) -> Result<(), RepositoryError> {
        let mut threads = self.threads.write().await;
        threads.insert(thread_id.as_str().to_string(), messages.to_vec());
        Ok(())
    }

    async fn contains(&self, thread_id: &ThreadId) -> Result<bool, RepositoryError> {
        let threads = self.threads.read().await;
        Ok(threads.contains_key(thread_id.as_str()))
    }
}
