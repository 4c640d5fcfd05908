use mongodb::bson::{self, doc, DateTime};
use mongodb::Collection;
use serde::{Deserialize, Serialize};

use hrbot_core::domain::message::Message;
use hrbot_core::domain::thread::ThreadId;

use super::{ConversationMemory, RepositoryError};
use crate::MongoHandle;

#[derive(Debug, Serialize, Deserialize)]
struct StoredThread {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    messages: Vec<Message>,
}

/// MongoDB-backed memory: one document per thread holding the full history.
/// Single-document upserts are atomic, so a save never leaves a partial
/// history behind.
pub struct MongoConversationMemory {
    threads: Collection<StoredThread>,
}

impl MongoConversationMemory {
    pub fn new(handle: &MongoHandle, collection: &str) -> Self {
        Self { threads: handle.database().collection(collection) }
    }
}

#[async_trait::async_trait]
impl ConversationMemory for MongoConversationMemory {
    async fn load(&self, thread_id: &ThreadId) -> Result<Vec<Message>, RepositoryError> {
        let stored = self.threads.find_one(doc! { "_id": thread_id.as_str() }).await?;
        Ok(stored.map(|thread| thread.messages).unwrap_or_default())
    }

    async fn save(
        &self,
        thread_id: &ThreadId,
        messages: &[Message],
    ) -> Result<(), RepositoryError> {
        let messages = bson::to_bson(messages).map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let now = DateTime::now();

        self.threads
            .update_one(
                doc! { "_id": thread_id.as_str() },
                doc! {
                    "$set": { "messages": messages, "updated_at": now },
                    "$setOnInsert": { "created_at": now },
                },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn contains(&self, thread_id: &ThreadId) -> Result<bool, RepositoryError> {
        let count = self.threads.count_documents(doc! { "_id": thread_id.as_str() }).await?;
        Ok(count > 0)
    }
}
