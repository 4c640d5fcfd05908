use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};

use hrbot_core::domain::message::Message;
use hrbot_core::domain::thread::ThreadId;

use super::{ConversationMemory, RepositoryError};
use crate::DbPool;

/// Postgres-backed memory: one row per thread, one row per message keyed by
/// `(thread_id, seq)`. A save rewrites the message rows inside a transaction
/// that holds the thread row lock.
pub struct SqlConversationMemory {
    pool: DbPool,
}

impl SqlConversationMemory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn encode_message(message: &Message) -> Result<Value, RepositoryError> {
    serde_json::to_value(message).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn decode_message(payload: Value) -> Result<Message, RepositoryError> {
    serde_json::from_value(payload).map_err(|e| RepositoryError::Decode(e.to_string()))
}

#[async_trait::async_trait]
impl ConversationMemory for SqlConversationMemory {
    async fn load(&self, thread_id: &ThreadId) -> Result<Vec<Message>, RepositoryError> {
        let payloads: Vec<Value> = sqlx::query_scalar(
            "SELECT payload FROM conversation_message WHERE thread_id = $1 ORDER BY seq ASC",
        )
        .bind(thread_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        payloads.into_iter().map(decode_message).collect()
    }

    async fn save(
        &self,
        thread_id: &ThreadId,
        messages: &[Message],
    ) -> Result<(), RepositoryError> {
        let payloads = messages.iter().map(encode_message).collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO conversation_thread (thread_id, created_at, updated_at)
             VALUES ($1, now(), now())
             ON CONFLICT (thread_id) DO UPDATE SET updated_at = now()",
        )
        .bind(thread_id.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM conversation_message WHERE thread_id = $1")
            .bind(thread_id.as_str())
            .execute(&mut *tx)
            .await?;

        if !messages.is_empty() {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO conversation_message (thread_id, seq, role, payload) ",
            );
            builder.push_values(
                messages.iter().zip(payloads).enumerate(),
                |mut row, (seq, (message, payload))| {
                    row.push_bind(thread_id.as_str())
                        .push_bind(seq as i32)
                        .push_bind(message.role.as_str())
                        .push_bind(payload);
                },
            );
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn contains(&self, thread_id: &ThreadId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM conversation_thread WHERE thread_id = $1)",
        )
        .bind(thread_id.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
