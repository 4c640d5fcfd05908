use std::sync::Arc;

use serde_json::Value;
use sqlx::Row;

use hrbot_core::Embedder;

use super::{serialize_hits, SearchHit, VectorSearch};
use crate::repositories::RepositoryError;
use crate::DbPool;

/// Cosine-distance search against a pgvector `embedding` column.
pub struct PgVectorSearch {
    pool: DbPool,
    embedder: Arc<dyn Embedder>,
    table: String,
}

impl PgVectorSearch {
    /// `table` must be a plain identifier; config validation enforces this.
    pub fn new(pool: DbPool, embedder: Arc<dyn Embedder>, table: impl Into<String>) -> Self {
        Self { pool, embedder, table: table.into() }
    }
}

/// pgvector text literal, e.g. `[0.1,0.2,0.3]`.
pub fn vector_literal(embedding: &[f32]) -> String {
    let values = embedding.iter().map(|value| value.to_string()).collect::<Vec<_>>();
    format!("[{}]", values.join(","))
}

#[async_trait::async_trait]
impl VectorSearch for PgVectorSearch {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<String, RepositoryError> {
        let embedding = self.embedder.embed(query).await?;

        let sql = format!(
            "SELECT embedding_text, metadata, 1 - (embedding <=> $1::vector) AS score
             FROM {table}
             ORDER BY embedding <=> $1::vector
             LIMIT $2",
            table = self.table,
        );
        let rows = sqlx::query(&sql)
            .bind(vector_literal(&embedding))
            .bind(k as i64)
            .fetch_all(&self.pool)
            .await?;

        let hits = rows
            .iter()
            .map(|row| {
                let page_content: String = row
                    .try_get("embedding_text")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let metadata: Option<Value> =
                    row.try_get("metadata").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let score: f64 =
                    row.try_get("score").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                Ok(SearchHit { page_content, metadata: metadata.unwrap_or(Value::Null), score })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        serialize_hits(&hits)
    }
}

#[cfg(test)]
mod tests {
    use super::vector_literal;

    #[test]
    fn vector_literal_matches_pgvector_text_format() {
        assert_eq!(vector_literal(&[0.5, -1.0, 0.25]), "[0.5,-1,0.25]");
        assert_eq!(vector_literal(&[]), "[]");
    }
}
