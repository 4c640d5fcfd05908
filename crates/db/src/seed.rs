//! Loads employee records into the vector stores the lookup tool searches.
//!
//! Both loaders replace the previous contents of their target; reseeding is
//! a full refresh, not an upsert.

use mongodb::bson::{self, Bson, Document};
use tracing::info;

use hrbot_core::{EmployeeRecord, Embedder};

use crate::repositories::RepositoryError;
use crate::search::pgvector::vector_literal;
use crate::{DbPool, MongoHandle};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedReport {
    pub target: String,
    pub records_seeded: usize,
}

pub async fn seed_postgres(
    pool: &DbPool,
    embedder: &dyn Embedder,
    table: &str,
    employees: &[EmployeeRecord],
) -> Result<SeedReport, RepositoryError> {
    let embedded = embed_all(embedder, employees).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("CREATE EXTENSION IF NOT EXISTS vector").execute(&mut *tx).await?;
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id SERIAL PRIMARY KEY,
            embedding_text TEXT NOT NULL,
            embedding vector({dimensions}),
            metadata JSONB,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        dimensions = embedder.dimensions(),
    ))
    .execute(&mut *tx)
    .await?;
    sqlx::query(&format!("TRUNCATE TABLE {table} RESTART IDENTITY")).execute(&mut *tx).await?;

    let insert = format!(
        "INSERT INTO {table} (embedding_text, embedding, metadata) VALUES ($1, $2::vector, $3)"
    );
    for (employee, summary, embedding) in &embedded {
        let metadata =
            serde_json::to_value(employee).map_err(|e| RepositoryError::Decode(e.to_string()))?;
        sqlx::query(&insert)
            .bind(summary)
            .bind(vector_literal(embedding))
            .bind(metadata)
            .execute(&mut *tx)
            .await?;
        info!(
            event_name = "seed.postgres.record_saved",
            employee_id = %employee.employee_id,
            "saved employee record"
        );
    }

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS {table}_embedding_idx ON {table} \
         USING ivfflat (embedding vector_cosine_ops) WITH (lists = 100)"
    ))
    .execute(&mut *tx)
    .await?;
    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS {table}_metadata_idx ON {table} USING GIN (metadata)"
    ))
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(SeedReport { target: format!("postgres:{table}"), records_seeded: embedded.len() })
}

/// The Atlas vector index itself is managed in Atlas, not created here.
pub async fn seed_mongo(
    handle: &MongoHandle,
    embedder: &dyn Embedder,
    collection: &str,
    employees: &[EmployeeRecord],
) -> Result<SeedReport, RepositoryError> {
    let embedded = embed_all(embedder, employees).await?;
    let target = handle.database().collection::<Document>(collection);

    target.delete_many(Document::new()).await?;

    let documents = embedded
        .iter()
        .map(|(employee, summary, embedding)| employee_document(employee, summary, embedding))
        .collect::<Result<Vec<_>, _>>()?;
    if !documents.is_empty() {
        target.insert_many(documents).await?;
    }
    info!(
        event_name = "seed.mongodb.collection_loaded",
        collection,
        records = embedded.len(),
        "loaded employee collection"
    );

    Ok(SeedReport { target: format!("mongodb:{collection}"), records_seeded: embedded.len() })
}

/// Record fields stay top-level so they come back as search-hit metadata.
pub fn employee_document(
    employee: &EmployeeRecord,
    summary: &str,
    embedding: &[f32],
) -> Result<Document, RepositoryError> {
    let mut document =
        bson::to_document(employee).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    document.insert("embedding_text", summary);
    document.insert(
        "embedding",
        embedding.iter().map(|value| Bson::Double(f64::from(*value))).collect::<Vec<_>>(),
    );
    Ok(document)
}

async fn embed_all<'a>(
    embedder: &dyn Embedder,
    employees: &'a [EmployeeRecord],
) -> Result<Vec<(&'a EmployeeRecord, String, Vec<f32>)>, RepositoryError> {
    let mut embedded = Vec::with_capacity(employees.len());
    for employee in employees {
        let summary = employee.summary();
        let embedding = embedder.embed(&summary).await?;
        embedded.push((employee, summary, embedding));
    }
    Ok(embedded)
}
