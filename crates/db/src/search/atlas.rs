use std::sync::Arc;

use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::Collection;
use serde_json::Value;

use hrbot_core::Embedder;

use super::{serialize_hits, SearchHit, VectorSearch};
use crate::repositories::RepositoryError;
use crate::MongoHandle;

const TEXT_KEY: &str = "embedding_text";
const EMBEDDING_KEY: &str = "embedding";
const CANDIDATES_PER_RESULT: usize = 10;

/// Atlas `$vectorSearch` over the employees collection.
pub struct AtlasVectorSearch {
    employees: Collection<Document>,
    embedder: Arc<dyn Embedder>,
    index: String,
}

impl AtlasVectorSearch {
    pub fn new(
        handle: &MongoHandle,
        embedder: Arc<dyn Embedder>,
        collection: &str,
        index: impl Into<String>,
    ) -> Self {
        Self { employees: handle.database().collection(collection), embedder, index: index.into() }
    }
}

pub fn search_pipeline(index: &str, query_vector: &[f32], k: usize) -> Vec<Document> {
    let query_vector = query_vector.iter().map(|value| f64::from(*value)).collect::<Vec<_>>();
    vec![
        doc! {
            "$vectorSearch": {
                "index": index,
                "path": EMBEDDING_KEY,
                "queryVector": query_vector,
                "numCandidates": (k * CANDIDATES_PER_RESULT) as i64,
                "limit": k as i64,
            }
        },
        doc! { "$set": { "score": { "$meta": "vectorSearchScore" } } },
        doc! { "$project": { EMBEDDING_KEY: 0 } },
    ]
}

pub fn hit_from_document(mut document: Document) -> SearchHit {
    let page_content = match document.remove(TEXT_KEY) {
        Some(Bson::String(text)) => text,
        _ => String::new(),
    };
    let score = match document.remove("score") {
        Some(Bson::Double(score)) => score,
        Some(Bson::Int32(score)) => f64::from(score),
        _ => 0.0,
    };
    document.remove("_id");
    let metadata: Value = Bson::Document(document).into_relaxed_extjson();

    SearchHit { page_content, metadata, score }
}

#[async_trait::async_trait]
impl VectorSearch for AtlasVectorSearch {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<String, RepositoryError> {
        let embedding = self.embedder.embed(query).await?;
        let cursor = self.employees.aggregate(search_pipeline(&self.index, &embedding, k)).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;

        let hits = documents.into_iter().map(hit_from_document).collect::<Vec<_>>();
        serialize_hits(&hits)
    }
}
