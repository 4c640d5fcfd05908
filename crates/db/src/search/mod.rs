//! Similarity search over the seeded employee records.
//!
//! Both backends return the same serialized shape: a JSON array of
//! `{pageContent, metadata, score}` objects ordered from most to least similar.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::repositories::RepositoryError;

pub mod atlas;
pub mod pgvector;

pub use atlas::AtlasVectorSearch;
pub use pgvector::PgVectorSearch;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub page_content: String,
    pub metadata: Value,
    pub score: f64,
}

#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Returns the `k` most similar employee records, serialized.
    async fn similarity_search(&self, query: &str, k: usize) -> Result<String, RepositoryError>;
}

pub fn serialize_hits(hits: &[SearchHit]) -> Result<String, RepositoryError> {
    serde_json::to_string(hits).map_err(|e| RepositoryError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{serialize_hits, SearchHit};

    #[test]
    fn empty_hits_serialize_to_empty_array() {
        assert_eq!(serialize_hits(&[]).expect("serialize"), "[]");
    }

    #[test]
    fn hits_use_camel_case_page_content() {
        let hits = vec![SearchHit {
            page_content: "Ada Lovelace, born on 1985-12-10.".to_string(),
            metadata: json!({ "employee_id": "E-1001" }),
            score: 0.91,
        }];

        let value: serde_json::Value =
            serde_json::from_str(&serialize_hits(&hits).expect("serialize")).expect("parse");
        assert_eq!(value[0]["pageContent"], "Ada Lovelace, born on 1985-12-10.");
        assert_eq!(value[0]["metadata"]["employee_id"], "E-1001");
    }
}
