use crate::error::{QueryError, StoreError};
use crate::models::{Chunk, RetrievedChunk};
use async_trait::async_trait;

/// A chunk paired with its embedding and the id it is stored under.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub id: String,
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Called once per ingestion before the first upsert.
    async fn ensure_ready(&self, _dimensions: usize) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert(&self, records: &[IndexedChunk]) -> Result<(), StoreError>;

    async fn query(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError>;
}

#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn answer(&self, question: &str) -> Result<String, QueryError>;
}
