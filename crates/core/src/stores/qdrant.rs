use super::{metadata_from_record, record_metadata, UPSERT_BATCH_SIZE};
use crate::error::StoreError;
use crate::models::RetrievedChunk;
use crate::traits::{IndexedChunk, VectorIndex};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};

pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
}

impl QdrantStore {
    pub fn new(endpoint: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            collection: collection.into(),
            client: Client::new(),
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.endpoint, self.collection)
    }

    fn backend_error(status: StatusCode) -> StoreError {
        StoreError::BackendResponse {
            backend: "qdrant".to_string(),
            details: status.to_string(),
        }
    }
}

fn points_body(records: &[IndexedChunk]) -> Value {
    let points: Vec<Value> = records
        .iter()
        .map(|record| {
            json!({
                "id": record.id,
                "vector": record.embedding,
                "payload": record_metadata(record),
            })
        })
        .collect();
    json!({ "points": points })
}

fn parse_hits(parsed: &Value) -> Vec<RetrievedChunk> {
    let hits = parsed
        .pointer("/result")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut result = Vec::new();
    for hit in hits {
        let id = match hit.pointer("/id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => String::new(),
        };
        let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);
        let (content, metadata) =
            metadata_from_record(hit.pointer("/payload").unwrap_or(&Value::Null));

        result.push(RetrievedChunk {
            id,
            score,
            content,
            metadata,
        });
    }

    result
}

#[async_trait]
impl VectorIndex for QdrantStore {
    fn backend(&self) -> &'static str {
        "qdrant"
    }

    async fn ensure_ready(&self, dimensions: usize) -> Result<(), StoreError> {
        let response = self.client.get(self.collection_url()).send().await?;

        if response.status() == StatusCode::OK {
            let parsed: Value = response.json().await?;
            let existing = parsed
                .pointer("/result/config/params/vectors/size")
                .and_then(Value::as_u64);
            if let Some(size) = existing {
                if size as usize != dimensions {
                    return Err(StoreError::Request(format!(
                        "collection {} has vector size {} but embeddings have {}",
                        self.collection, size, dimensions
                    )));
                }
            }
            return Ok(());
        }

        if response.status() != StatusCode::NOT_FOUND {
            return Err(Self::backend_error(response.status()));
        }

        info!(collection = %self.collection, dimensions, "creating qdrant collection");
        let response = self
            .client
            .put(self.collection_url())
            .json(&json!({
                "vectors": {
                    "size": dimensions,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response.status()));
        }
        Ok(())
    }

    async fn upsert(&self, records: &[IndexedChunk]) -> Result<(), StoreError> {
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            debug!(collection = %self.collection, points = batch.len(), "qdrant upsert");
            let response = self
                .client
                .put(format!("{}/points?wait=true", self.collection_url()))
                .json(&points_body(batch))
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(Self::backend_error(response.status()));
            }
        }

        Ok(())
    }

    async fn query(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&json!({
                "vector": query_vector,
                "limit": top_k,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response.status()));
        }

        let parsed: Value = response.json().await?;
        Ok(parse_hits(&parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, DocumentMetadata};

    #[test]
    fn points_use_chunk_ids_and_payload() {
        let records = vec![IndexedChunk {
            id: "5a1c7e3e-0000-4000-8000-000000000001".to_string(),
            chunk: Chunk {
                content: "valve spec".to_string(),
                metadata: DocumentMetadata::for_page("/docs/valves.pdf", 4),
            },
            embedding: vec![0.25, 0.75],
        }];

        let body = points_body(&records);
        assert_eq!(body["points"][0]["id"], "5a1c7e3e-0000-4000-8000-000000000001");
        assert_eq!(body["points"][0]["payload"]["text"], "valve spec");
        assert_eq!(body["points"][0]["payload"]["page"], 4);
    }

    #[test]
    fn search_result_is_parsed() {
        let parsed = json!({
            "result": [
                {"id": "abc", "score": 0.8, "payload": {"text": "hydraulic pump", "source": "/docs/a.pdf", "page": 2}},
                {"id": 7, "score": 0.1, "payload": {"text": "other", "source": "/docs/b.txt"}}
            ],
            "status": "ok"
        });

        let hits = parse_hits(&parsed);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "abc");
        assert_eq!(hits[0].content, "hydraulic pump");
        assert_eq!(hits[0].metadata.page, Some(2));
        assert_eq!(hits[1].id, "7");
        assert_eq!(hits[1].metadata.page, None);
    }
}
