use super::{metadata_from_record, record_metadata, UPSERT_BATCH_SIZE};
use crate::error::StoreError;
use crate::models::RetrievedChunk;
use crate::traits::{IndexedChunk, VectorIndex};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use std::sync::OnceLock;
use tracing::debug;

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";

pub struct PineconeStore {
    client: Client,
    api_key: String,
    index_name: String,
    namespace: Option<String>,
    host: OnceLock<String>,
}

impl PineconeStore {
    pub fn new(
        api_key: impl Into<String>,
        index_name: impl Into<String>,
        host: Option<String>,
        namespace: Option<String>,
    ) -> Self {
        let resolved = OnceLock::new();
        if let Some(host) = host {
            let _ = resolved.set(host);
        }

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            index_name: index_name.into(),
            namespace,
            host: resolved,
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    /// Data-plane host of the index, looked up through the control plane once.
    async fn host(&self) -> Result<&str, StoreError> {
        if let Some(host) = self.host.get() {
            return Ok(host);
        }

        let url = format!("{CONTROL_PLANE_URL}/indexes/{}", self.index_name);
        debug!(index = %self.index_name, "resolving pinecone index host");
        let response = self.authorized(self.client.get(&url)).send().await?;
        let described = read_json(response).await?;
        let host = parse_index_host(&described)?;

        Ok(self.host.get_or_init(|| host))
    }

    fn with_namespace(&self, mut body: Value) -> Value {
        if let Some(namespace) = &self.namespace {
            body["namespace"] = json!(namespace);
        }
        body
    }
}

async fn read_json(response: Response) -> Result<Value, StoreError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::BackendResponse {
            backend: "pinecone".to_string(),
            details: format!("{status}: {body}"),
        });
    }
    Ok(response.json().await?)
}

fn parse_index_host(described: &Value) -> Result<String, StoreError> {
    let host = described
        .pointer("/host")
        .and_then(Value::as_str)
        .filter(|host| !host.is_empty())
        .ok_or_else(|| StoreError::BackendResponse {
            backend: "pinecone".to_string(),
            details: "index description has no host".to_string(),
        })?;

    if host.starts_with("http://") || host.starts_with("https://") {
        Ok(host.trim_end_matches('/').to_string())
    } else {
        Ok(format!("https://{}", host.trim_end_matches('/')))
    }
}

fn upsert_body(records: &[IndexedChunk]) -> Value {
    let vectors: Vec<Value> = records
        .iter()
        .map(|record| {
            json!({
                "id": record.id,
                "values": record.embedding,
                "metadata": record_metadata(record),
            })
        })
        .collect();
    json!({ "vectors": vectors })
}

fn parse_matches(parsed: &Value) -> Vec<RetrievedChunk> {
    parsed
        .pointer("/matches")
        .and_then(Value::as_array)
        .map(|matches| {
            matches
                .iter()
                .map(|hit| {
                    let (content, metadata) = metadata_from_record(
                        hit.pointer("/metadata").unwrap_or(&Value::Null),
                    );
                    RetrievedChunk {
                        id: hit
                            .pointer("/id")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        score: hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0),
                        content,
                        metadata,
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl VectorIndex for PineconeStore {
    fn backend(&self) -> &'static str {
        "pinecone"
    }

    async fn ensure_ready(&self, _dimensions: usize) -> Result<(), StoreError> {
        self.host().await.map(|_| ())
    }

    async fn upsert(&self, records: &[IndexedChunk]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let host = self.host().await?;
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            debug!(index = %self.index_name, vectors = batch.len(), "pinecone upsert");
            let response = self
                .authorized(self.client.post(format!("{host}/vectors/upsert")))
                .json(&self.with_namespace(upsert_body(batch)))
                .send()
                .await?;

            let acknowledged = read_json(response).await?;
            let count = acknowledged
                .pointer("/upsertedCount")
                .and_then(Value::as_u64)
                .unwrap_or(batch.len() as u64);
            if count != batch.len() as u64 {
                return Err(StoreError::Request(format!(
                    "pinecone acknowledged {count} of {} vectors",
                    batch.len()
                )));
            }
        }

        Ok(())
    }

    async fn query(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        let host = self.host().await?;
        let body = self.with_namespace(json!({
            "vector": query_vector,
            "topK": top_k,
            "includeMetadata": true,
        }));

        let response = self
            .authorized(self.client.post(format!("{host}/query")))
            .json(&body)
            .send()
            .await?;

        let parsed = read_json(response).await?;
        Ok(parse_matches(&parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, DocumentMetadata};

    #[test]
    fn index_host_gets_a_scheme() {
        let described = json!({"name": "docs", "host": "docs-abc123.svc.aped-4627-b74a.pinecone.io"});
        assert_eq!(
            parse_index_host(&described).ok().as_deref(),
            Some("https://docs-abc123.svc.aped-4627-b74a.pinecone.io")
        );
        assert!(parse_index_host(&json!({"name": "docs"})).is_err());
    }

    #[test]
    fn upsert_body_carries_text_and_source() {
        let records = vec![IndexedChunk {
            id: "c-1".to_string(),
            chunk: Chunk {
                content: "pump pressure".to_string(),
                metadata: DocumentMetadata::for_page("manual.pdf", 2),
            },
            embedding: vec![0.5, 0.5],
        }];

        let body = upsert_body(&records);
        assert_eq!(body["vectors"][0]["id"], "c-1");
        assert_eq!(body["vectors"][0]["metadata"]["text"], "pump pressure");
        assert_eq!(body["vectors"][0]["metadata"]["source"], "manual.pdf");
        assert_eq!(body["vectors"][0]["metadata"]["page"], 2);
    }

    #[test]
    fn namespace_is_added_only_when_configured() {
        let plain = PineconeStore::new("k", "docs", Some("https://h".into()), None);
        assert!(plain.with_namespace(json!({})).get("namespace").is_none());

        let scoped = PineconeStore::new("k", "docs", Some("https://h".into()), Some("team".into()));
        assert_eq!(scoped.with_namespace(json!({}))["namespace"], "team");
    }

    #[test]
    fn matches_become_retrieved_chunks() {
        let parsed = json!({
            "matches": [
                {"id": "a", "score": 0.91, "metadata": {"text": "first", "source": "a.pdf", "page": 1.0}},
                {"id": "b", "score": 0.42, "metadata": {"text": "second", "source": "b.txt"}}
            ],
            "namespace": ""
        });

        let hits = parse_matches(&parsed);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "first");
        assert_eq!(hits[0].metadata.page, Some(1));
        assert_eq!(hits[1].metadata, DocumentMetadata::for_file("b.txt"));
        assert!(parse_matches(&json!({})).is_empty());
    }

    #[tokio::test]
    async fn configured_host_skips_lookup() {
        let store = PineconeStore::new("k", "docs", Some("https://docs.example".into()), None);
        assert_eq!(store.host().await.ok(), Some("https://docs.example"));
    }
}
