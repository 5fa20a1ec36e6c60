pub mod pinecone;
pub mod qdrant;

pub use pinecone::PineconeStore;
pub use qdrant::QdrantStore;

use crate::config::{Settings, VectorStoreSettings};
use crate::models::DocumentMetadata;
use crate::traits::{IndexedChunk, VectorIndex};
use serde_json::{json, Map, Value};

/// Records sent per upsert request.
pub const UPSERT_BATCH_SIZE: usize = 100;

pub fn build_vector_index(settings: &Settings) -> Box<dyn VectorIndex> {
    match &settings.vector_store {
        VectorStoreSettings::Pinecone {
            api_key,
            host,
            namespace,
        } => Box::new(PineconeStore::new(
            api_key.clone(),
            settings.index_name.clone(),
            host.clone(),
            namespace.clone(),
        )),
        VectorStoreSettings::Qdrant { url } => {
            Box::new(QdrantStore::new(url.clone(), settings.index_name.clone()))
        }
    }
}

/// Record metadata: chunk text under `text`, plus `source` and `page` when known.
pub(crate) fn record_metadata(record: &IndexedChunk) -> Value {
    let mut metadata = Map::new();
    metadata.insert("text".to_string(), json!(record.chunk.content));
    metadata.insert("source".to_string(), json!(record.chunk.metadata.source));
    if let Some(page) = record.chunk.metadata.page {
        metadata.insert("page".to_string(), json!(page));
    }
    Value::Object(metadata)
}

pub(crate) fn metadata_from_record(metadata: &Value) -> (String, DocumentMetadata) {
    let text = metadata
        .pointer("/text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let source = metadata
        .pointer("/source")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let page = metadata
        .pointer("/page")
        .and_then(Value::as_f64)
        .map(|page| page as u32);

    (text, DocumentMetadata { source, page })
}
