use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl DocumentMetadata {
    pub fn for_file(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page: None,
        }
    }

    pub fn for_page(source: impl Into<String>, page: u32) -> Self {
        Self {
            source: source.into(),
            page: Some(page),
        }
    }
}

/// One loaded unit of a source file: a whole text file or a single PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: DocumentMetadata,
}

pub type ChunkSet = Vec<Chunk>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub score: f64,
    pub content: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Text,
    Pdf,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub source: String,
    pub document_count: usize,
    pub chunk_count: usize,
    pub index_name: String,
}
