use crate::chunking::{chunk_id, split_documents, ChunkingConfig};
use crate::embeddings::Embedder;
use crate::error::{IngestError, StoreError};
use crate::loader::SourceFile;
use crate::models::{Chunk, ChunkSet, IngestionReport};
use crate::traits::{IndexedChunk, VectorIndex};
use tracing::{info, warn};

/// Embeds chunks and writes them to a vector index.
pub struct Indexer<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
}

impl<'a> Indexer<'a> {
    pub fn new(embedder: &'a dyn Embedder, index: &'a dyn VectorIndex) -> Self {
        Self { embedder, index }
    }

    pub async fn index_chunks(&self, chunks: &[Chunk]) -> Result<usize, IngestError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
        let embeddings = self
            .embedder
            .embed_documents(&texts)
            .await
            .map_err(IngestError::Embedding)?;

        if embeddings.len() != chunks.len() {
            return Err(IngestError::VectorStore(StoreError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            ))));
        }

        let dimensions = embeddings.first().map(Vec::len).unwrap_or_default();
        if embeddings.iter().any(|vector| vector.len() != dimensions) {
            return Err(IngestError::VectorStore(StoreError::Request(
                "embeddings have inconsistent dimensions".to_string(),
            )));
        }

        self.index
            .ensure_ready(dimensions)
            .await
            .map_err(IngestError::VectorStore)?;

        let records: Vec<IndexedChunk> = chunks
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(position, (chunk, embedding))| IndexedChunk {
                id: chunk_id(chunk, position),
                chunk: chunk.clone(),
                embedding,
            })
            .collect();

        info!(
            backend = self.index.backend(),
            records = records.len(),
            dimensions,
            "upserting chunks"
        );
        self.index
            .upsert(&records)
            .await
            .map_err(IngestError::VectorStore)?;

        Ok(records.len())
    }
}

/// Documents and chunks for one file, ready to be indexed.
#[derive(Debug, Clone)]
pub struct PreparedSource {
    pub source: String,
    pub document_count: usize,
    pub chunks: ChunkSet,
}

/// Loader → chunker → indexer for one file.
pub struct IngestionPipeline<'a> {
    index_name: &'a str,
    indexer: Indexer<'a>,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(
        index_name: &'a str,
        embedder: &'a dyn Embedder,
        index: &'a dyn VectorIndex,
    ) -> Self {
        Self {
            index_name,
            indexer: Indexer::new(embedder, index),
        }
    }

    /// Load and chunk `source` without touching the embedder or the index.
    pub fn prepare(
        &self,
        source: &SourceFile,
        chunking: ChunkingConfig,
    ) -> Result<PreparedSource, IngestError> {
        if !source.path.exists() {
            return Err(IngestError::NotFound(source.path.clone()));
        }

        info!(path = %source.path.display(), kind = ?source.kind, "loading source file");
        let documents = source
            .kind
            .loader()
            .load(&source.path)
            .map_err(|error| IngestError::Load {
                path: source.path.clone(),
                cause: Box::new(error),
            })?;

        let chunks = split_documents(&documents, chunking);
        if chunks.is_empty() {
            warn!(path = %source.path.display(), "source produced no chunks");
        }

        Ok(PreparedSource {
            source: source.path.to_string_lossy().to_string(),
            document_count: documents.len(),
            chunks,
        })
    }

    pub async fn index(&self, prepared: &PreparedSource) -> Result<IngestionReport, IngestError> {
        let chunk_count = self.indexer.index_chunks(&prepared.chunks).await?;

        Ok(IngestionReport {
            source: prepared.source.clone(),
            document_count: prepared.document_count,
            chunk_count,
            index_name: self.index_name.to_string(),
        })
    }

    pub async fn ingest(
        &self,
        source: &SourceFile,
        chunking: ChunkingConfig,
    ) -> Result<IngestionReport, IngestError> {
        let prepared = self.prepare(source, chunking)?;
        self.index(&prepared).await
    }
}
