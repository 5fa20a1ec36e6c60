pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod loader;
pub mod models;
pub mod retrieval;
pub mod stores;
pub mod traits;

pub use chunking::{
    chunk_id, split_documents, split_text, ChunkingConfig, DEFAULT_CHUNK_OVERLAP,
    DEFAULT_CHUNK_SIZE,
};
pub use config::{load_dotenv, Settings, VectorStoreSettings};
pub use embeddings::{Embedder, OpenAiEmbedder};
pub use error::{ConfigError, IngestError, LlmError, QueryError, StoreError};
pub use ingest::{Indexer, IngestionPipeline, PreparedSource};
pub use llm::{build_chat_model, Backend, ChatModel, Message, ModelSpec, Role};
pub use loader::{DocumentLoader, LopdfLoader, SourceFile, TextLoader};
pub use models::{
    Chunk, ChunkSet, DocumentMetadata, IngestionReport, RawDocument, RetrievedChunk, SourceKind,
};
pub use retrieval::RetrievalChain;
pub use stores::{build_vector_index, PineconeStore, QdrantStore};
pub use traits::{IndexedChunk, QuestionAnswerer, VectorIndex};
