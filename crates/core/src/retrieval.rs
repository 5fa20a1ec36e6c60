use crate::config::Settings;
use crate::embeddings::{Embedder, OpenAiEmbedder};
use crate::error::{LlmError, QueryError};
use crate::llm::{build_chat_model, ChatModel, Message, ModelSpec};
use crate::models::RetrievedChunk;
use crate::stores::build_vector_index;
use crate::traits::{QuestionAnswerer, VectorIndex};
use async_trait::async_trait;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str = "Answer any use questions based solely on the context below:";

pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_messages(question: &str, chunks: &[RetrievedChunk]) -> Vec<Message> {
    vec![
        Message::system(format!(
            "{SYSTEM_PROMPT}\n\n<context>\n{}\n</context>",
            format_context(chunks)
        )),
        Message::user(question),
    ]
}

/// Retrieve top-k chunks for a question and let the chat model answer from them.
pub struct RetrievalChain {
    embedder: Box<dyn Embedder>,
    index: Box<dyn VectorIndex>,
    model: Box<dyn ChatModel>,
    top_k: usize,
}

impl RetrievalChain {
    pub fn new(
        embedder: Box<dyn Embedder>,
        index: Box<dyn VectorIndex>,
        model: Box<dyn ChatModel>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            model,
            top_k,
        }
    }

    pub fn from_settings(spec: &ModelSpec, settings: &Settings) -> Result<Self, LlmError> {
        let model = build_chat_model(spec, settings)?;
        Ok(Self::new(
            Box::new(OpenAiEmbedder::from_settings(settings)),
            build_vector_index(settings),
            model,
            settings.top_k,
        ))
    }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedChunk>, QueryError> {
        let query_vector = self.embedder.embed_query(question).await?;
        let hits = self.index.query(&query_vector, self.top_k).await?;
        debug!(backend = self.index.backend(), hits = hits.len(), "retrieved chunks");
        Ok(hits)
    }
}

#[async_trait]
impl QuestionAnswerer for RetrievalChain {
    async fn answer(&self, question: &str) -> Result<String, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::EmptyQuestion);
        }

        let hits = self.retrieve(question).await?;
        info!(context_chunks = hits.len(), "asking chat model");

        let answer = self.model.complete(build_messages(question, &hits)).await?;
        Ok(answer)
    }
}
