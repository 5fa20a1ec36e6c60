use crate::config::Settings;
use crate::error::LlmError;
use crate::llm::read_json;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

/// Inputs per embeddings request.
pub const EMBEDDING_BATCH_SIZE: usize = 64;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| LlmError::Parse("embedding response was empty".into()))
    }
}

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.openai_api_key.clone(),
            settings.openai_base_url.clone(),
            settings.embedding_model.clone(),
        )
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        debug!(model = %self.model, inputs = batch.len(), "OpenAI embeddings request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "input": batch,
            }))
            .send()
            .await?;

        let resp = read_json(response).await?;
        parse_embeddings(&resp, batch.len())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBEDDING_BATCH_SIZE) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }
}

/// Vectors ordered by their `index` field, which the API does not promise to sort.
fn parse_embeddings(resp: &Value, expected: usize) -> Result<Vec<Vec<f32>>, LlmError> {
    let data = resp["data"]
        .as_array()
        .ok_or_else(|| LlmError::Parse("missing data array".into()))?;

    if data.len() != expected {
        return Err(LlmError::Parse(format!(
            "expected {expected} embeddings, got {}",
            data.len()
        )));
    }

    let mut ordered: Vec<Option<Vec<f32>>> = vec![None; expected];
    for (position, item) in data.iter().enumerate() {
        let index = item["index"]
            .as_u64()
            .map(|index| index as usize)
            .unwrap_or(position);
        let vector = item["embedding"]
            .as_array()
            .ok_or_else(|| LlmError::Parse(format!("missing data[{position}].embedding")))?
            .iter()
            .map(|value| value.as_f64().map(|v| v as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| LlmError::Parse(format!("non-numeric value in data[{position}]")))?;

        let slot = ordered
            .get_mut(index)
            .ok_or_else(|| LlmError::Parse(format!("embedding index {index} out of range")))?;
        *slot = Some(vector);
    }

    ordered
        .into_iter()
        .enumerate()
        .map(|(index, vector)| {
            vector.ok_or_else(|| LlmError::Parse(format!("embedding {index} missing")))
        })
        .collect()
}
