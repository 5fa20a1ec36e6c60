use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{read_json, ChatModel, Message, OpenAiParams, Role};
use crate::error::LlmError;

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    params: OpenAiParams,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: String, params: OpenAiParams) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            params,
        }
    }

    fn build_request_body(&self, messages: &[Message]) -> Value {
        let api_messages: Vec<Value> = messages
            .iter()
            .map(|m| {
                json!({
                    "role": match m.role {
                        Role::System => "system",
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    "content": m.content,
                })
            })
            .collect();

        json!({
            "model": self.params.model,
            "messages": api_messages,
            "temperature": self.params.temperature,
        })
    }
}

pub(crate) fn parse_completion(resp: &Value) -> Result<String, LlmError> {
    resp["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LlmError::Parse("missing choices[0].message.content".into()))
}

#[async_trait]
impl ChatModel for OpenAiProvider {
    async fn complete(&self, messages: Vec<Message>) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(&messages);

        debug!(model = %self.params.model, "OpenAI request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let resp = read_json(response).await?;
        parse_completion(&resp)
    }
}
