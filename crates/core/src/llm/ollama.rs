use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{read_json, ChatModel, Message, OllamaParams, Role};
use crate::error::LlmError;

pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    params: OllamaParams,
}

impl OllamaProvider {
    pub fn new(url: String, params: OllamaParams) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
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
            "stream": false,
            "options": {
                "temperature": self.params.temperature,
            },
        })
    }
}

pub(crate) fn parse_completion(resp: &Value) -> Result<String, LlmError> {
    resp["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LlmError::Parse("missing message.content".into()))
}

#[async_trait]
impl ChatModel for OllamaProvider {
    async fn complete(&self, messages: Vec<Message>) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.url);
        let body = self.build_request_body(&messages);

        debug!("Ollama request to {}", url);

        let response = self.client.post(&url).json(&body).send().await?;

        let resp = read_json(response).await?;
        parse_completion(&resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_non_streaming() {
        let provider = OllamaProvider::new(
            "http://localhost:11434".into(),
            OllamaParams {
                model: "llama3".into(),
                temperature: 0.7,
            },
        );
        let body = provider.build_request_body(&[Message::user("hi")]);

        assert_eq!(body["stream"], false);
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn message_content_is_extracted() {
        let resp = json!({"message": {"role": "assistant", "content": "Hello!"}, "done": true});
        assert_eq!(parse_completion(&resp).ok().as_deref(), Some("Hello!"));
        assert!(parse_completion(&json!({"error": "model not found"})).is_err());
    }
}
