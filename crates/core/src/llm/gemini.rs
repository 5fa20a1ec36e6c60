use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{read_json, ChatModel, GeminiParams, Message, Role};
use crate::error::LlmError;

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    params: GeminiParams,
}

impl GeminiProvider {
    pub fn new(api_key: String, params: GeminiParams) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            params,
        }
    }

    /// Build the request body for the Gemini generateContent API.
    fn build_request_body(&self, messages: &[Message]) -> Value {
        let system_msg = messages
            .iter()
            .filter(|m| matches!(m.role, Role::System))
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut contents: Vec<Value> = Vec::new();
        let mut pending_system = if self.params.system_as_user && !system_msg.is_empty() {
            Some(system_msg.clone())
        } else {
            None
        };

        for m in messages.iter().filter(|m| !matches!(m.role, Role::System)) {
            let (role, text) = match m.role {
                Role::User => match pending_system.take() {
                    Some(system) => ("user", format!("{system}\n\n{}", m.content)),
                    None => ("user", m.content.clone()),
                },
                Role::Assistant => ("model", m.content.clone()),
                Role::System => continue,
            };
            contents.push(json!({ "role": role, "parts": [{ "text": text }] }));
        }

        if let Some(system) = pending_system {
            contents.insert(0, json!({ "role": "user", "parts": [{ "text": system }] }));
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": self.params.temperature,
            },
        });

        if !self.params.system_as_user && !system_msg.is_empty() {
            body["system_instruction"] = json!({
                "parts": [{ "text": system_msg }],
            });
        }

        body
    }
}

pub(crate) fn parse_completion(resp: &Value) -> Result<String, LlmError> {
    resp["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LlmError::Parse("missing candidates[0].content.parts[0].text".into()))
}

#[async_trait]
impl ChatModel for GeminiProvider {
    async fn complete(&self, messages: Vec<Message>) -> Result<String, LlmError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.params.model,
        );
        let body = self.build_request_body(&messages);

        debug!("Gemini request to model={}", self.params.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let resp = read_json(response).await?;
        parse_completion(&resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    fn provider(system_as_user: bool) -> GeminiProvider {
        GeminiProvider::new(
            "g-test".into(),
            GeminiParams {
                model: "gemini-pro".into(),
                temperature: 0.7,
                system_as_user,
            },
        )
    }

    fn conversation() -> Vec<Message> {
        vec![
            Message::system("You are helpful."),
            Message::user("Hello"),
            Message {
                role: Role::Assistant,
                content: "Hi there!".into(),
            },
            Message::user("How are you?"),
        ]
    }

    #[test]
    fn system_text_is_folded_into_first_user_turn() {
        let body = provider(true).build_request_body(&conversation());

        assert!(body.get("system_instruction").is_none());
        let contents = body["contents"].as_array().cloned().unwrap_or_default();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "You are helpful.\n\nHello");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "How are you?");
    }

    #[test]
    fn system_instruction_is_used_when_not_folding() {
        let body = provider(false).build_request_body(&conversation());

        assert_eq!(
            body["system_instruction"]["parts"][0]["text"],
            "You are helpful."
        );
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Hello");
        let temp = body["generationConfig"]["temperature"]
            .as_f64()
            .unwrap_or_default();
        assert!((temp - 0.7).abs() < 1e-6, "temperature should be ~0.7, got {temp}");
    }

    #[test]
    fn candidate_text_is_extracted() {
        let resp = json!({"candidates": [{"content": {"parts": [{"text": "Fine."}]}}]});
        assert_eq!(parse_completion(&resp).ok().as_deref(), Some("Fine."));
        assert!(parse_completion(&json!({"candidates": []})).is_err());
    }
}
