use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{read_json, ChatModel, ClaudeParams, Message, Role};
use crate::error::LlmError;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

pub struct ClaudeProvider {
    client: reqwest::Client,
    api_key: String,
    params: ClaudeParams,
}

impl ClaudeProvider {
    pub fn new(api_key: String, params: ClaudeParams) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(params.timeout).build()?;
        Ok(Self {
            client,
            api_key,
            params,
        })
    }

    fn build_request_body(&self, messages: &[Message]) -> Value {
        // Claude takes the system prompt as a top-level field.
        let system_msg = messages
            .iter()
            .filter(|m| matches!(m.role, Role::System))
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>();

        let api_messages: Vec<Value> = messages
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => return None,
                };
                Some(json!({ "role": role, "content": m.content }))
            })
            .collect();

        let mut body = json!({
            "model": self.params.model,
            "messages": api_messages,
            "temperature": self.params.temperature,
            "max_tokens": self.params.max_tokens,
        });

        if !system_msg.is_empty() {
            body["system"] = json!(system_msg.join("\n\n"));
        }
        if !self.params.stop_sequences.is_empty() {
            body["stop_sequences"] = json!(self.params.stop_sequences);
        }

        body
    }
}

pub(crate) fn parse_completion(resp: &Value) -> Result<String, LlmError> {
    let blocks = resp["content"]
        .as_array()
        .ok_or_else(|| LlmError::Parse("missing content array".into()))?;

    let text = blocks
        .iter()
        .filter(|block| block["type"] == "text")
        .filter_map(|block| block["text"].as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() {
        return Err(LlmError::Parse("missing content[].text".into()));
    }
    Ok(text)
}

#[async_trait]
impl ChatModel for ClaudeProvider {
    async fn complete(&self, messages: Vec<Message>) -> Result<String, LlmError> {
        let body = self.build_request_body(&messages);

        debug!(model = %self.params.model, "Claude request to {}", MESSAGES_URL);

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
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
    use crate::llm::ModelSpec;

    fn provider() -> ClaudeProvider {
        let ModelSpec::Claude(params) = ModelSpec::claude() else {
            unreachable!("claude spec");
        };
        ClaudeProvider::new("sk-ant-test".into(), params).expect("client builds")
    }

    #[test]
    fn system_prompt_is_lifted_out_of_messages() {
        let body = provider().build_request_body(&[
            Message::system("Answer from context."),
            Message::user("Hello"),
        ]);

        assert_eq!(body["system"], "Answer from context.");
        let messages = body["messages"].as_array().cloned().unwrap_or_default();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["stop_sequences"], json!(["Human:", "Assistant:"]));
    }

    #[test]
    fn text_blocks_are_joined() {
        let resp = json!({
            "content": [
                {"type": "text", "text": "Part one. "},
                {"type": "text", "text": "Part two."}
            ]
        });
        assert_eq!(
            parse_completion(&resp).ok().as_deref(),
            Some("Part one. Part two.")
        );
        assert!(parse_completion(&json!({"error": "overloaded"})).is_err());
    }
}
