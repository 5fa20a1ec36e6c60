//! Chat model backends.
//!
//! [`Backend`] is the closed set of choices offered to the user; [`ModelSpec`]
//! carries the parameters each backend is driven with. [`build_chat_model`]
//! turns a spec plus [`Settings`] into a ready [`ChatModel`].

pub mod claude;
pub mod gemini;
pub mod ollama;
pub mod openai;

use crate::config::{Settings, ANTHROPIC_API_KEY, GOOGLE_API_KEY};
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use claude::ClaudeProvider;
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the conversation and return the assistant's reply text.
    async fn complete(&self, messages: Vec<Message>) -> Result<String, LlmError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    OpenAi,
    Claude,
    Gemini,
    Ollama,
}

impl Backend {
    pub const ALL: [Backend; 4] = [
        Backend::OpenAi,
        Backend::Claude,
        Backend::Gemini,
        Backend::Ollama,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Backend::OpenAi => "openai",
            Backend::Claude => "claude",
            Backend::Gemini => "gemini",
            Backend::Ollama => "ollama",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Backend::OpenAi => "OpenAI GPT",
            Backend::Claude => "Anthropic Claude",
            Backend::Gemini => "Google Gemini",
            Backend::Ollama => "Ollama (Local)",
        }
    }

    /// Resolve a 1-based menu entry.
    pub fn from_menu_choice(choice: &str) -> Option<Self> {
        let index = choice.trim().parse::<usize>().ok()?;
        Self::ALL.get(index.checked_sub(1)?).copied()
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Backend {
    type Err = LlmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "openai" | "gpt" => Ok(Backend::OpenAi),
            "claude" | "anthropic" => Ok(Backend::Claude),
            "gemini" | "google" => Ok(Backend::Gemini),
            "ollama" => Ok(Backend::Ollama),
            other => Err(LlmError::NotConfigured(format!(
                "unknown LLM backend: '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiParams {
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaudeParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub stop_sequences: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeminiParams {
    pub model: String,
    pub temperature: f32,
    /// Fold system text into the first user turn instead of `system_instruction`.
    pub system_as_user: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OllamaParams {
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelSpec {
    OpenAi(OpenAiParams),
    Claude(ClaudeParams),
    Gemini(GeminiParams),
    Ollama(OllamaParams),
}

impl ModelSpec {
    pub fn openai() -> Self {
        ModelSpec::OpenAi(OpenAiParams {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
        })
    }

    pub fn claude() -> Self {
        ModelSpec::Claude(ClaudeParams {
            model: "claude-3-sonnet-20240229".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout: Duration::from_secs(120),
            stop_sequences: vec!["Human:".to_string(), "Assistant:".to_string()],
        })
    }

    pub fn gemini() -> Self {
        ModelSpec::Gemini(GeminiParams {
            model: "gemini-pro".to_string(),
            temperature: 0.7,
            system_as_user: true,
        })
    }

    pub fn ollama() -> Self {
        ModelSpec::Ollama(OllamaParams {
            model: "llama3".to_string(),
            temperature: 0.7,
        })
    }

    pub fn for_backend(backend: Backend) -> Self {
        match backend {
            Backend::OpenAi => Self::openai(),
            Backend::Claude => Self::claude(),
            Backend::Gemini => Self::gemini(),
            Backend::Ollama => Self::ollama(),
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            ModelSpec::OpenAi(_) => Backend::OpenAi,
            ModelSpec::Claude(_) => Backend::Claude,
            ModelSpec::Gemini(_) => Backend::Gemini,
            ModelSpec::Ollama(_) => Backend::Ollama,
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            ModelSpec::OpenAi(params) => &params.model,
            ModelSpec::Claude(params) => &params.model,
            ModelSpec::Gemini(params) => &params.model,
            ModelSpec::Ollama(params) => &params.model,
        }
    }

    fn validate(&self) -> Result<(), LlmError> {
        let (model, temperature) = match self {
            ModelSpec::OpenAi(params) => (&params.model, params.temperature),
            ModelSpec::Claude(params) => {
                if params.max_tokens == 0 {
                    return Err(LlmError::NotConfigured(
                        "claude max_tokens must be positive".to_string(),
                    ));
                }
                (&params.model, params.temperature)
            }
            ModelSpec::Gemini(params) => (&params.model, params.temperature),
            ModelSpec::Ollama(params) => (&params.model, params.temperature),
        };

        if model.trim().is_empty() {
            return Err(LlmError::NotConfigured(format!(
                "{} model name is empty",
                self.backend()
            )));
        }
        if !(0.0..=2.0).contains(&temperature) {
            return Err(LlmError::NotConfigured(format!(
                "{} temperature {temperature} is outside 0.0..=2.0",
                self.backend()
            )));
        }
        Ok(())
    }
}

/// Create the chat model for `spec`, failing early when its credentials are absent.
pub fn build_chat_model(
    spec: &ModelSpec,
    settings: &Settings,
) -> Result<Box<dyn ChatModel>, LlmError> {
    spec.validate()?;

    match spec {
        ModelSpec::OpenAi(params) => Ok(Box::new(OpenAiProvider::new(
            settings.openai_api_key.clone(),
            settings.openai_base_url.clone(),
            params.clone(),
        ))),
        ModelSpec::Claude(params) => {
            let api_key = settings
                .anthropic_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured(format!("{ANTHROPIC_API_KEY} not set")))?;
            Ok(Box::new(ClaudeProvider::new(api_key.clone(), params.clone())?))
        }
        ModelSpec::Gemini(params) => {
            let api_key = settings
                .google_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured(format!("{GOOGLE_API_KEY} not set")))?;
            Ok(Box::new(GeminiProvider::new(api_key.clone(), params.clone())))
        }
        ModelSpec::Ollama(params) => Ok(Box::new(OllamaProvider::new(
            settings.ollama_base_url.clone(),
            params.clone(),
        ))),
    }
}

pub(crate) async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = response.status().as_u16();
    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Api { status, body });
    }
    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VectorStoreSettings;

    fn settings() -> Settings {
        Settings {
            openai_api_key: "sk-test".to_string(),
            openai_base_url: "https://api.openai.com".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            index_name: "docs".to_string(),
            vector_store: VectorStoreSettings::Qdrant {
                url: "http://localhost:6333".to_string(),
            },
            anthropic_api_key: None,
            google_api_key: None,
            ollama_base_url: "http://localhost:11434".to_string(),
            top_k: 4,
        }
    }

    #[test]
    fn menu_choices_map_to_backends() {
        assert_eq!(Backend::from_menu_choice("1"), Some(Backend::OpenAi));
        assert_eq!(Backend::from_menu_choice(" 2 "), Some(Backend::Claude));
        assert_eq!(Backend::from_menu_choice("3"), Some(Backend::Gemini));
        assert_eq!(Backend::from_menu_choice("4"), Some(Backend::Ollama));
        assert_eq!(Backend::from_menu_choice("0"), None);
        assert_eq!(Backend::from_menu_choice("5"), None);
        assert_eq!(Backend::from_menu_choice("claude"), None);
    }

    #[test]
    fn backend_names_parse() {
        assert_eq!("OpenAI".parse::<Backend>().ok(), Some(Backend::OpenAi));
        assert_eq!("anthropic".parse::<Backend>().ok(), Some(Backend::Claude));
        assert!("mistral".parse::<Backend>().is_err());
    }

    #[test]
    fn specs_round_trip_to_their_backend() {
        for backend in Backend::ALL {
            assert_eq!(ModelSpec::for_backend(backend).backend(), backend);
        }
        assert_eq!(ModelSpec::claude().model_name(), "claude-3-sonnet-20240229");
    }

    #[test]
    fn claude_without_key_is_not_configured() {
        let error = build_chat_model(&ModelSpec::claude(), &settings())
            .err()
            .expect("missing key must fail");
        assert!(error.to_string().contains(ANTHROPIC_API_KEY));
    }

    #[test]
    fn gemini_without_key_is_not_configured() {
        let error = build_chat_model(&ModelSpec::gemini(), &settings())
            .err()
            .expect("missing key must fail");
        assert!(error.to_string().contains(GOOGLE_API_KEY));
    }

    #[test]
    fn keyless_backends_build() {
        assert!(build_chat_model(&ModelSpec::openai(), &settings()).is_ok());
        assert!(build_chat_model(&ModelSpec::ollama(), &settings()).is_ok());
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let spec = ModelSpec::Ollama(OllamaParams {
            model: "llama3".to_string(),
            temperature: 3.5,
        });
        assert!(matches!(
            build_chat_model(&spec, &settings()),
            Err(LlmError::NotConfigured(_))
        ));
    }
}
