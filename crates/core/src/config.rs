//! Process configuration read once from the environment.
//!
//! Required keys are checked together so a single error names everything that
//! is missing. Backend-specific keys (Anthropic, Google) are only demanded when
//! that backend is built, see [`crate::llm::build_chat_model`].

use crate::error::ConfigError;
use std::env;
use url::Url;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const PINECONE_INDEX_NAME: &str = "PINECONE_INDEX_NAME";
pub const PINECONE_API_KEY: &str = "PINECONE_API_KEY";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_TOP_K: usize = 4;

/// Load `.env` from the working directory; a missing file is not an error.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorStoreSettings {
    Pinecone {
        api_key: String,
        host: Option<String>,
        namespace: Option<String>,
    },
    Qdrant {
        url: String,
    },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub index_name: String,
    pub vector_store: VectorStoreSettings,
    pub anthropic_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub ollama_base_url: String,
    pub top_k: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let store_kind = read("VECTOR_STORE").unwrap_or_else(|| "pinecone".to_string());
        let uses_pinecone = match store_kind.to_lowercase().as_str() {
            "pinecone" => true,
            "qdrant" => false,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "VECTOR_STORE".to_string(),
                    details: format!("expected pinecone or qdrant, got {other:?}"),
                })
            }
        };

        let mut required = vec![OPENAI_API_KEY, PINECONE_INDEX_NAME];
        if uses_pinecone {
            required.push(PINECONE_API_KEY);
        }
        let missing: Vec<String> = required
            .iter()
            .filter(|key| read(**key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingVariables(missing));
        }

        let vector_store = if uses_pinecone {
            VectorStoreSettings::Pinecone {
                api_key: read(PINECONE_API_KEY).unwrap_or_default(),
                host: read("PINECONE_INDEX_HOST")
                    .map(|host| parse_base_url("PINECONE_INDEX_HOST", &with_scheme(&host)))
                    .transpose()?,
                namespace: read("PINECONE_NAMESPACE"),
            }
        } else {
            VectorStoreSettings::Qdrant {
                url: parse_base_url(
                    "QDRANT_URL",
                    &read("QDRANT_URL").unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
                )?,
            }
        };

        let top_k = match read("RAG_TOP_K") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "RAG_TOP_K".to_string(),
                        details: format!("expected a positive integer, got {raw:?}"),
                    })
                }
            },
            None => DEFAULT_TOP_K,
        };

        Ok(Self {
            openai_api_key: read(OPENAI_API_KEY).unwrap_or_default(),
            openai_base_url: parse_base_url(
                "OPENAI_BASE_URL",
                &read("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            )?,
            embedding_model: read("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            index_name: read(PINECONE_INDEX_NAME).unwrap_or_default(),
            vector_store,
            anthropic_api_key: read(ANTHROPIC_API_KEY),
            google_api_key: read(GOOGLE_API_KEY),
            ollama_base_url: parse_base_url(
                "OLLAMA_BASE_URL",
                &read("OLLAMA_BASE_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            )?,
            top_k,
        })
    }

    pub fn vector_store_name(&self) -> &'static str {
        match self.vector_store {
            VectorStoreSettings::Pinecone { .. } => "pinecone",
            VectorStoreSettings::Qdrant { .. } => "qdrant",
        }
    }
}

// Pinecone reports index hosts without a scheme.
fn with_scheme(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

fn parse_base_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    Url::parse(raw).map_err(|error| ConfigError::InvalidValue {
        key: key.to_string(),
        details: format!("{raw:?} is not a valid url: {error}"),
    })?;
    Ok(raw.trim_end_matches('/').to_string())
}
