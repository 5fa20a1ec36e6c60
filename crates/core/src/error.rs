use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("invalid value for {key}: {details}")]
    InvalidValue { key: String, details: String },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(std::io::Error),

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported file type {0:?}: only .txt and .pdf files are supported")]
    UnsupportedFileType(String),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    // Wrapping variants carry the inner message in their own text and expose no
    // source, so `{:#}` chains print each layer once.
    #[error("failed to load {}: {cause}", .path.display())]
    Load {
        path: PathBuf,
        cause: Box<IngestError>,
    },

    #[error("error processing documents: {0}")]
    Embedding(LlmError),

    #[error("failed to reach vector store: {0}")]
    VectorStore(StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(reqwest::Error),

    #[error("vector store request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http request failed: {0}")]
    Http(reqwest::Error),

    #[error("api error: {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

impl From<std::io::Error> for IngestError {
    fn from(error: std::io::Error) -> Self {
        IngestError::Io(error)
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(error: reqwest::Error) -> Self {
        StoreError::Http(error)
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(error: reqwest::Error) -> Self {
        LlmError::Http(error)
    }
}

/// Failures surfaced to the chat loop, split by whether retrying later could help.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("question is empty")]
    EmptyQuestion,

    #[error("{0}")]
    Connection(String),

    #[error("{0}")]
    Response(String),
}

impl QueryError {
    pub fn is_connection(&self) -> bool {
        matches!(self, QueryError::Connection(_))
    }
}

fn is_connectivity(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

impl From<LlmError> for QueryError {
    fn from(error: LlmError) -> Self {
        match &error {
            LlmError::Http(inner) if is_connectivity(inner) => {
                QueryError::Connection(error.to_string())
            }
            _ => QueryError::Response(error.to_string()),
        }
    }
}

impl From<StoreError> for QueryError {
    fn from(error: StoreError) -> Self {
        match &error {
            StoreError::Http(inner) if is_connectivity(inner) => {
                QueryError::Connection(format!("failed to reach vector store: {error}"))
            }
            _ => QueryError::Response(error.to_string()),
        }
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variables_are_listed_together() {
        let error = ConfigError::MissingVariables(vec![
            "OPENAI_API_KEY".to_string(),
            "PINECONE_INDEX_NAME".to_string(),
        ]);
        assert_eq!(
            error.to_string(),
            "missing required environment variables: OPENAI_API_KEY, PINECONE_INDEX_NAME"
        );
    }

    #[test]
    fn malformed_llm_payload_is_a_response_error() {
        let error = QueryError::from(LlmError::Parse("missing choices".to_string()));
        assert!(!error.is_connection());
        assert_eq!(error.to_string(), "failed to parse response: missing choices");
    }

    #[test]
    fn load_error_keeps_path_context() {
        let error = IngestError::Load {
            path: PathBuf::from("notes.pdf"),
            cause: Box::new(IngestError::PdfParse("bad xref".to_string())),
        };
        assert_eq!(
            error.to_string(),
            "failed to load notes.pdf: pdf parse error: bad xref"
        );
    }

    fn render_chain(error: &dyn std::error::Error) -> String {
        std::iter::successors(Some(error), |current| current.source())
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(": ")
    }

    #[test]
    fn wrapped_errors_print_each_layer_once() {
        let embedding = IngestError::Embedding(LlmError::Api {
            status: 429,
            body: "rate limited".to_string(),
        });
        let rendered = render_chain(&embedding);
        assert_eq!(
            rendered,
            "error processing documents: api error: 429: rate limited"
        );

        let load = IngestError::Load {
            path: PathBuf::from("notes.pdf"),
            cause: Box::new(IngestError::PdfParse("bad xref".to_string())),
        };
        assert_eq!(render_chain(&load).matches("bad xref").count(), 1);

        let store = IngestError::VectorStore(StoreError::Request("timed out".to_string()));
        assert_eq!(render_chain(&store).matches("timed out").count(), 1);
    }
}
