use crate::error::IngestError;
use crate::models::{Chunk, ChunkSet, RawDocument};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_CHUNK_SIZE: usize = 1_000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 0;

/// Window sizes for the character splitter, measured in `char`s.
///
/// Only constructible through [`ChunkingConfig::new`], so a value in hand always
/// advances by at least one character per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, IngestError> {
        if chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be positive".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk overlap {chunk_overlap} must be less than chunk size {chunk_size}"
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Splits `text` into windows of `chunk_size` chars, each starting
/// `chunk_size - chunk_overlap` chars after the previous one.
pub fn split_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    if chars.len() <= config.chunk_size {
        return vec![text.to_string()];
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + config.chunk_size).min(chars.len());
        pieces.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += config.step();
    }

    pieces
}

pub fn split_documents(documents: &[RawDocument], config: ChunkingConfig) -> ChunkSet {
    let chunks: ChunkSet = documents
        .iter()
        .flat_map(|document| {
            split_text(&document.content, config)
                .into_iter()
                .map(|content| Chunk {
                    content,
                    metadata: document.metadata.clone(),
                })
        })
        .collect();

    info!(
        documents = documents.len(),
        chunk_count = chunks.len(),
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        "created chunks"
    );

    chunks
}

/// Stable id for a chunk so re-ingesting a file overwrites its previous records.
pub fn chunk_id(chunk: &Chunk, position: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chunk.metadata.source.as_bytes());
    hasher.update(chunk.metadata.page.unwrap_or(0).to_le_bytes());
    hasher.update((position as u64).to_le_bytes());
    hasher.update(chunk.content.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;

    fn config(size: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig::new(size, overlap).expect("valid chunking config")
    }

    fn document(content: &str, page: Option<u32>) -> RawDocument {
        RawDocument {
            content: content.to_string(),
            metadata: DocumentMetadata {
                source: "/tmp/notes.pdf".to_string(),
                page,
            },
        }
    }

    #[test]
    fn windows_overlap_by_configured_amount() {
        let pieces = split_text("ABCDEFGHIJ", config(4, 1));
        assert_eq!(pieces, vec!["ABCD", "DEFG", "GHIJ"]);
    }

    #[test]
    fn short_content_is_a_single_chunk() {
        let pieces = split_text("hello", config(1_000, 0));
        assert_eq!(pieces, vec!["hello"]);

        let exact = split_text("abcd", config(4, 3));
        assert_eq!(exact, vec!["abcd"]);
    }

    #[test]
    fn empty_content_yields_nothing() {
        assert!(split_text("", config(10, 2)).is_empty());
    }

    #[test]
    fn chunk_count_matches_window_arithmetic() {
        let text: String = "abcdefghijklmnopqrstuvwxyz".repeat(7);
        let length = text.chars().count();

        for (size, overlap) in [(10, 0), (10, 3), (7, 6), (50, 49), (181, 1), (26, 13)] {
            let pieces = split_text(&text, config(size, overlap));
            let expected = if length > size {
                (length - overlap).div_ceil(size - overlap)
            } else {
                1
            };
            assert_eq!(pieces.len(), expected, "size={size} overlap={overlap}");
        }
    }

    #[test]
    fn non_overlapping_parts_rebuild_the_source() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(9);
        let config = config(37, 5);
        let pieces = split_text(&text, config);

        let mut rebuilt: String = pieces[0].clone();
        for piece in &pieces[1..] {
            rebuilt.extend(piece.chars().skip(config.chunk_overlap()));
        }
        assert_eq!(rebuilt, text);

        for pair in pieces.windows(2) {
            let tail: String = pair[0]
                .chars()
                .skip(pair[0].chars().count() - 5)
                .collect();
            let head: String = pair[1].chars().take(5).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn only_the_last_chunk_may_be_short() {
        let text = "x".repeat(95);
        let pieces = split_text(&text, config(20, 4));
        let (last, rest) = pieces.split_last().expect("chunks");
        assert!(rest.iter().all(|piece| piece.chars().count() == 20));
        assert!(last.chars().count() <= 20);
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let text = "héllo wörld 🌍 ünïcödé";
        let pieces = split_text(text, config(5, 2));
        assert!(pieces.iter().all(|piece| piece.chars().count() <= 5));
        assert_eq!(pieces[0], "héllo");
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(matches!(
            ChunkingConfig::new(0, 0),
            Err(IngestError::InvalidChunkConfig(_))
        ));
        assert!(matches!(
            ChunkingConfig::new(10, 10),
            Err(IngestError::InvalidChunkConfig(_))
        ));
        assert!(matches!(
            ChunkingConfig::new(10, 25),
            Err(IngestError::InvalidChunkConfig(_))
        ));
        assert!(ChunkingConfig::new(10, 9).is_ok());
    }

    #[test]
    fn chunks_inherit_metadata_and_never_span_documents() {
        let documents = vec![document("ABCDEF", Some(1)), document("GHIJ", Some(2))];
        let chunks = split_documents(&documents, config(4, 0));

        let contents: Vec<_> = chunks.iter().map(|chunk| chunk.content.as_str()).collect();
        assert_eq!(contents, vec!["ABCD", "EF", "GHIJ"]);
        assert_eq!(chunks[0].metadata.page, Some(1));
        assert_eq!(chunks[1].metadata.page, Some(1));
        assert_eq!(chunks[2].metadata.page, Some(2));
        assert!(chunks
            .iter()
            .all(|chunk| chunk.metadata.source == "/tmp/notes.pdf"));
    }

    #[test]
    fn chunk_ids_are_stable_and_position_sensitive() {
        let chunk = Chunk {
            content: "same text".to_string(),
            metadata: DocumentMetadata::for_file("a.txt"),
        };
        assert_eq!(chunk_id(&chunk, 0), chunk_id(&chunk, 0));
        assert_ne!(chunk_id(&chunk, 0), chunk_id(&chunk, 1));
        assert!(Uuid::parse_str(&chunk_id(&chunk, 3)).is_ok());
    }
}
