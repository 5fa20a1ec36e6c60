use crate::error::{IngestError, Result};
use crate::models::{DocumentMetadata, RawDocument, SourceKind};
use lopdf::Document;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

impl SourceKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        if extension.eq_ignore_ascii_case("txt") {
            Ok(SourceKind::Text)
        } else if extension.eq_ignore_ascii_case("pdf") {
            Ok(SourceKind::Pdf)
        } else if extension.is_empty() {
            Err(IngestError::UnsupportedFileType(path.display().to_string()))
        } else {
            Err(IngestError::UnsupportedFileType(format!(".{extension}")))
        }
    }

    pub fn loader(self) -> Box<dyn DocumentLoader + Send + Sync> {
        match self {
            SourceKind::Text => Box::new(TextLoader),
            SourceKind::Pdf => Box::new(LopdfLoader),
        }
    }
}

/// A file that exists and has a supported extension.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl SourceFile {
    pub fn resolve(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(IngestError::NotFound(path));
        }
        let kind = SourceKind::from_path(&path)?;
        Ok(Self { path, kind })
    }
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Vec<RawDocument>>;
}

#[derive(Debug, Default)]
pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn load(&self, path: &Path) -> Result<Vec<RawDocument>> {
        let content = fs::read_to_string(path)?;
        debug!(path = %path.display(), chars = content.chars().count(), "loaded text file");

        Ok(vec![RawDocument {
            content,
            metadata: DocumentMetadata::for_file(path.to_string_lossy()),
        }])
    }
}

#[derive(Debug, Default)]
pub struct LopdfLoader;

impl DocumentLoader for LopdfLoader {
    fn load(&self, path: &Path) -> Result<Vec<RawDocument>> {
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;
        let source = path.to_string_lossy().to_string();

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            if text.trim().is_empty() {
                warn!(path = %source, page = page_no, "skipping page without extractable text");
                continue;
            }

            pages.push(RawDocument {
                content: text,
                metadata: DocumentMetadata::for_page(source.clone(), page_no),
            });
        }

        if pages.is_empty() {
            return Err(IngestError::PdfParse(format!(
                "pdf had no readable page text: {}",
                path.display()
            )));
        }

        debug!(path = %source, pages = pages.len(), "loaded pdf");
        Ok(pages)
    }
}
