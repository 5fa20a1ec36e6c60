use crate::prompt::Prompter;
use anyhow::{anyhow, Context};
use chrono::Utc;
use docchat_core::{
    build_vector_index, ChunkingConfig, IngestError, IngestionPipeline, IngestionReport,
    OpenAiEmbedder, Settings, SourceFile, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::AsyncBufRead;
use tracing::info;

/// Values supplied on the command line; anything missing is prompted for.
#[derive(Debug, Default)]
pub struct IngestArgs {
    pub file: Option<PathBuf>,
    pub chunk_size: Option<i64>,
    pub chunk_overlap: Option<i64>,
}

pub fn check_chunk_size(value: i64) -> Result<usize, String> {
    if value <= 0 {
        return Err("Chunk size must be positive.".to_string());
    }
    usize::try_from(value).map_err(|_| "Chunk size is too large.".to_string())
}

pub fn check_chunk_overlap(value: i64, chunk_size: usize) -> Result<usize, String> {
    if value < 0 {
        return Err("Chunk overlap cannot be negative.".to_string());
    }
    match usize::try_from(value) {
        Ok(overlap) if overlap < chunk_size => Ok(overlap),
        _ => Err("Chunk overlap must be less than chunk size.".to_string()),
    }
}

/// Blank input takes `default`.
pub fn parse_number(input: &str, default: usize) -> Result<i64, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(default as i64);
    }
    input
        .parse::<i64>()
        .map_err(|_| "Please enter a valid number.".to_string())
}

pub fn describe_source_error(path: &str, error: &IngestError) -> String {
    match error {
        IngestError::NotFound(_) => format!("Error: File '{path}' does not exist."),
        IngestError::UnsupportedFileType(_) => {
            "Error: Unsupported file type. Only .txt and .pdf files are supported.".to_string()
        }
        other => format!("Error: {other}"),
    }
}

async fn prompt_source<R, W>(prompter: &mut Prompter<R>, out: &mut W) -> anyhow::Result<SourceFile>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        let path = prompter
            .ask(out, "Enter the path to your file: ")
            .await?
            .ok_or_else(|| anyhow!("input closed before a file was chosen"))?;

        match SourceFile::resolve(&path) {
            Ok(source) => return Ok(source),
            Err(error) => writeln!(out, "{}", describe_source_error(&path, &error))?,
        }
    }
}

async fn prompt_chunking<R, W>(
    prompter: &mut Prompter<R>,
    out: &mut W,
) -> anyhow::Result<(usize, usize)>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let chunk_size = loop {
        let input = prompter
            .ask(out, &format!("Enter chunk size (default {DEFAULT_CHUNK_SIZE}): "))
            .await?
            .ok_or_else(|| anyhow!("input closed before chunk size was given"))?;
        match parse_number(&input, DEFAULT_CHUNK_SIZE).and_then(check_chunk_size) {
            Ok(size) => break size,
            Err(message) => writeln!(out, "{message}")?,
        }
    };

    let chunk_overlap = loop {
        let input = prompter
            .ask(out, &format!("Enter chunk overlap (default {DEFAULT_CHUNK_OVERLAP}): "))
            .await?
            .ok_or_else(|| anyhow!("input closed before chunk overlap was given"))?;
        match parse_number(&input, DEFAULT_CHUNK_OVERLAP)
            .and_then(|value| check_chunk_overlap(value, chunk_size))
        {
            Ok(overlap) => break overlap,
            Err(message) => writeln!(out, "{message}")?,
        }
    };

    Ok((chunk_size, chunk_overlap))
}

/// Gather the source file and chunk parameters from flags, prompting for the rest.
pub async fn collect_request<R, W>(
    args: IngestArgs,
    prompter: &mut Prompter<R>,
    out: &mut W,
) -> anyhow::Result<(SourceFile, ChunkingConfig)>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let source = match args.file {
        Some(path) => {
            let display = path.display().to_string();
            SourceFile::resolve(path)
                .map_err(|error| anyhow!(describe_source_error(&display, &error)))?
        }
        None => prompt_source(prompter, out).await?,
    };

    let (chunk_size, chunk_overlap) = match (args.chunk_size, args.chunk_overlap) {
        (None, None) => prompt_chunking(prompter, out).await?,
        (size, overlap) => {
            let size = check_chunk_size(size.unwrap_or(DEFAULT_CHUNK_SIZE as i64))
                .map_err(|message| anyhow!(message))?;
            let overlap = check_chunk_overlap(overlap.unwrap_or(DEFAULT_CHUNK_OVERLAP as i64), size)
                .map_err(|message| anyhow!(message))?;
            (size, overlap)
        }
    };

    let config = ChunkingConfig::new(chunk_size, chunk_overlap)?;
    Ok((source, config))
}

pub async fn run<R, W>(
    settings: &Settings,
    args: IngestArgs,
    prompter: &mut Prompter<R>,
    out: &mut W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "=== Document Ingestion Tool ===")?;
    writeln!(
        out,
        "This tool will help you ingest text and PDF files into the vector database."
    )?;
    writeln!(out, "Supported file types: .txt, .pdf\n")?;

    let (source, config) = collect_request(args, prompter, out).await?;

    writeln!(out, "\nStarting ingestion process...")?;
    writeln!(out, "File: {}", source.path.display())?;
    writeln!(out, "Chunk size: {}", config.chunk_size())?;
    writeln!(out, "Chunk overlap: {}\n", config.chunk_overlap())?;

    let embedder = OpenAiEmbedder::from_settings(settings);
    let index = build_vector_index(settings);
    let pipeline = IngestionPipeline::new(&settings.index_name, &embedder, index.as_ref());

    let report = ingest_source(&pipeline, &source, config, out).await?;
    info!(
        source = %report.source,
        documents = report.document_count,
        chunks = report.chunk_count,
        index = %report.index_name,
        backend = settings.vector_store_name(),
        finished_at = %Utc::now().to_rfc3339(),
        "ingestion complete"
    );
    writeln!(out, "\n✅ Successfully ingested: {}", source.path.display())?;
    Ok(())
}

/// Chunk `source` and report the count before any embedding request is made.
pub async fn ingest_source<W: Write>(
    pipeline: &IngestionPipeline<'_>,
    source: &SourceFile,
    config: ChunkingConfig,
    out: &mut W,
) -> anyhow::Result<IngestionReport> {
    let prepared = pipeline
        .prepare(source, config)
        .with_context(|| format!("ingesting {}", source.path.display()))?;
    writeln!(out, "Created {} chunks", prepared.chunks.len())?;

    writeln!(out, "Embedding and ingesting documents...")?;
    let report = pipeline
        .index(&prepared)
        .await
        .with_context(|| format!("ingesting {}", source.path.display()))?;
    Ok(report)
}
