use crate::prompt::Prompter;
use anyhow::anyhow;
use docchat_core::{Backend, ModelSpec, QueryError, QuestionAnswerer, RetrievalChain, Settings};
use std::io::Write;
use tokio::io::AsyncBufRead;
use tracing::info;

pub const FAREWELL: &str = "Goodbye!";

#[derive(Debug, PartialEq, Eq)]
pub enum ChatInput<'a> {
    Quit,
    Blank,
    Question(&'a str),
}

pub fn classify_input(line: &str) -> ChatInput<'_> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
        ChatInput::Quit
    } else if line.is_empty() {
        ChatInput::Blank
    } else {
        ChatInput::Question(line)
    }
}

pub async fn select_backend<R, W>(prompter: &mut Prompter<R>, out: &mut W) -> anyhow::Result<Backend>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        writeln!(out, "\nAvailable models:")?;
        for (position, backend) in Backend::ALL.iter().enumerate() {
            writeln!(out, "{}. {}", position + 1, backend.label())?;
        }

        let choice = prompter
            .ask(out, "\nSelect a model (1, 2, 3, or 4): ")
            .await?
            .ok_or_else(|| anyhow!("input closed before a model was selected"))?;

        match Backend::from_menu_choice(&choice) {
            Some(backend) => return Ok(backend),
            None => writeln!(out, "Invalid choice. Please select 1, 2, 3, or 4.")?,
        }
    }
}

/// Read questions until `quit`/`exit` or end of input. Answer failures are
/// reported and the loop keeps going.
pub async fn chat_loop<R, W>(
    prompter: &mut Prompter<R>,
    answerer: &dyn QuestionAnswerer,
    out: &mut W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        let Some(line) = prompter.ask(out, "\nYour question: ").await? else {
            writeln!(out, "\n{FAREWELL}")?;
            return Ok(());
        };

        let question = match classify_input(&line) {
            ChatInput::Quit => {
                writeln!(out, "{FAREWELL}")?;
                return Ok(());
            }
            ChatInput::Blank => continue,
            ChatInput::Question(question) => question,
        };

        writeln!(out, "Retrieving answer...")?;
        match answerer.answer(question).await {
            Ok(answer) => writeln!(out, "\nAnswer: {answer}")?,
            Err(error @ QueryError::Connection(_)) => {
                writeln!(out, "\nConnection error: {error}")?
            }
            Err(error) => writeln!(out, "\nError processing response: {error}")?,
        }
    }
}

pub async fn run<R, W>(
    settings: &Settings,
    backend: Option<Backend>,
    prompter: &mut Prompter<R>,
    out: &mut W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "Welcome to the RAG Chat System!")?;
    let backend = match backend {
        Some(backend) => backend,
        None => select_backend(prompter, out).await?,
    };

    writeln!(
        out,
        "\nInitializing chat system with {}...",
        backend.id().to_uppercase()
    )?;
    let spec = ModelSpec::for_backend(backend);
    let chain = RetrievalChain::from_settings(&spec, settings)?;
    info!(
        backend = %backend,
        model = spec.model_name(),
        store = settings.vector_store_name(),
        index = %settings.index_name,
        top_k = settings.top_k,
        "chat initialized"
    );

    writeln!(
        out,
        "Chat initialized! Type 'quit' or 'exit' to end the conversation."
    )?;
    chat_loop(prompter, &chain, out).await
}
