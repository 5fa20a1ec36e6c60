mod chat;
mod ingest;
mod prompt;

use chrono::Utc;
use clap::{Parser, Subcommand};
use docchat_core::{load_dotenv, Backend, Settings};
use prompt::Prompter;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{stdin, BufReader};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docchat", version, about = "Ingest documents and chat with them")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a .txt or .pdf file into the configured vector index.
    Ingest {
        /// File to ingest; prompted for when omitted.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Characters per chunk (default 1000).
        #[arg(long, allow_negative_numbers = true)]
        chunk_size: Option<i64>,
        /// Characters shared by consecutive chunks (default 0).
        #[arg(long, allow_negative_numbers = true)]
        chunk_overlap: Option<i64>,
    },
    /// Ask questions answered from the indexed documents.
    Chat {
        /// openai, claude, gemini or ollama; a menu is shown when omitted.
        #[arg(long, env = "DOCCHAT_MODEL")]
        model: Option<Backend>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();
    init_tracing();
    let cli = Cli::parse();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "docchat boot"
    );

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "configuration rejected");
            eprintln!("❌ {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut prompter = Prompter::new(BufReader::new(stdin()));
    let mut out = std::io::stdout();

    match cli.command {
        Command::Ingest {
            file,
            chunk_size,
            chunk_overlap,
        } => {
            let args = ingest::IngestArgs {
                file,
                chunk_size,
                chunk_overlap,
            };
            let result = tokio::select! {
                result = ingest::run(&settings, args, &mut prompter, &mut out) => result,
                _ = tokio::signal::ctrl_c() => {
                    println!("\n\nIngestion cancelled by user.");
                    // Stdin reads are parked on a blocking thread the runtime would wait for.
                    std::process::exit(0);
                }
            };

            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    error!(error = %format!("{err:#}"), "ingestion failed");
                    println!("\n❌ Error during ingestion: {err:#}");
                    ExitCode::FAILURE
                }
            }
        }
        Command::Chat { model } => {
            let result = tokio::select! {
                result = chat::run(&settings, model, &mut prompter, &mut out) => result,
                _ = tokio::signal::ctrl_c() => {
                    println!("\n{}", chat::FAREWELL);
                    std::process::exit(0);
                }
            };

            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    error!(error = %format!("{err:#}"), "chat failed");
                    eprintln!("\n❌ {err:#}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}
