use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rustysummary::{config, logging, processing::SummaryService};

#[derive(Parser)]
#[command(
    name = "summarize-pdf",
    about = "Extract the text of a PDF and print an LLM-written summary"
)]
struct Cli {
    /// PDF file to summarize.
    path: PathBuf,
    /// API key for the summarization provider (overrides OPENAI_API_KEY).
    #[arg(long)]
    api_key: Option<String>,
    /// Maximum chunk size (overrides TEXT_SPLITTER_CHUNK_SIZE).
    #[arg(long, value_parser = parse_chunk_size)]
    chunk_size: Option<usize>,
    /// Print the extracted text after the summary.
    #[arg(long)]
    show_text: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_cli_tracing();
    let config = config::init_config().context("Failed to load configuration")?;
    let settings = config
        .summarizer_settings()
        .with_api_key(cli.api_key)
        .with_chunk_size(cli.chunk_size);
    let service = SummaryService::new(settings).context("Failed to initialize summary service")?;

    let progress = |fraction: f32, description: &str| {
        eprintln!("[{:>3.0}%] {description}", fraction * 100.0);
    };
    let document = service
        .process_pdf(&cli.path, &progress)
        .await
        .with_context(|| format!("Failed to summarize {}", cli.path.display()))?;

    if document.outcome.kind.is_sentinel() {
        eprintln!("warning: no summary was generated for {}", cli.path.display());
    }
    println!("{}", document.outcome.summary);
    if cli.show_text {
        println!();
        println!("--- Extracted text ---");
        println!("{}", document.text);
    }
    Ok(())
}

fn parse_chunk_size(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("chunk size must be greater than zero".into()),
        Ok(size) => Ok(size),
        Err(err) => Err(err.to_string()),
    }
}
