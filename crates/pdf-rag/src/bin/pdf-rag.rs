//! pdf-rag command line
//!
//! Run with: cargo run -p pdf-rag -- <command>

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

use pdf_rag::{
    chat::ChatService, config::RagConfig, generation::OllamaClient, server::RagServer,
    types::ChatRequest, Error,
};

/// Chat with your PDF documents using a local Ollama model
#[derive(Parser, Debug)]
#[command(name = "pdf-rag", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true, env = "PDF_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Command to run (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API
    Serve,

    /// Index PDF files or directories of PDFs
    Ingest {
        /// Files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Ask a single question
    Ask {
        /// The question
        question: String,

        #[command(flatten)]
        sampling: SamplingArgs,
    },

    /// Interactive chat (/clear to forget, /exit to quit)
    Chat {
        #[command(flatten)]
        sampling: SamplingArgs,
    },

    /// Print the conversation history
    History,

    /// Forget the conversation
    Clear,
}

#[derive(Args, Debug, Clone, Default)]
struct SamplingArgs {
    /// Sampling temperature (0.0 - 1.0)
    #[arg(long)]
    temperature: Option<f32>,

    /// Nucleus sampling (0.1 - 1.0)
    #[arg(long)]
    top_p: Option<f32>,

    /// Top-K sampling (1 - 100)
    #[arg(long)]
    top_k: Option<u32>,

    /// Number of chunks to retrieve
    #[arg(long)]
    k: Option<usize>,
}

impl SamplingArgs {
    fn request(&self, question: &str) -> ChatRequest {
        ChatRequest {
            question: question.to_string(),
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            k: self.k,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_rag=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = RagConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Ingest { paths } => ingest(config, &paths).await,
        Commands::Ask { question, sampling } => ask(config, &question, &sampling).await,
        Commands::Chat { sampling } => chat(config, &sampling).await,
        Commands::History => history(config),
        Commands::Clear => clear(config),
    }
}

/// Warn early when Ollama or the configured models are missing
async fn check_ollama(config: &RagConfig) -> anyhow::Result<()> {
    tracing::info!("Checking Ollama at {}...", config.llm.base_url);
    let client = OllamaClient::new(&config.llm, config.embeddings.model.clone())?;

    if !client.health_check().await? {
        tracing::warn!("Ollama not available at {}", config.llm.base_url);
        tracing::warn!("Please start Ollama:");
        tracing::warn!("  1. Install: https://ollama.com/download");
        tracing::warn!("  2. Start: ollama serve");
        tracing::warn!(
            "  3. Pull models: ollama pull {} && ollama pull {}",
            config.llm.model,
            config.embeddings.model
        );
        return Ok(());
    }

    let models = client.list_models().await.unwrap_or_default();
    for wanted in [&config.llm.model, &config.embeddings.model] {
        let present = models
            .iter()
            .any(|m| m == wanted || m.split(':').next() == Some(wanted.as_str()));
        if !present {
            tracing::warn!("Model '{}' not found, run: ollama pull {}", wanted, wanted);
        }
    }
    tracing::info!("Ollama is running ({} models available)", models.len());
    Ok(())
}

async fn serve(config: RagConfig) -> anyhow::Result<()> {
    tracing::info!("Configuration loaded");
    tracing::info!("  - LLM model: {}", config.llm.model);
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    check_ollama(&config).await?;

    let server = RagServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST   /api/documents - Upload a PDF");
    println!("  POST   /api/chat      - Ask questions");
    println!("  GET    /api/history   - Conversation history");
    println!("  DELETE /api/history   - Clear conversation");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;
    Ok(())
}

/// PDFs named directly, plus every `*.pdf` below named directories
fn collect_pdfs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let is_pdf = |p: &Path| {
        p.extension()
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false)
    };

    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(
                WalkDir::new(path)
                    .follow_links(true)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file() && is_pdf(e.path()))
                    .map(|e| e.into_path()),
            );
        } else {
            files.push(path.clone());
        }
    }
    files
}

async fn ingest(config: RagConfig, paths: &[PathBuf]) -> anyhow::Result<()> {
    check_ollama(&config).await?;
    let service = ChatService::from_config(config)?;

    let files = collect_pdfs(paths);
    if files.is_empty() {
        anyhow::bail!("No PDF files found");
    }

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {wide_msg}")?
            .progress_chars("=> "),
    );

    let mut failed = 0;
    for file in &files {
        progress.set_message(file.display().to_string());
        match service.rag().process_path(file).await {
            Ok(outcome) => progress.println(format!(
                "{} {} ({} pages, {} chunks{})",
                style("✓").green(),
                file.display(),
                outcome.document.total_pages,
                outcome.chunks,
                if outcome.replaced { ", replaced" } else { "" }
            )),
            Err(e) => {
                failed += 1;
                progress.println(format!("{} {}: {}", style("✗").red(), file.display(), e));
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    println!(
        "Ingested {} of {} files",
        files.len() - failed,
        files.len()
    );
    if failed > 0 {
        anyhow::bail!("{} files failed", failed);
    }
    Ok(())
}

fn print_answer(response: &pdf_rag::types::ChatResponse) {
    println!("{}\n", response.answer);
    for citation in &response.citations {
        println!(
            "  {} {} (similarity {:.2})",
            style("•").dim(),
            style(citation.format_inline()).cyan(),
            citation.similarity_score
        );
    }
    println!(
        "{}",
        style(format!("{} chunks, {}ms", response.chunks_retrieved, response.processing_time_ms)).dim()
    );
}

async fn ask(config: RagConfig, question: &str, sampling: &SamplingArgs) -> anyhow::Result<()> {
    check_ollama(&config).await?;
    let service = ChatService::from_config(config)?;
    match service.ask(&sampling.request(question)).await {
        Ok(response) => {
            print_answer(&response);
            Ok(())
        }
        Err(Error::NoDocuments) => {
            anyhow::bail!("No documents loaded. Run `pdf-rag ingest <file.pdf>` first")
        }
        Err(e) => Err(e.into()),
    }
}

async fn chat(config: RagConfig, sampling: &SamplingArgs) -> anyhow::Result<()> {
    check_ollama(&config).await?;
    let service = ChatService::from_config(config)?;

    if !service.rag().has_documents().await? {
        println!(
            "{}",
            style("No documents loaded yet. Run `pdf-rag ingest <file.pdf>` first.").yellow()
        );
    }
    println!("Ask a question about your documents. /clear forgets the conversation, /exit quits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                service.clear_memory().await?;
                println!("{}", style("Conversation cleared").dim());
            }
            question => match service.ask(&sampling.request(question)).await {
                Ok(response) => print_answer(&response),
                Err(e) => println!("{} {}", style("error:").red(), e),
            },
        }
    }
    Ok(())
}

fn history(config: RagConfig) -> anyhow::Result<()> {
    let memory = pdf_rag::memory::PersistentChatMemory::open(&config.storage.memory_path)?;
    let messages = memory.messages();
    if messages.is_empty() {
        println!("No conversation yet");
        return Ok(());
    }

    for message in messages {
        let role = message.role.display_role();
        let label = match message.role {
            pdf_rag::types::Role::Human => style(role).green(),
            pdf_rag::types::Role::Ai => style(role).cyan(),
        };
        println!(
            "{} {}\n{}\n",
            label.bold(),
            style(message.timestamp.format("%Y-%m-%d %H:%M:%S")).dim(),
            message.content
        );
    }
    Ok(())
}

fn clear(config: RagConfig) -> anyhow::Result<()> {
    let memory = pdf_rag::memory::PersistentChatMemory::open(&config.storage.memory_path)?;
    memory.clear()?;
    println!("Conversation cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_pdfs_walks_directories() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(docs.join("nested")).unwrap();
        std::fs::write(docs.join("a.pdf"), b"%PDF").unwrap();
        std::fs::write(docs.join("nested/B.PDF"), b"%PDF").unwrap();
        std::fs::write(docs.join("notes.txt"), b"text").unwrap();
        let single = dir.path().join("single.pdf");
        std::fs::write(&single, b"%PDF").unwrap();

        let mut found = collect_pdfs(&[docs.clone(), single.clone()]);
        found.sort();

        let mut expected = vec![docs.join("a.pdf"), docs.join("nested/B.PDF"), single];
        expected.sort();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_sampling_args_build_request() {
        let args = SamplingArgs {
            temperature: Some(0.3),
            k: Some(2),
            ..Default::default()
        };
        let request = args.request("What is covered?");
        assert_eq!(request.question, "What is covered?");
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.top_p, None);
        assert_eq!(request.k, Some(2));
    }
}
