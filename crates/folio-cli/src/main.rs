//! Folio CLI - Command-line interface
//!
//! Usage:
//!   folio index [--docs <dir>] [--out <file>]
//!   folio search <query> [-k <n>]
//!   folio ask <question>
//!   folio photos [--dir <dir>] [--out <file>]
//!
//! Author: hephaex@gmail.com

use clap::{Parser, Subcommand};
use folio_core::{AppConfig, ChatMessage, SearchBackend};
use folio_parser::export_photos;
use folio_rag::ChatOrchestrator;
use folio_vector::{run_indexing, JsonVectorStore, QueryEmbedder, VectorRetriever};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Portfolio assistant CLI")]
#[command(version)]
struct Cli {
    /// TOML config file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector index from markdown documents
    Index {
        /// Directory of markdown documents
        #[arg(long)]
        docs: Option<PathBuf>,
        /// Output index file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show the chunks closest to a query
    Search {
        /// Query text
        query: String,
        /// Number of chunks to show
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Ask the assistant a single question
    Ask {
        /// Question to ask
        question: String,
    },
    /// Export the photo gallery as static JSON
    Photos {
        /// Directory of gallery images (defaults to the server's photography dir)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Output JSON file
        #[arg(long, default_value = "data/photography.json")]
        out: PathBuf,
    },
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "folio_cli={0},folio_parser={0},folio_rag={0},folio_vector={0}",
            config.logging.level
        )
        .into()
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config)?;
    init_tracing(&config);

    match cli.command {
        Commands::Index { docs, out } => {
            let docs = docs.unwrap_or_else(|| config.rag.docs_dir.clone());
            let out = out.unwrap_or_else(|| config.rag.index_path.clone());
            tracing::info!("Indexing {} into {}", docs.display(), out.display());
            match run_indexing(&config, &docs, &out).await? {
                Some(report) => println!(
                    "Indexed {} documents into {} chunks ({}) at {}",
                    report.documents,
                    report.chunks,
                    report.model,
                    report.path.display()
                ),
                None => println!("No documents found in {}", docs.display()),
            }
        }
        Commands::Search { query, k } => {
            let store = Arc::new(JsonVectorStore::new(config.rag.index_path.clone()));
            let embedder = Arc::new(QueryEmbedder::from_config(&config.embedding, &config.llm));
            let retriever = VectorRetriever::new(store, embedder);
            tracing::debug!("Searching {}", config.rag.index_path.display());

            let results = retriever.search(&query, k.unwrap_or(config.rag.top_k)).await?;
            for (i, scored) in results.iter().enumerate() {
                println!("{}. [{:.3}] {}", i + 1, scored.score, scored.chunk.source);
                println!("   {}", scored.chunk.text.replace('\n', " "));
            }
        }
        Commands::Ask { question } => {
            tracing::debug!("Asking with models {:?}", config.llm.models);
            let orchestrator = ChatOrchestrator::from_config(&config)?;
            let answer = orchestrator.answer(&[ChatMessage::user(question)]).await?;
            println!("{}", answer.reply);
            println!();
            println!(
                "model: {}, tokens: {} prompt / {} completion / {} total",
                answer.model, answer.usage.prompt, answer.usage.completion, answer.usage.total
            );
        }
        Commands::Photos { dir, out } => {
            let dir = dir.unwrap_or_else(|| config.server.photography_dir.clone());
            let count = export_photos(&dir, &out)?;
            tracing::info!("Exported {} photos from {}", count, dir.display());
            println!("Wrote {} photos to {}", count, out.display());
        }
    }

    Ok(())
}
