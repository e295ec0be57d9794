#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod command;
mod memory_repo;

use clap::{Parser, Subcommand};
use command::{
    CommandStrategy, InfoStrategy, InitStrategy, MemoryInput, MemoryStrategy, RagInput,
    RagStrategy, VersionStrategy, WebSessionInput, WebSessionStrategy,
};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "ragcore")]
#[command(about = "Knowledge retrieval and memory consolidation core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single query through the retrieval pipeline.
    Rag {
        /// The user query to evaluate.
        query: String,
    },
    /// Run a candidate fact through memory consolidation.
    Memory {
        /// The candidate fact text.
        content: String,
        /// One of: factual, preference, relationship, temporal.
        #[arg(short, long, default_value = "factual")]
        category: String,
        /// Importance in [0, 1].
        #[arg(short, long, default_value_t = 0.5)]
        importance: f64,
    },
    /// Send a prompt through the third-party web session.
    WebSession {
        /// The prompt to send.
        prompt: String,
    },
    /// Show resolved configuration.
    Info,
    /// Initialize configuration.
    Init,
    /// Show version.
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Rag { query } => {
            RagStrategy.execute(RagInput { query }).await?;
        }
        Commands::Memory { content, category, importance } => {
            MemoryStrategy.execute(MemoryInput { content, category, importance }).await?;
        }
        Commands::WebSession { prompt } => {
            WebSessionStrategy.execute(WebSessionInput { prompt }).await?;
        }
        Commands::Info => {
            InfoStrategy.execute(()).await?;
        }
        Commands::Init => {
            InitStrategy.execute(()).await?;
        }
        Commands::Version => {
            VersionStrategy.execute(()).await?;
        }
    }

    Ok(())
}
