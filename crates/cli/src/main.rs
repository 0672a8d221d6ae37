//! DocChat CLI: the main entry point.
//!
//! Commands:
//! - `index`        Upload a document and index its pages
//! - `clear-index`  Delete every document from the index
//! - `init-index`   Create or update the index schema
//! - `chat`         Interactive chat grounded in the index
//! - `ask`          Answer a single question
//! - `doctor`       Check configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "docchat",
    about = "DocChat: chat with your documents",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a document and add its pages to the search index
    Index {
        /// Path of the text file to index
        file: PathBuf,
    },

    /// Delete every document from the search index
    ClearIndex,

    /// Create or update the search index definition
    InitIndex,

    /// Start an interactive chat session
    Chat,

    /// Ask one question and print the answer
    Ask {
        /// The question to answer
        question: String,
    },

    /// Check configuration
    Doctor,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so chat output on stdout stays clean
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Index { file } => commands::index::run(file).await,
        Commands::ClearIndex => commands::clear_index::run().await,
        Commands::InitIndex => commands::init_index::run().await,
        Commands::Chat => commands::chat::run().await,
        Commands::Ask { question } => commands::ask::run(question).await,
        Commands::Doctor => commands::doctor::run().await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
