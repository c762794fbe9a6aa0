//! # docchat CLI
//!
//! Chat with your own documents from the terminal.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docchat init` | Create the SQLite store and run schema migrations |
//! | `docchat add <path>` | Ingest a txt, md, pdf or docx file |
//! | `docchat add --title T --text X` | Ingest pasted text directly |
//! | `docchat list` | Show the stored documents |
//! | `docchat ask "<question>"` | Answer one question and exit |
//! | `docchat chat` | Start an interactive session |
//!
//! The DashScope API key is read from `DASHSCOPE_API_KEY`, or prompted for
//! interactively when the variable is unset and stdin is a terminal.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use docchat::chat::ChatClient;
use docchat::embedding::EmbeddingClient;
use docchat::{catalog, config, db, extract, ingest, migrate, query, repl};

/// Chat with your documents: local SQLite vector store, DashScope models.
#[derive(Parser)]
#[command(
    name = "docchat",
    about = "Chat with your documents: ingest files into a local vector store and ask questions",
    version
)]
struct Cli {
    /// Path to a TOML configuration file. Every setting has a default, so
    /// this is optional.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and run schema migrations. Idempotent.
    Init,

    /// Ingest a document into the store.
    ///
    /// Either give a file path (txt, md, pdf, docx) or pass the text
    /// directly with `--title` and `--text`. Adding the same title twice
    /// stores a second copy; there is no dedup or replace.
    Add {
        /// File to ingest. The document title is the file stem.
        path: Option<PathBuf>,

        /// Document title, for use with `--text`.
        #[arg(long, requires = "text", conflicts_with = "path")]
        title: Option<String>,

        /// Document content, for use with `--title`.
        #[arg(long, requires = "title", conflicts_with = "path")]
        text: Option<String>,

        /// Source label stored with the document.
        #[arg(long, default_value = "Local/Manual")]
        source: String,
    },

    /// List the stored documents: one line per distinct title.
    List,

    /// Ask one question and print the answer.
    Ask {
        /// The question to answer from your documents.
        question: String,

        /// Wait for the complete answer instead of streaming it.
        #[arg(long)]
        no_stream: bool,
    },

    /// Start an interactive chat session.
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            println!("Store initialized at {}.", cfg.db.path.display());
        }
        Commands::List => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            let entries = catalog::list_documents(&pool).await?;
            if entries.is_empty() {
                println!("No documents stored yet.");
            }
            for entry in entries {
                println!("{} ({})", entry.title, entry.source);
                println!("  {}", entry.summary);
            }
        }
        Commands::Add {
            path,
            title,
            text,
            source,
        } => {
            let (title, content) = match (path, title, text) {
                (Some(path), None, None) => {
                    let title = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    (title, extract::extract_file(path).await?)
                }
                (None, Some(title), Some(text)) => (title, text),
                _ => bail!("give a file path, or --title together with --text"),
            };
            if title.trim().is_empty() {
                bail!("document title must not be empty");
            }
            if content.trim().is_empty() {
                bail!("document '{}' has no text content", title);
            }

            let api_key = config::resolve_api_key(&cfg)?;
            let embedder = EmbeddingClient::new(
                &cfg.embedding.endpoint,
                &cfg.embedding.model,
                &api_key,
            );
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;

            let count =
                ingest::add_document(&pool, &embedder, &cfg, &title, &content, &source).await?;
            println!("Added '{}' ({} chunks).", title, count);
        }
        Commands::Ask {
            question,
            no_stream,
        } => {
            let api_key = config::resolve_api_key(&cfg)?;
            let embedder = EmbeddingClient::new(
                &cfg.embedding.endpoint,
                &cfg.embedding.model,
                &api_key,
            );
            let chat = ChatClient::new(
                &cfg.chat.endpoint,
                &cfg.chat.model,
                cfg.chat.max_tokens,
                &api_key,
            );
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;

            if no_stream {
                let answer = query::query(&pool, &embedder, &chat, &cfg, &question).await?;
                println!("{}", answer);
            } else {
                let mut rx = query::stream_query(&pool, &embedder, &chat, &cfg, &question).await?;
                while let Some(item) = rx.recv().await {
                    let fragment = item?;
                    print!("{}", fragment);
                    std::io::stdout().flush()?;
                }
                println!();
            }
        }
        Commands::Chat => {
            let api_key = config::resolve_api_key(&cfg)?;
            let embedder = EmbeddingClient::new(
                &cfg.embedding.endpoint,
                &cfg.embedding.model,
                &api_key,
            );
            let chat = ChatClient::new(
                &cfg.chat.endpoint,
                &cfg.chat.model,
                cfg.chat.max_tokens,
                &api_key,
            );
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;

            repl::run(&pool, &embedder, &chat, &cfg).await?;
        }
    }

    Ok(())
}
