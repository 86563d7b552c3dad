//! # Context Toolbox CLI (`ctxbox`)
//!
//! ## Usage
//!
//! ```bash
//! ctxbox --config ./config/ctxbox.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ctxbox init` | Create the SQLite database and schema |
//! | `ctxbox add github <url>` | Ingest a GitHub repository |
//! | `ctxbox add url <url>` | Ingest a web page |
//! | `ctxbox add file <path>...` | Ingest local files |
//! | `ctxbox list` | List sources with chunk and token totals |
//! | `ctxbox show <id>` | Print a source and its chunks |
//! | `ctxbox refresh <id>` | Re-ingest a source |
//! | `ctxbox remove <id>` | Delete a source and its chunks |
//! | `ctxbox select "<query>"` | Pick relevant chunks within a token budget |
//! | `ctxbox chunk <path>` | Preview chunking of a file (no config needed) |
//! | `ctxbox serve` | Start the HTTP API |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use context_toolbox::config;
use context_toolbox::models::{ContentKind, SourceKind};
use context_toolbox::select::OutputFormat;
use context_toolbox::{migrate, preview, select, server, sources};

/// Context Toolbox: chunk repositories, pages and files, then select the
/// most relevant context for a prompt.
#[derive(Parser)]
#[command(
    name = "ctxbox",
    about = "Chunk code, docs and web pages into token-bounded context for LLM prompts",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ctxbox.toml")]
    config: PathBuf,

    /// Enable debug logging on stderr (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Add and ingest a new source.
    Add {
        #[command(subcommand)]
        target: AddTarget,
    },

    /// List all sources with their status, chunk count and token estimate.
    List,

    /// Print a source's metadata and all of its chunks.
    Show {
        /// Source ID.
        id: String,
    },

    /// Delete a source and its chunks.
    Remove {
        /// Source ID.
        id: String,
    },

    /// Re-run ingestion for a source, keeping its ID.
    Refresh {
        /// Source ID.
        id: String,
    },

    /// Select the chunks most relevant to a query within a token budget.
    Select {
        /// Free-text query.
        query: String,

        /// Token budget. Defaults to `[retrieval].max_tokens`.
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Chunk a local file and print the result without storing anything.
    Chunk {
        /// File to chunk.
        path: PathBuf,

        /// Force a content kind: `code`, `documentation` or `text`.
        #[arg(long)]
        kind: Option<ContentKind>,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum AddTarget {
    /// A GitHub repository URL (https://github.com/owner/repo).
    Github { url: String },
    /// A web page URL.
    Url { url: String },
    /// One or more local files.
    File {
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Preview works without a config file.
    if let Commands::Chunk { path, kind } = &cli.command {
        let cfg = config::load_config_or_minimal(&cli.config)?;
        preview::run_chunk(&cfg, path, *kind)?;
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Add { target } => match target {
            AddTarget::Github { url } => {
                sources::run_add(&cfg, SourceKind::Github, &[url]).await?;
            }
            AddTarget::Url { url } => {
                sources::run_add(&cfg, SourceKind::Url, &[url]).await?;
            }
            AddTarget::File { paths } => {
                sources::run_add(&cfg, SourceKind::File, &paths).await?;
            }
        },
        Commands::List => {
            sources::run_list(&cfg).await?;
        }
        Commands::Show { id } => {
            sources::run_show(&cfg, &id).await?;
        }
        Commands::Remove { id } => {
            sources::run_remove(&cfg, &id).await?;
        }
        Commands::Refresh { id } => {
            sources::run_refresh(&cfg, &id).await?;
        }
        Commands::Select {
            query,
            max_tokens,
            format,
        } => {
            select::run_select(&cfg, &query, max_tokens, format).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        // Handled above.
        Commands::Chunk { .. } => {}
    }

    Ok(())
}
