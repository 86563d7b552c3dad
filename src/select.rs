//! `ctxbox select`: pick the chunks most relevant to a query and print them.

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use crate::config::Config;
use crate::ingest;
use crate::models::ContextChunk;
use crate::retrieve::format_context;
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One block per chunk with its origin and estimate.
    Text,
    /// Machine-readable selection.
    Json,
    /// Prompt-ready context preamble.
    Prompt,
}

#[derive(Serialize)]
struct SelectOutput<'a> {
    query: &'a str,
    max_tokens: usize,
    total_tokens: usize,
    chunks: &'a [ContextChunk],
}

pub async fn run_select(
    config: &Config,
    query: &str,
    max_tokens: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let max_tokens = max_tokens.unwrap_or(config.retrieval.max_tokens);
    let store = SqliteStore::open(config).await?;
    let chunks = ingest::select(&store, query, max_tokens).await?;
    store.close().await;

    let total_tokens: usize = chunks.iter().map(|c| c.tokens).sum();

    match format {
        OutputFormat::Json => {
            let out = SelectOutput {
                query,
                max_tokens,
                total_tokens,
                chunks: &chunks,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Prompt => {
            println!("{}", format_context(&chunks));
        }
        OutputFormat::Text => {
            if chunks.is_empty() {
                println!("No chunks selected.");
                return Ok(());
            }
            for (i, chunk) in chunks.iter().enumerate() {
                println!(
                    "{}. [{}] {} (~{} tokens)",
                    i + 1,
                    chunk.metadata.kind,
                    chunk.metadata.source,
                    chunk.tokens
                );
                println!("{}", chunk.content);
                println!();
            }
            println!(
                "selected {} chunks, ~{} of {} tokens",
                chunks.len(),
                total_tokens,
                max_tokens
            );
        }
    }

    Ok(())
}
