//! Source listing and inspection for the CLI.
//!
//! `ctxbox list` prints one row per stored source followed by totals;
//! `ctxbox show <id>` prints a single source and every chunk it owns.
//! `add`, `refresh` and `remove` wrap the [`ingest`] lifecycle with
//! console output.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::ingest;
use crate::models::{ContextSource, SourceKind};
use crate::sqlite_store::SqliteStore;
use crate::store::SourceStore;

pub async fn run_list(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let sources = store.list_sources().await?;
    store.close().await;

    if sources.is_empty() {
        println!("No sources. Add one with `ctxbox add`.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<6}  {:<7}  {:>6}  {:>7}  TITLE",
        "ID", "TYPE", "STATUS", "CHUNKS", "TOKENS"
    );
    for s in &sources {
        println!(
            "{:<36}  {:<6}  {:<7}  {:>6}  {:>7}  {}",
            s.id,
            s.kind,
            s.status,
            s.chunks.len(),
            s.total_tokens(),
            s.title
        );
    }

    let totals = ingest::totals(&sources);
    println!();
    println!(
        "{} sources, {} chunks, ~{} tokens",
        totals.sources, totals.chunks, totals.tokens
    );
    Ok(())
}

/// Add one source per locator. Failures are stored in the `error` state,
/// reported, and turned into a non-zero exit once every locator was tried.
pub async fn run_add(config: &Config, kind: SourceKind, locators: &[String]) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let mut failed = 0usize;

    for locator in locators {
        match ingest::add_source(config, &store, kind, locator).await {
            Ok(source) => {
                println!("add {} {}", kind, locator);
                print_summary(&source);
                println!();
            }
            Err(e) => {
                eprintln!("Error: {}: {}", locator, e);
                failed += 1;
            }
        }
    }
    store.close().await;

    if failed > 0 {
        bail!("{} of {} sources failed to ingest", failed, locators.len());
    }
    println!("ok");
    Ok(())
}

pub async fn run_refresh(config: &Config, id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let result = ingest::refresh_source(config, &store, id).await;
    store.close().await;

    let source = result?;
    println!("refresh {}", id);
    print_summary(&source);
    println!("ok");
    Ok(())
}

pub async fn run_remove(config: &Config, id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let removed = ingest::remove_source(&store, id).await?;
    store.close().await;

    if !removed {
        bail!("source not found: {}", id);
    }
    println!("Removed source {}", id);
    Ok(())
}

pub async fn run_show(config: &Config, id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let source = store.get_source(id).await?;
    store.close().await;

    let Some(source) = source else {
        bail!("source not found: {}", id);
    };
    print_source(&source);
    Ok(())
}

/// Print a source summary, used after `add` and `refresh` too.
pub fn print_summary(source: &ContextSource) {
    println!("id:       {}", source.id);
    println!("type:     {}", source.kind);
    println!("title:    {}", source.title);
    println!("source:   {}", source.source);
    println!("status:   {}", source.status);
    println!("chunks:   {}", source.chunks.len());
    println!("tokens:   {}", source.total_tokens());
    if let Some(ref file_type) = source.metadata.file_type {
        println!("mime:     {}", file_type);
    }
    if let Some(size) = source.metadata.size {
        println!("size:     {}", format_bytes(size));
    }
    if let Some(fetched) = source.metadata.last_fetched {
        println!("fetched:  {}", fetched.format("%Y-%m-%dT%H:%M:%SZ"));
    }
    if let Some(ref err) = source.metadata.error {
        println!("error:    {}", err);
    }
}

fn print_source(source: &ContextSource) {
    println!("--- Source ---");
    print_summary(source);
    println!();

    println!("--- Chunks ({}) ---", source.chunks.len());
    for (i, chunk) in source.chunks.iter().enumerate() {
        let meta = &chunk.metadata;
        let mut header = format!(
            "[chunk {}] {} {} ~{} tokens",
            i, meta.kind, meta.source, chunk.tokens
        );
        if let (Some(start), Some(end)) = (meta.start_line, meta.end_line) {
            header.push_str(&format!(" lines {}-{}", start, end));
        }
        println!("{}", header);
        println!("{}", chunk.content);
        println!();
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
