//! `ctxbox chunk`: show how a local file would be chunked, without storing it.

use anyhow::Result;
use std::path::Path;

use crate::chunk::chunk_with_budget;
use crate::config::Config;
use crate::connector_file;
use crate::models::ContentKind;

pub fn run_chunk(config: &Config, path: &Path, kind: Option<ContentKind>) -> Result<()> {
    let fetched = connector_file::read_file(&config.files, path)?;

    let mut total_tokens = 0usize;
    let mut count = 0usize;
    for doc in &fetched.documents {
        let kind = kind.unwrap_or(doc.kind);
        let chunks =
            chunk_with_budget(&doc.content, &doc.locator, kind, config.chunking.max_tokens);
        for chunk in &chunks {
            let meta = &chunk.metadata;
            let mut header = format!(
                "--- chunk {} [{}] ~{} tokens",
                count, meta.kind, chunk.tokens
            );
            if let Some(ref lang) = meta.language {
                header.push_str(&format!(" {}", lang));
            }
            if let (Some(start), Some(end)) = (meta.start_line, meta.end_line) {
                header.push_str(&format!(" lines {}-{}", start, end));
            }
            println!("{} ---", header);
            println!("{}", chunk.content);
            println!();
            count += 1;
            total_tokens += chunk.tokens;
        }
    }

    println!("{}: {} chunks, ~{} tokens", fetched.title, count, total_tokens);
    Ok(())
}
