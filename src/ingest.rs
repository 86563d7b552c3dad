//! Source lifecycle orchestration.
//!
//! Coordinates the flow: connector → chunking → storage. Every source moves
//! through `loading` and ends in `ready` or `error`:
//!
//! ```text
//! add / refresh ──► loading ──► connector ok ──► ready (chunks, hash)
//!                           └─► connector err ─► error (no chunks, message)
//! ```
//!
//! The source is persisted on every transition, so a crash mid-fetch leaves
//! a visible `loading` row rather than nothing.

use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;

use crate::chunk::chunk_with_budget;
use crate::config::Config;
use crate::connector_file;
use crate::connector_github;
use crate::connector_web;
use crate::error::IngestResult;
use crate::models::{ContextChunk, ContextSource, Fetched, SourceKind, SourceStatus};
use crate::retrieve::select_relevant_chunks;
use crate::store::SourceStore;

/// Build the shared HTTP client used by the GitHub and web connectors.
pub fn http_client(config: &Config) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(config.web.user_agent.clone())
        .timeout(Duration::from_secs(config.web.timeout_secs))
        .build()?;
    Ok(client)
}

/// Run the connector for `kind` against `locator`.
pub async fn fetch(
    config: &Config,
    http: &reqwest::Client,
    kind: SourceKind,
    locator: &str,
) -> IngestResult<Fetched> {
    match kind {
        SourceKind::Github => {
            connector_github::fetch_github_repo(&config.github, http, locator).await
        }
        SourceKind::Url => connector_web::fetch_url(&config.web, http, locator).await,
        SourceKind::File => connector_file::read_file(&config.files, Path::new(locator)),
    }
}

/// Chunk every fetched document in order, using the configured budget.
pub fn chunk_fetched(config: &Config, fetched: &Fetched) -> Vec<ContextChunk> {
    fetched
        .documents
        .iter()
        .flat_map(|doc| {
            chunk_with_budget(&doc.content, &doc.locator, doc.kind, config.chunking.max_tokens)
        })
        .collect()
}

/// SHA-256 over every document locator and body, hex encoded.
pub fn content_hash(fetched: &Fetched) -> String {
    let mut hasher = Sha256::new();
    for doc in &fetched.documents {
        hasher.update(doc.locator.as_bytes());
        hasher.update([0u8]);
        hasher.update(doc.content.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Register a new source and ingest it.
///
/// The source is stored even when ingestion fails: it ends in the `error`
/// state with the failure message, and the error is returned.
pub async fn add_source(
    config: &Config,
    store: &dyn SourceStore,
    kind: SourceKind,
    locator: &str,
) -> Result<ContextSource> {
    let locator = normalize_locator(kind, locator);
    let mut source = ContextSource::new(kind, &locator, &default_title(kind, &locator));
    store.save_source(&source).await?;
    tracing::info!(id = %source.id, kind = %kind, locator = %locator, "source added");

    load(config, store, &mut source).await?;
    Ok(source)
}

/// Re-run the connector for an existing source, keeping its ID.
pub async fn refresh_source(
    config: &Config,
    store: &dyn SourceStore,
    id: &str,
) -> Result<ContextSource> {
    let mut source = store
        .get_source(id)
        .await?
        .ok_or_else(|| anyhow!("source not found: {}", id))?;

    source.status = SourceStatus::Loading;
    store.save_source(&source).await?;
    tracing::info!(id = %source.id, "refreshing source");

    load(config, store, &mut source).await?;
    Ok(source)
}

/// Delete a source and its chunks. Returns `false` if the ID was unknown.
pub async fn remove_source(store: &dyn SourceStore, id: &str) -> Result<bool> {
    let removed = store.delete_source(id).await?;
    if removed {
        tracing::info!(id = %id, "source removed");
    }
    Ok(removed)
}

/// Pick the chunks most relevant to `query` across every stored source.
pub async fn select(
    store: &dyn SourceStore,
    query: &str,
    max_tokens: usize,
) -> Result<Vec<ContextChunk>> {
    let sources = store.list_sources().await?;
    Ok(select_relevant_chunks(query, &sources, max_tokens))
}

/// Aggregate counts across sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Totals {
    pub sources: usize,
    pub chunks: usize,
    pub tokens: usize,
}

pub fn totals(sources: &[ContextSource]) -> Totals {
    Totals {
        sources: sources.len(),
        chunks: sources.iter().map(|s| s.chunks.len()).sum(),
        tokens: sources.iter().map(|s| s.total_tokens()).sum(),
    }
}

async fn load(config: &Config, store: &dyn SourceStore, source: &mut ContextSource) -> Result<()> {
    let http = http_client(config)?;

    let fetched = match fetch(config, &http, source.kind, &source.source).await {
        Ok(fetched) => fetched,
        Err(e) => {
            tracing::warn!(
                id = %source.id,
                locator = %source.source,
                error = %e,
                "ingestion failed"
            );
            source.mark_error(e.to_string());
            store.save_source(source).await?;
            return Err(e.into());
        }
    };

    let chunks = chunk_fetched(config, &fetched);
    let produced = chunks.len();

    source.title = fetched.title.clone();
    source.metadata.file_type = fetched.file_type.clone();
    source.metadata.size = fetched.size;
    source.metadata.content_hash = Some(content_hash(&fetched));
    source.mark_ready(chunks, config.chunking.max_chunks_per_source);
    store.save_source(source).await?;

    tracing::info!(
        id = %source.id,
        documents = fetched.documents.len(),
        chunks = source.chunks.len(),
        dropped = produced - source.chunks.len(),
        "source ready"
    );
    Ok(())
}

fn normalize_locator(kind: SourceKind, locator: &str) -> String {
    let trimmed = locator.trim();
    match kind {
        // Absolute so that a later refresh does not depend on the cwd.
        SourceKind::File => std::fs::canonicalize(trimmed)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| trimmed.to_string()),
        SourceKind::Github | SourceKind::Url => trimmed.to_string(),
    }
}

fn default_title(kind: SourceKind, locator: &str) -> String {
    match kind {
        SourceKind::File => Path::new(locator)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| locator.to_string()),
        SourceKind::Github | SourceKind::Url => locator.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentKind, FetchedDocument};
    use crate::store::memory::InMemoryStore;
    use std::fs;
    use tempfile::TempDir;

    fn doc(locator: &str, content: &str) -> FetchedDocument {
        FetchedDocument {
            locator: locator.to_string(),
            content: content.to_string(),
            kind: ContentKind::Text,
        }
    }

    #[test]
    fn test_content_hash_is_stable_and_sensitive() {
        let a = Fetched {
            title: "t".into(),
            documents: vec![doc("a", "hello")],
            file_type: None,
            size: None,
        };
        let mut b = a.clone();
        assert_eq!(content_hash(&a), content_hash(&b));
        b.documents[0].content.push('!');
        assert_ne!(content_hash(&a), content_hash(&b));
        assert_eq!(content_hash(&a).len(), 64);
    }

    #[test]
    fn test_chunk_fetched_keeps_document_order() {
        let fetched = Fetched {
            title: "t".into(),
            documents: vec![doc("one.txt", "first"), doc("two.txt", "second")],
            file_type: None,
            size: None,
        };
        let chunks = chunk_fetched(&Config::minimal(), &fetched);
        let sources: Vec<_> = chunks.iter().map(|c| c.metadata.source.as_str()).collect();
        assert_eq!(sources, vec!["one.txt", "two.txt"]);
    }

    #[test]
    fn test_totals() {
        let mut a = ContextSource::new(SourceKind::File, "a", "a");
        a.mark_ready(crate::chunk::chunk("aaaa\n\nbbbbbbbb", "a", ContentKind::Text), 50);
        let b = ContextSource::new(SourceKind::File, "b", "b");
        let t = totals(&[a.clone(), b]);
        assert_eq!(t.sources, 2);
        assert_eq!(t.chunks, a.chunks.len());
        assert_eq!(t.tokens, a.total_tokens());
    }

    #[tokio::test]
    async fn test_add_file_then_refresh() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("guide.md");
        fs::write(&path, "# Guide\nInstall the tool.\n## Usage\nRun it.\n").unwrap();

        let config = Config::minimal();
        let store = InMemoryStore::new();
        let source = add_source(&config, &store, SourceKind::File, path.to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(source.status, SourceStatus::Ready);
        assert_eq!(source.title, "guide.md");
        assert_eq!(source.chunks.len(), 2);
        assert_eq!(source.metadata.file_type.as_deref(), Some("text/markdown"));
        let first_hash = source.metadata.content_hash.clone().unwrap();

        fs::write(&path, "# Guide\nNew content only.\n").unwrap();
        let refreshed = refresh_source(&config, &store, &source.id).await.unwrap();
        assert_eq!(refreshed.id, source.id);
        assert_eq!(refreshed.chunks.len(), 1);
        assert_ne!(refreshed.metadata.content_hash.unwrap(), first_hash);
        assert_eq!(store.list_sources().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_add_is_persisted_as_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.txt");
        let store = InMemoryStore::new();

        let locator = missing.to_str().unwrap();
        let err = add_source(&Config::minimal(), &store, SourceKind::File, locator)
            .await
            .unwrap_err();
        assert!(!err.to_string().is_empty());

        let all = store.list_sources().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, SourceStatus::Error);
        assert!(all[0].chunks.is_empty());
        assert!(all[0].metadata.error.is_some());
    }

    #[tokio::test]
    async fn test_chunk_cap_from_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("many.txt");
        let body: Vec<String> = (0..10).map(|i| format!("paragraph {}", i)).collect();
        fs::write(&path, body.join("\n\n")).unwrap();

        let mut config = Config::minimal();
        config.chunking.max_tokens = 3;
        config.chunking.max_chunks_per_source = 4;
        let store = InMemoryStore::new();
        let source = add_source(&config, &store, SourceKind::File, path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(source.chunks.len(), 4);
        assert_eq!(source.chunks[0].content, "paragraph 0");
    }

    #[tokio::test]
    async fn test_remove_and_select() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        fs::write(&path, "alpha beta\n\ngamma delta").unwrap();

        let store = InMemoryStore::new();
        let locator = path.to_str().unwrap();
        let source = add_source(&Config::minimal(), &store, SourceKind::File, locator)
            .await
            .unwrap();

        let picked = select(&store, "alpha", 4000).await.unwrap();
        assert!(!picked.is_empty());
        assert!(picked[0].content.contains("alpha"));

        assert!(remove_source(&store, &source.id).await.unwrap());
        assert!(!remove_source(&store, &source.id).await.unwrap());
        assert!(select(&store, "alpha", 4000).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_unknown_id() {
        let store = InMemoryStore::new();
        let err = refresh_source(&Config::minimal(), &store, "missing").await.unwrap_err();
        assert!(err.to_string().contains("source not found"));
    }
}
