//! Core data models used throughout the toolbox.
//!
//! A [`ContextSource`] is one ingested origin (a GitHub repository, a web
//! page, or a local file). It owns an ordered list of [`ContextChunk`]s,
//! the bounded segments that retrieval picks from when building a prompt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of chunks a single source may own.
pub const MAX_CHUNKS_PER_SOURCE: usize = 50;

/// Where a source came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Github,
    Url,
    File,
}

/// Ingestion lifecycle of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Loading,
    Ready,
    Error,
}

/// What a chunk contains. Drives strategy selection and the code boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Code,
    Documentation,
    Text,
}

macro_rules! str_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => anyhow::bail!(
                        "unknown {}: '{}'",
                        stringify!($ty),
                        other
                    ),
                }
            }
        }
    };
}

str_enum!(SourceKind { Github => "github", Url => "url", File => "file" });
str_enum!(SourceStatus { Loading => "loading", Ready => "ready", Error => "error" });
str_enum!(ContentKind { Code => "code", Documentation => "documentation", Text => "text" });

/// Provenance attached to every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Origin locator (URL or file name) of the owning source document.
    pub source: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
}

impl ChunkMetadata {
    pub fn new(source: &str, kind: ContentKind) -> Self {
        Self {
            source: source.to_string(),
            kind,
            language: None,
            file_path: None,
            start_line: None,
            end_line: None,
        }
    }
}

/// One bounded segment of ingested content. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextChunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Estimated token count of `content`.
    pub tokens: usize,
}

/// Optional descriptive data about a source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fetched: Option<DateTime<Utc>>,
    /// SHA-256 of the raw text that produced the current chunk list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Failure message when the source is in the `error` state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One ingested origin and the chunks it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// URL or file path.
    pub source: String,
    pub title: String,
    pub status: SourceStatus,
    pub chunks: Vec<ContextChunk>,
    #[serde(default)]
    pub metadata: SourceMetadata,
}

impl ContextSource {
    /// Create a source in the `loading` state with no chunks.
    pub fn new(kind: SourceKind, source: &str, title: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            source: source.to_string(),
            title: title.to_string(),
            status: SourceStatus::Loading,
            chunks: Vec::new(),
            metadata: SourceMetadata::default(),
        }
    }

    /// Transition to `ready` with a fresh chunk list, capped at
    /// [`MAX_CHUNKS_PER_SOURCE`].
    pub fn mark_ready(&mut self, mut chunks: Vec<ContextChunk>, cap: usize) {
        chunks.truncate(cap.min(MAX_CHUNKS_PER_SOURCE));
        self.chunks = chunks;
        self.status = SourceStatus::Ready;
        self.metadata.error = None;
        self.metadata.last_fetched = Some(Utc::now());
    }

    /// Transition to `error`. The chunk list is always emptied.
    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.chunks.clear();
        self.status = SourceStatus::Error;
        self.metadata.error = Some(message.into());
    }

    pub fn total_tokens(&self) -> usize {
        self.chunks.iter().map(|c| c.tokens).sum()
    }
}

/// One raw document produced by a connector, before chunking.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Locator recorded on every chunk (file path or URL).
    pub locator: String,
    pub content: String,
    pub kind: ContentKind,
}

/// Everything a connector returns for one source.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub title: String,
    pub documents: Vec<FetchedDocument>,
    pub file_type: Option<String>,
    pub size: Option<u64>,
}
