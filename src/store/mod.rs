//! Persistence port for context sources.
//!
//! The [`SourceStore`] trait is the only way the application shell reads
//! or writes sources. The chunking and retrieval engine never depends on
//! it: callers load sources from a store and pass plain slices in.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`save_source`](SourceStore::save_source) | Insert or replace a source and its whole chunk list |
//! | [`get_source`](SourceStore::get_source) | Fetch one source with its chunks |
//! | [`list_sources`](SourceStore::list_sources) | All sources, in insertion order |
//! | [`delete_source`](SourceStore::delete_source) | Remove a source and its chunks |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::ContextSource;

#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Insert or update a source. Existing chunks are replaced wholesale;
    /// an update keeps the source's position in [`list_sources`](SourceStore::list_sources).
    async fn save_source(&self, source: &ContextSource) -> Result<()>;

    async fn get_source(&self, id: &str) -> Result<Option<ContextSource>>;

    async fn list_sources(&self) -> Result<Vec<ContextSource>>;

    /// Returns `false` when no source had this ID.
    async fn delete_source(&self, id: &str) -> Result<bool>;
}
