//! In-memory [`SourceStore`] for tests and throwaway sessions.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::SourceStore;
use crate::models::ContextSource;

/// Sources kept in a `Vec` behind a `RwLock`, in insertion order.
#[derive(Default)]
pub struct InMemoryStore {
    sources: RwLock<Vec<ContextSource>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl SourceStore for InMemoryStore {
    async fn save_source(&self, source: &ContextSource) -> Result<()> {
        let mut sources = self.sources.write().map_err(poisoned)?;
        match sources.iter_mut().find(|s| s.id == source.id) {
            Some(existing) => *existing = source.clone(),
            None => sources.push(source.clone()),
        }
        Ok(())
    }

    async fn get_source(&self, id: &str) -> Result<Option<ContextSource>> {
        let sources = self.sources.read().map_err(poisoned)?;
        Ok(sources.iter().find(|s| s.id == id).cloned())
    }

    async fn list_sources(&self) -> Result<Vec<ContextSource>> {
        Ok(self.sources.read().map_err(poisoned)?.clone())
    }

    async fn delete_source(&self, id: &str) -> Result<bool> {
        let mut sources = self.sources.write().map_err(poisoned)?;
        let before = sources.len();
        sources.retain(|s| s.id != id);
        Ok(sources.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SourceKind, SourceStatus};

    #[tokio::test]
    async fn test_save_update_keeps_order() {
        let store = InMemoryStore::new();
        let a = ContextSource::new(SourceKind::Url, "https://a.example", "a.example");
        let mut b = ContextSource::new(SourceKind::File, "b.txt", "b.txt");
        store.save_source(&a).await.unwrap();
        store.save_source(&b).await.unwrap();

        b.status = SourceStatus::Ready;
        store.save_source(&b).await.unwrap();
        let a2 = ContextSource::new(SourceKind::File, "c.txt", "c.txt");
        store.save_source(&a2).await.unwrap();

        let all = store.list_sources().await.unwrap();
        let titles: Vec<_> = all.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["a.example", "b.txt", "c.txt"]);
        assert_eq!(all[1].status, SourceStatus::Ready);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryStore::new();
        let a = ContextSource::new(SourceKind::Url, "https://a.example", "a.example");
        store.save_source(&a).await.unwrap();

        assert!(store.delete_source(&a.id).await.unwrap());
        assert!(!store.delete_source(&a.id).await.unwrap());
        assert!(store.get_source(&a.id).await.unwrap().is_none());
    }
}
