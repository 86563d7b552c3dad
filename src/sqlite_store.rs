//! SQLite-backed [`SourceStore`].
//!
//! Sources live in `sources`, chunks in `chunks` ordered by
//! `chunk_index`. Saving a source rewrites its chunk rows inside one
//! transaction; deleting it removes both in one transaction.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::models::{ChunkMetadata, ContextChunk, ContextSource, SourceMetadata};
use crate::store::SourceStore;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database, creating the schema if needed.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::migrate_pool(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn load_chunks(&self, source_id: &str) -> Result<Vec<ContextChunk>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content, locator, kind, language, file_path, start_line, end_line, tokens
            FROM chunks WHERE source_id = ? ORDER BY chunk_index ASC
            "#,
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_chunk).collect()
    }

    async fn hydrate(&self, row: &SqliteRow) -> Result<ContextSource> {
        let id: String = row.get("id");
        let kind: String = row.get("kind");
        let status: String = row.get("status");
        let metadata_json: String = row.get("metadata_json");
        let metadata: SourceMetadata = serde_json::from_str(&metadata_json)
            .with_context(|| format!("corrupt metadata for source {}", id))?;
        let chunks = self.load_chunks(&id).await?;

        Ok(ContextSource {
            kind: kind.parse()?,
            source: row.get("locator"),
            title: row.get("title"),
            status: status.parse()?,
            chunks,
            metadata,
            id,
        })
    }
}

fn row_to_chunk(row: &SqliteRow) -> Result<ContextChunk> {
    let kind: String = row.get("kind");
    let start_line: Option<i64> = row.get("start_line");
    let end_line: Option<i64> = row.get("end_line");
    let tokens: i64 = row.get("tokens");

    Ok(ContextChunk {
        id: row.get("id"),
        content: row.get("content"),
        metadata: ChunkMetadata {
            source: row.get("locator"),
            kind: kind.parse()?,
            language: row.get("language"),
            file_path: row.get("file_path"),
            start_line: start_line.map(|n| n as usize),
            end_line: end_line.map(|n| n as usize),
        },
        tokens: tokens as usize,
    })
}

#[async_trait]
impl SourceStore for SqliteStore {
    async fn save_source(&self, source: &ContextSource) -> Result<()> {
        let metadata_json = serde_json::to_string(&source.metadata)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sources (id, kind, locator, title, status, metadata_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                kind = excluded.kind,
                locator = excluded.locator,
                title = excluded.title,
                status = excluded.status,
                metadata_json = excluded.metadata_json
            "#,
        )
        .bind(&source.id)
        .bind(source.kind.as_str())
        .bind(&source.source)
        .bind(&source.title)
        .bind(source.status.as_str())
        .bind(&metadata_json)
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM chunks WHERE source_id = ?")
            .bind(&source.id)
            .execute(&mut *tx)
            .await?;

        for (index, chunk) in source.chunks.iter().enumerate() {
            let meta = &chunk.metadata;
            sqlx::query(
                r#"
                INSERT INTO chunks (id, source_id, chunk_index, content, locator, kind,
                                    language, file_path, start_line, end_line, tokens)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&source.id)
            .bind(index as i64)
            .bind(&chunk.content)
            .bind(&meta.source)
            .bind(meta.kind.as_str())
            .bind(&meta.language)
            .bind(&meta.file_path)
            .bind(meta.start_line.map(|n| n as i64))
            .bind(meta.end_line.map(|n| n as i64))
            .bind(chunk.tokens as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_source(&self, id: &str) -> Result<Option<ContextSource>> {
        let row = sqlx::query(
            "SELECT id, kind, locator, title, status, metadata_json FROM sources WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    async fn list_sources(&self) -> Result<Vec<ContextSource>> {
        let rows = sqlx::query(
            "SELECT id, kind, locator, title, status, metadata_json FROM sources \
             ORDER BY created_at ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut sources = Vec::with_capacity(rows.len());
        for row in &rows {
            sources.push(self.hydrate(row).await?);
        }
        Ok(sources)
    }

    async fn delete_source(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks WHERE source_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM sources WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk;
    use crate::config::Config;
    use crate::models::{ContentKind, SourceKind, SourceStatus};
    use tempfile::TempDir;

    async fn temp_store() -> (TempDir, SqliteStore) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::minimal();
        config.db.path = tmp.path().join("data").join("ctxbox.sqlite");
        let store = SqliteStore::open(&config).await.unwrap();
        (tmp, store)
    }

    #[tokio::test]
    async fn test_round_trip_preserves_chunks() {
        let (_tmp, store) = temp_store().await;
        let mut source = ContextSource::new(SourceKind::File, "app.py", "app.py");
        let chunks = chunk("import os\n\ndef main():\n    pass\n", "app.py", ContentKind::Code);
        source.metadata.file_type = Some("text/x-python".to_string());
        source.mark_ready(chunks.clone(), 50);
        store.save_source(&source).await.unwrap();

        let loaded = store.get_source(&source.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SourceStatus::Ready);
        assert_eq!(loaded.chunks, chunks);
        assert_eq!(loaded.metadata, source.metadata);
    }

    #[tokio::test]
    async fn test_refresh_replaces_chunks_and_keeps_order() {
        let (_tmp, store) = temp_store().await;
        let mut first = ContextSource::new(SourceKind::File, "a.txt", "a.txt");
        first.mark_ready(chunk("one\n\ntwo", "a.txt", ContentKind::Text), 50);
        let second = ContextSource::new(SourceKind::Url, "https://b.example", "b.example");
        store.save_source(&first).await.unwrap();
        store.save_source(&second).await.unwrap();

        first.mark_ready(chunk("three", "a.txt", ContentKind::Text), 50);
        store.save_source(&first).await.unwrap();

        let all = store.list_sources().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[0].chunks.len(), 1);
        assert_eq!(all[0].chunks[0].content, "three");
        assert_eq!(all[1].status, SourceStatus::Loading);
    }

    #[tokio::test]
    async fn test_delete_removes_chunks() {
        let (_tmp, store) = temp_store().await;
        let mut source = ContextSource::new(SourceKind::File, "a.txt", "a.txt");
        source.mark_ready(chunk("hello", "a.txt", ContentKind::Text), 50);
        store.save_source(&source).await.unwrap();

        assert!(store.delete_source(&source.id).await.unwrap());
        assert!(!store.delete_source(&source.id).await.unwrap());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
