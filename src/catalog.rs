//! Document catalog: the display-side read path.
//!
//! The store holds chunks, not documents, so the catalog scans every
//! chunk's metadata and keeps the first chunk seen per title. The scan is
//! linear in the total chunk count, which is acceptable for a personal
//! single-user archive; this deliberately preserves the observed contract
//! rather than maintaining a separate title index.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;

use crate::models::CatalogEntry;

/// List distinct documents in first-stored order, one entry per title.
///
/// A title added multiple times shows the summary of whichever chunk was
/// stored first under it. Rows with a missing or empty title are skipped
/// silently. Zero stored chunks yields an empty list, not an error.
pub async fn list_documents(pool: &SqlitePool) -> Result<Vec<CatalogEntry>> {
    let rows = sqlx::query("SELECT title, source, summary FROM chunks ORDER BY rowid ASC")
        .fetch_all(pool)
        .await?;

    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for row in &rows {
        let title: Option<String> = row.try_get("title").ok();
        let title = match title {
            Some(t) if !t.is_empty() => t,
            _ => continue,
        };
        if !seen.insert(title.clone()) {
            continue;
        }
        entries.push(CatalogEntry {
            title,
            source: row.try_get("source").unwrap_or_default(),
            summary: row.try_get("summary").unwrap_or_default(),
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::run_migrations;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    async fn insert_chunk(pool: &SqlitePool, id: &str, title: &str, summary: &str) {
        sqlx::query(
            "INSERT INTO chunks (id, document_id, chunk_index, text, title, source, summary, full_content, created_at)
             VALUES (?, ?, 0, 'text', ?, 'Local/Manual', ?, 'full', 0)",
        )
        .bind(id)
        .bind(id)
        .bind(title)
        .bind(summary)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let pool = test_pool().await;
        let entries = list_documents(&pool).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn dedupes_by_title_keeping_first_seen() {
        let pool = test_pool().await;
        insert_chunk(&pool, "a", "Policy A", "first summary").await;
        insert_chunk(&pool, "b", "Policy B", "other summary").await;
        insert_chunk(&pool, "c", "Policy A", "second summary").await;

        let entries = list_documents(&pool).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Policy A");
        assert_eq!(entries[0].summary, "first summary");
        assert_eq!(entries[1].title, "Policy B");
    }

    #[tokio::test]
    async fn skips_rows_without_title() {
        let pool = test_pool().await;
        insert_chunk(&pool, "a", "", "summary").await;
        insert_chunk(&pool, "b", "Policy B", "summary").await;

        let entries = list_documents(&pool).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Policy B");
    }
}
