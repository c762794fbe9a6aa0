//! Document ingestion: summary, chunking, embedding, transactional store.
//!
//! `add_document` is all-or-nothing from the caller's perspective: chunks
//! and their vectors land in one transaction, so either every chunk of a
//! document persists or none does. Failures during embedding or storage
//! propagate as a single error with nothing written.

use anyhow::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::chunker::split_text;
use crate::config::Config;
use crate::embedding::{vec_to_blob, EmbeddingClient};
use crate::models::Chunk;

/// Characters of content kept as the display summary.
const SUMMARY_CHARS: usize = 200;

/// The display summary for a document: the content itself when short, or
/// its first 200 characters with an ellipsis marker.
pub fn summarize(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= SUMMARY_CHARS {
        content.to_string()
    } else {
        let head: String = chars[..SUMMARY_CHARS].iter().collect();
        format!("{}...", head)
    }
}

/// Split a document into chunks carrying identical metadata.
///
/// Title and content are expected non-empty; that precondition is enforced
/// by the CLI and REPL callers, not here.
pub fn chunk_document(config: &Config, title: &str, content: &str, source: &str) -> Vec<Chunk> {
    let document_id = Uuid::new_v4().to_string();
    let summary = summarize(content);

    split_text(content, config.chunking.chunk_size, config.chunking.overlap)
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.clone(),
            chunk_index: i as i64,
            text,
            title: title.to_string(),
            source: source.to_string(),
            summary: summary.clone(),
            full_content: content.to_string(),
        })
        .collect()
}

/// Ingest one document: chunk, embed every chunk, store chunks and vectors
/// transactionally. Returns the number of chunks written.
///
/// Adding the same title twice appends a second, independent set of chunks;
/// there is no dedup on content and no replace.
pub async fn add_document(
    pool: &SqlitePool,
    embedder: &EmbeddingClient,
    config: &Config,
    title: &str,
    content: &str,
    source: &str,
) -> Result<usize> {
    let chunks = chunk_document(config, title, content, source);
    if chunks.is_empty() {
        return Ok(0);
    }

    // Embed everything before touching the store so a failed batch writes
    // nothing.
    let mut vectors = Vec::with_capacity(chunks.len());
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    for batch in texts.chunks(config.embedding.batch_size) {
        vectors.extend(embedder.embed(batch).await?);
    }

    store_chunks(pool, &chunks, &vectors).await?;
    Ok(chunks.len())
}

/// Write chunks and their embedding vectors in a single transaction.
pub async fn store_chunks(pool: &SqlitePool, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
    anyhow::ensure!(
        chunks.len() == vectors.len(),
        "chunk/vector count mismatch: {} vs {}",
        chunks.len(),
        vectors.len()
    );

    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
        sqlx::query(
            r#"
            INSERT INTO chunks (id, document_id, chunk_index, text, title, source, summary, full_content, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.document_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .bind(&chunk.title)
        .bind(&chunk.source)
        .bind(&chunk.summary)
        .bind(&chunk.full_content)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO chunk_vectors (chunk_id, dims, embedding) VALUES (?, ?, ?)")
            .bind(&chunk.id)
            .bind(vector.len() as i64)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}
