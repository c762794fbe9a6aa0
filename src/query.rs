//! Query engine: retrieve, augment, generate.
//!
//! A question is embedded with the same client used at ingestion, ranked
//! against every stored chunk vector by cosine similarity, and the top-k
//! chunk texts become the grounding context for a two-message exchange with
//! the chat model. Exactly k results are requested with no similarity
//! threshold; when the store holds fewer (or none) the context block simply
//! shrinks (or is empty) and the model is relied upon to say it does not
//! know. Errors at either step propagate to the caller undecorated.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use tokio::sync::mpsc;

use crate::chat::{ChatClient, ChatMessage};
use crate::config::Config;
use crate::embedding::{blob_to_vec, cosine_similarity, EmbeddingClient};
use crate::models::RetrievedChunk;

/// Grounding instruction wrapped around the retrieved context. The same
/// wording is used for streaming and non-streaming queries.
const SYSTEM_PROMPT: &str = "You are a helpful assistant. Use the following context to answer \
the user's question.\nIf the answer is not in the context, say you don't know. Do not invent \
facts.\n\nContext:\n";

/// Answer a question in one shot, awaiting the full reply.
pub async fn query(
    pool: &SqlitePool,
    embedder: &EmbeddingClient,
    chat: &ChatClient,
    config: &Config,
    question: &str,
) -> Result<String> {
    let messages = retrieve_and_augment(pool, embedder, config, question).await?;
    chat.complete(&messages).await
}

/// Answer a question in streaming mode. Fragments arrive on the returned
/// channel in model order; their concatenation equals the answer `query`
/// would return for the same model output. Dropping the receiver stops the
/// stream.
pub async fn stream_query(
    pool: &SqlitePool,
    embedder: &EmbeddingClient,
    chat: &ChatClient,
    config: &Config,
    question: &str,
) -> Result<mpsc::Receiver<Result<String>>> {
    let messages = retrieve_and_augment(pool, embedder, config, question).await?;
    chat.stream(&messages).await
}

async fn retrieve_and_augment(
    pool: &SqlitePool,
    embedder: &EmbeddingClient,
    config: &Config,
    question: &str,
) -> Result<Vec<ChatMessage>> {
    let query_vec = embedder.embed_query(question).await?;
    let chunks = top_chunks(pool, &query_vec, config.retrieval.top_k).await?;
    Ok(build_messages(&build_context(&chunks), question))
}

/// Rank every stored chunk against the query vector and keep the top k.
///
/// The scan loads all vectors and computes cosine similarity in process;
/// the store is a personal archive, not a shared index.
pub async fn top_chunks(
    pool: &SqlitePool,
    query_vec: &[f32],
    k: usize,
) -> Result<Vec<RetrievedChunk>> {
    let rows = sqlx::query(
        r#"
        SELECT c.text, c.title, v.embedding
        FROM chunk_vectors v
        JOIN chunks c ON c.id = v.chunk_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut candidates: Vec<RetrievedChunk> = rows
        .iter()
        .map(|row| {
            let blob: Vec<u8> = row.get("embedding");
            let vec = blob_to_vec(&blob);
            RetrievedChunk {
                text: row.get("text"),
                title: row.get("title"),
                score: cosine_similarity(query_vec, &vec),
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(k);

    Ok(candidates)
}

/// Concatenate retrieved chunk texts into one context block, separated by
/// blank lines. Zero chunks produce an empty block.
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The two-message exchange sent to the model: grounding instruction plus
/// context as the system turn, the raw question as the user turn.
pub fn build_messages(context: &str, question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!("{}{}", SYSTEM_PROMPT, context)),
        ChatMessage::user(question),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ingest::{chunk_document, store_chunks};
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

    async fn store_one(pool: &SqlitePool, title: &str, text: &str, vector: Vec<f32>) {
        let config = Config::default();
        let chunks = chunk_document(&config, title, text, "");
        assert_eq!(chunks.len(), 1);
        store_chunks(pool, &chunks, &[vector]).await.unwrap();
    }

    #[tokio::test]
    async fn ranks_by_cosine_and_truncates_to_k() {
        let pool = test_pool().await;
        store_one(&pool, "Leave", "Employees get 20 days leave.", vec![1.0, 0.0]).await;
        store_one(&pool, "Remote", "Remote work needs approval.", vec![0.0, 1.0]).await;
        store_one(&pool, "Mixed", "Leave requests go through HR.", vec![0.7, 0.7]).await;

        let top = top_chunks(&pool, &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].title, "Leave");
        assert_eq!(top[1].title, "Mixed");
        assert!(top[0].score > top[1].score);
    }

    #[tokio::test]
    async fn fewer_stored_than_k_returns_what_exists() {
        let pool = test_pool().await;
        store_one(&pool, "Leave", "Employees get 20 days leave.", vec![1.0, 0.0]).await;

        let top = top_chunks(&pool, &[1.0, 0.0], 3).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn empty_store_yields_empty_context() {
        let pool = test_pool().await;
        let top = top_chunks(&pool, &[1.0, 0.0], 3).await.unwrap();
        assert!(top.is_empty());
        assert_eq!(build_context(&top), "");
    }

    #[test]
    fn context_joins_chunks_with_blank_lines() {
        let chunks = vec![
            RetrievedChunk {
                text: "First chunk.".to_string(),
                title: "A".to_string(),
                score: 0.9,
            },
            RetrievedChunk {
                text: "Second chunk.".to_string(),
                title: "B".to_string(),
                score: 0.8,
            },
        ];
        assert_eq!(build_context(&chunks), "First chunk.\n\nSecond chunk.");
    }

    #[test]
    fn messages_carry_prompt_context_and_raw_question() {
        let messages = build_messages("Employees get 20 days leave.", "How many leave days?");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("say you don't know"));
        assert!(messages[0].content.contains("Do not invent facts."));
        assert!(messages[0].content.ends_with("Employees get 20 days leave."));
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "How many leave days?");
    }
}
