//! Core data types that flow through the ingestion and query pipeline.

use serde::Serialize;

/// A bounded span of a document's text, the unit actually stored and
/// searched. Every chunk of the same document carries identical metadata
/// (title, source, summary, full original content) so a document can be
/// reconstructed from any of its chunks.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub title: String,
    pub source: String,
    pub summary: String,
    pub full_content: String,
}

/// One catalog row: a distinct document title with its display metadata.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub title: String,
    pub source: String,
    pub summary: String,
}

/// A chunk returned from similarity search, with its score.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub text: String,
    pub title: String,
    pub score: f32,
}

/// Who said a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of the in-memory chat transcript. The assistant's text is
/// appended to in place while a streaming response is arriving. Never
/// persisted; scoped to a single session.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
