//! # docchat
//!
//! A local-first document chat tool: ingest text, Markdown, PDF and Word
//! files into a SQLite-backed vector store, then ask questions answered by a
//! chat model grounded in the most similar stored chunks.
//!
//! The pipeline is deliberately small:
//!
//! - [`extract`] turns a file into plain text
//! - [`chunker`] splits text into bounded, overlapping chunks
//! - [`embedding`] maps chunks and questions into one vector space
//! - [`ingest`] stores chunks and vectors transactionally
//! - [`catalog`] lists the distinct documents in the store
//! - [`query`] retrieves the top chunks and asks the model
//! - [`repl`] wraps the query engine in an interactive session
//!
//! All remote calls go to a DashScope OpenAI-compatible endpoint; the store
//! is a single SQLite file under the user's data directory.

pub mod catalog;
pub mod chat;
pub mod chunker;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod query;
pub mod repl;
