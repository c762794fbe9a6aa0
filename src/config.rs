use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};

/// Placeholder prefix that must not be accepted as a real key.
const KEY_PLACEHOLDER: &str = "sk-...";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            db: DbConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

fn default_api_key_env() -> String {
    "DASHSCOPE_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Per-user application data directory, created on first connect.
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docchat")
        .join("docchat.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_overlap() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of nearest chunks fetched per query. Exactly this many are
    /// requested even when the store holds fewer; no similarity threshold.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// OpenAI-compatible API base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Maximum texts per embeddings API call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_embedding_model(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_endpoint() -> String {
    "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-v1".to_string()
}
fn default_batch_size() -> usize {
    16
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// OpenAI-compatible API base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_chat_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_chat_model() -> String {
    "qwen-plus".to_string()
}
fn default_max_tokens() -> u32 {
    2048
}

/// Load configuration from a TOML file, or fall back to defaults when no
/// path is given. Every setting has a default so a config file is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config file: {}", p.display()))?;
            toml::from_str(&content).with_context(|| "Failed to parse config file")?
        }
        None => Config::default(),
    };

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.overlap must be < chunking.chunk_size");
    }
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }
    Ok(())
}

/// Resolve the API key: environment variable first, then an interactive
/// prompt when running on a terminal. Empty or placeholder keys are rejected.
pub fn resolve_api_key(config: &Config) -> Result<String> {
    if let Ok(key) = std::env::var(&config.api_key_env) {
        let key = key.trim().to_string();
        if is_usable_key(&key) {
            return Ok(key);
        }
    }

    if !std::io::stdin().is_terminal() {
        anyhow::bail!(
            "{} is not set. Export your DashScope API key and try again.",
            config.api_key_env
        );
    }

    print!("Enter your DashScope API key (starts with sk-): ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let key = line.trim().to_string();

    if !is_usable_key(&key) {
        anyhow::bail!("An API key is required to run docchat.");
    }
    Ok(key)
}

fn is_usable_key(key: &str) -> bool {
    !key.is_empty() && !key.starts_with(KEY_PLACEHOLDER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.overlap, 50);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.chat.model, "qwen-plus");
        assert_eq!(config.api_key_env, "DASHSCOPE_API_KEY");
    }

    #[test]
    fn default_db_path_is_under_app_dir() {
        let config = Config::default();
        assert!(config.db.path.ends_with("docchat/docchat.sqlite"));
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [chunking]
            chunk_size = 800

            [chat]
            model = "qwen-max"
            "#,
        )
        .unwrap();
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.overlap, 50);
        assert_eq!(config.chat.model, "qwen-max");
        assert_eq!(config.embedding.model, "text-embedding-v1");
    }

    #[test]
    fn rejects_overlap_ge_chunk_size() {
        let config: Config = toml::from_str(
            r#"
            [chunking]
            chunk_size = 50
            overlap = 50
            "#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn placeholder_key_is_not_usable() {
        assert!(!is_usable_key(""));
        assert!(!is_usable_key("sk-..."));
        assert!(is_usable_key("sk-real-key-123"));
    }
}
