//! Chat-completion client (DashScope OpenAI-compatible API).
//!
//! Supports a one-shot [`ChatClient::complete`] call and a streaming
//! [`ChatClient::stream`] variant that delivers answer fragments over a
//! bounded channel as server-sent events arrive. The stream is
//! single-consumer and forward-only; dropping the receiver cancels the
//! producer at its next send, so a consumer can stop early without awaiting
//! the call to completion.

use anyhow::{bail, Result};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Channel depth for streamed fragments. The producer blocks once the
/// consumer falls this far behind.
const STREAM_BUFFER: usize = 32;

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Client for the chat-completions API. Constructed once at startup.
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    api_key: String,
}

impl ChatClient {
    pub fn new(endpoint: &str, model: &str, max_tokens: u32, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_tokens,
            api_key: api_key.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, messages: &[ChatMessage], stream: bool) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.endpoint);
        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            stream,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("chat API error {}: {}", status, body);
        }
        Ok(response)
    }

    /// Issue the exchange and await the full answer as one string.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let response = self.send(messages, false).await?;
        let parsed: ChatResponse = response.json().await?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("chat API returned no content"))
    }

    /// Issue the exchange in streaming mode. Fragments arrive on the
    /// returned channel in model order; concatenating all of them
    /// reconstitutes the full answer. The channel closes when the model
    /// signals completion or an error is delivered.
    pub async fn stream(&self, messages: &[ChatMessage]) -> Result<mpsc::Receiver<Result<String>>> {
        let response = self.send(messages, true).await?;
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut lines = SseLineBuffer::default();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.send(Err(e.into())).await;
                        return;
                    }
                };

                for line in lines.push(&chunk) {
                    match sse_data(&line) {
                        Some("[DONE]") => return,
                        Some(data) => {
                            if let Some(fragment) = delta_content(data) {
                                if tx.send(Ok(fragment)).await.is_err() {
                                    // Consumer stopped listening.
                                    return;
                                }
                            }
                        }
                        None => {}
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// Accumulates raw bytes and yields complete SSE lines, tolerating event
/// payloads split across network chunk boundaries.
///
/// Bytes are buffered undecoded and only complete lines are turned into
/// text, so a multi-byte UTF-8 sequence split across two network chunks
/// survives intact.
#[derive(Default)]
struct SseLineBuffer {
    buf: Vec<u8>,
}

impl SseLineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            lines.push(text.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }
}

/// The payload of a `data:` SSE line, if this is one.
fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// The delta text carried by one stream event, if any.
fn delta_content(data: &str) -> Option<String> {
    let parsed: StreamResponse = serde_json::from_str(data).ok()?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|s| !s.is_empty())
}
