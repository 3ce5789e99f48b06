use std::pin::Pin;
use std::time::Duration;

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use llamaprobe_core::{ProbeError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One incremental piece of generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFragment {
    pub content: String,
}

impl StreamFragment {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<StreamFragment>> + Send>>;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    host: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaModel {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub details: Option<ModelDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelDetails {
    pub parameter_size: Option<String>,
    pub quantization_level: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    #[instrument(skip(self), fields(host = %self.host))]
    pub async fn list_models(&self) -> Result<Vec<OllamaModel>> {
        let url = format!("{}/api/tags", self.host);
        debug!("Fetching models from Ollama API");

        let resp = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if !resp.status().is_success() {
            return Err(ProbeError::Ollama(format!(
                "Failed to list models: {}",
                resp.status()
            )));
        }

        let tags: TagsResponse = resp
            .json()
            .await
            .map_err(|e| ProbeError::Http(e.to_string()))?;

        info!(count = tags.models.len(), "Fetched models from Ollama");
        Ok(tags.models)
    }

    pub async fn list_model_names(&self) -> Result<Vec<String>> {
        let models = self.list_models().await?;
        Ok(models.into_iter().map(|m| m.name).collect())
    }

    /// Fails with [`ProbeError::ModelNotFound`] listing what is installed.
    #[instrument(skip(self), fields(host = %self.host))]
    pub async fn ensure_model_available(&self, model: &str) -> Result<()> {
        let available = self.list_model_names().await?;

        if model_is_listed(&available, model) {
            debug!(model, "Model is available");
            return Ok(());
        }

        warn!(model, "Model not installed");
        Err(ProbeError::ModelNotFound {
            model: model.to_string(),
            available,
        })
    }

    /// Open a streaming chat with a single user message.
    #[instrument(skip(self, prompt), fields(host = %self.host))]
    pub async fn chat_stream(&self, model: &str, prompt: &str) -> Result<FragmentStream> {
        let url = format!("{}/api/chat", self.host);

        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: true,
        };

        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProbeError::Ollama(format!("Chat failed: {} - {}", status, body)));
        }

        debug!("Chat stream opened");
        Ok(fragment_stream(resp.bytes_stream()))
    }

    fn map_request_error(&self, e: reqwest::Error) -> ProbeError {
        if e.is_connect() {
            return ProbeError::ConnectionRefused {
                host: self.host.clone(),
            };
        }
        ProbeError::Http(e.to_string())
    }
}

/// Ollama resolves an untagged name to `:latest`.
pub fn model_is_listed(available: &[String], model: &str) -> bool {
    let tagged = match model.contains(':') {
        true => None,
        false => Some(format!("{}:latest", model)),
    };

    available
        .iter()
        .any(|name| name == model || Some(name) == tagged.as_ref())
}

/// Turn a raw NDJSON byte stream into fragments. Ends at the `done` record.
pub fn fragment_stream<S, B, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(parse_fragments(bytes))
}

fn parse_fragments<S, B, E>(bytes: S) -> impl Stream<Item = Result<StreamFragment>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    try_stream! {
        let mut bytes = Box::pin(bytes);
        let mut lines = LineBuffer::default();
        let mut finished = false;

        'read: while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| ProbeError::Http(e.to_string()))?;
            for line in lines.push(chunk.as_ref()) {
                match parse_chunk_line(&line)? {
                    ChunkLine::Fragment(content) => yield StreamFragment { content },
                    ChunkLine::Done(tail) => {
                        if let Some(content) = tail {
                            yield StreamFragment { content };
                        }
                        finished = true;
                        break 'read;
                    }
                }
            }
        }

        if !finished {
            if let Some(line) = lines.finish() {
                match parse_chunk_line(&line)? {
                    ChunkLine::Fragment(content) => yield StreamFragment { content },
                    ChunkLine::Done(Some(content)) => yield StreamFragment { content },
                    ChunkLine::Done(None) => {}
                }
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ChunkLine {
    Fragment(String),
    /// Final record, with any trailing text it still carries.
    Done(Option<String>),
}

fn parse_chunk_line(line: &str) -> Result<ChunkLine> {
    let chunk: ChatChunk = serde_json::from_str(line).map_err(|e| {
        ProbeError::Http(format!(
            "Failed to parse stream line: {} - Line: {}",
            e,
            line.chars().take(200).collect::<String>()
        ))
    })?;

    if let Some(message) = chunk.error {
        return Err(ProbeError::Ollama(message));
    }

    let content = chunk.message.map(|m| m.content).unwrap_or_default();

    if chunk.done {
        let tail = (!content.is_empty()).then_some(content);
        return Ok(ChunkLine::Done(tail));
    }

    Ok(ChunkLine::Fragment(content))
}

/// Splits a byte stream into complete lines. Bytes are kept until a newline so
/// multi-byte characters split across chunks survive.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(line) = decode_line(&raw) {
                lines.push(line);
            }
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.pending);
        decode_line(&raw)
    }
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
