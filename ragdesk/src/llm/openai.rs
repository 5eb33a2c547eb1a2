//! OpenAI-compatible chat completions client

use std::collections::VecDeque;
use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{FragmentStream, LanguageModel};
use crate::error::{RagError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat model reached over `POST {base_url}/chat/completions`
pub struct OpenAiChat {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Deserialize)]
struct Delta {
    content: Option<String>,
}

impl OpenAiChat {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RagError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.3,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    async fn send(&self, prompt: &str, stream: bool) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            stream,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, url = %url, "Failed to reach chat completions API");
                RagError::Generation(format!("Network error: {}", e))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!(status = %status, error = %error_text, "Chat completions API returned error status");

        let message = match status.as_u16() {
            401 | 403 => format!("Authentication failed ({}): {}", status, error_text),
            429 => format!("Rate limited ({}): {}", status, error_text),
            500..=599 => format!("Server error ({}): {}", status, error_text),
            _ => format!("API error ({}): {}", status, error_text),
        };
        Err(RagError::Generation(message))
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self.send(prompt, false).await?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| RagError::Generation(format!("Malformed completion response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RagError::Generation("Completion response had no content".to_string()))
    }

    async fn stream(&self, prompt: &str) -> Result<FragmentStream> {
        let response = self.send(prompt, true).await?;
        Ok(sse_fragments(response.bytes_stream()))
    }
}

/// One server-sent event relevant to chat streaming
#[derive(Debug, PartialEq, Eq)]
enum SseEvent {
    Data(String),
    Done,
}

/// Line-oriented server-sent-events decoder
#[derive(Default)]
struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    /// Feed raw bytes, returning events from every completed line
    fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = Self::parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line left without a newline
    fn finish(&mut self) -> Option<SseEvent> {
        let line = std::mem::take(&mut self.buffer);
        Self::parse_line(&line)
    }

    fn parse_line(line: &[u8]) -> Option<SseEvent> {
        let line = String::from_utf8_lossy(line);
        let data = line.trim_end_matches(['\r', '\n']).strip_prefix("data:")?.trim_start();

        if data == "[DONE]" {
            Some(SseEvent::Done)
        } else if data.is_empty() {
            None
        } else {
            Some(SseEvent::Data(data.to_string()))
        }
    }
}

fn delta_content(data: &str) -> Option<String> {
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk.choices.into_iter().next().and_then(|c| c.delta.content),
        Err(e) => {
            // Some servers interleave keep-alive or usage chunks
            debug!("Skipping unparseable SSE chunk: {}", e);
            None
        }
    }
}

struct SseState<S> {
    body: std::pin::Pin<Box<S>>,
    parser: SseParser,
    pending: VecDeque<String>,
    done: bool,
}

/// Turn an SSE response body into content fragments
fn sse_fragments<S, B, E>(body: S) -> FragmentStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = SseState {
        body: Box::pin(body),
        parser: SseParser::default(),
        pending: VecDeque::new(),
        done: false,
    };

    let stream = futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(fragment) = st.pending.pop_front() {
                return Some((Ok(fragment), st));
            }
            if st.done {
                return None;
            }

            let events = match st.body.next().await {
                Some(Ok(bytes)) => st.parser.push(bytes.as_ref()),
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(RagError::Generation(format!("Stream error: {}", e))), st));
                }
                None => {
                    st.done = true;
                    st.parser.finish().into_iter().collect()
                }
            };

            for event in events {
                match event {
                    SseEvent::Data(data) => st.pending.extend(delta_content(&data)),
                    SseEvent::Done => {
                        st.done = true;
                        break;
                    }
                }
            }
        }
    });

    Box::pin(stream)
}
