//! Minimal OpenAI-compatible client for our use-cases.
//!
//! We only call chat.completions: streamed with a strict JSON schema for item
//! generation (the PDF travels as a `file` content part), and plain text for titles.
//! Calls are instrumented and log model names, latencies and sizes (not contents).
//!
//! NOTE: We never log the API key or the document payload.

use std::io;
use std::time::{Duration, Instant};

use async_stream::stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::io::StreamReader;
use tracing::{debug, info, instrument, warn};

use crate::error::GatewayError;
use crate::gateway::{ContentModel, StructuredRequest, TextStream};
use crate::util::trunc_for_log;

const UA: &str = "pdfstudy-backend/0.1";

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub title_model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  /// `timeout` bounds each whole request, streamed body included.
  pub fn from_env(timeout: Duration) -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".into());
    let title_model = std::env::var("OPENAI_TITLE_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

    let client = reqwest::Client::builder().timeout(timeout).build().ok()?;

    Some(Self { client, api_key, base_url, model, title_model })
  }

  async fn post(&self, req: &ChatCompletionRequest) -> Result<reqwest::Response, GatewayError> {
    let url = format!("{}/chat/completions", self.base_url);
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, UA)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(req)
      .send()
      .await
      .map_err(|e| GatewayError::Http(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 300));
      warn!(status = status.as_u16(), %message, "Model API returned an error");
      return Err(GatewayError::Api { status: status.as_u16(), message });
    }
    Ok(res)
  }
}

#[async_trait]
impl ContentModel for OpenAI {
  #[instrument(level = "info", skip(self, request), fields(model = %self.model, schema = %request.schema_name, doc_bytes = request.document.size()))]
  async fn stream_structured(&self, request: StructuredRequest) -> Result<TextStream, GatewayError> {
    let req = structured_request(&self.model, request);
    let start = Instant::now();
    let res = self.post(&req).await?;
    info!(elapsed = ?start.elapsed(), "Model stream opened");

    let bytes = res.bytes_stream().map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e)));
    Ok(sse_tokens(bytes, start))
  }

  #[instrument(level = "info", skip(self, system, user), fields(model = %self.title_model))]
  async fn complete_text(&self, system: &str, user: &str) -> Result<String, GatewayError> {
    let req = ChatCompletionRequest {
      model: self.title_model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: MessageContent::Text(system.into()) },
        ChatMessageReq { role: "user".into(), content: MessageContent::Text(user.into()) },
      ],
      temperature: 0.2,
      stream: false,
      response_format: None,
    };
    let res = self.post(&req).await?;
    let body: ChatCompletionResponse = res.json().await.map_err(|e| GatewayError::Http(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    Ok(body.choices.first().and_then(|c| c.message.content.clone()).unwrap_or_default().trim().to_string())
  }
}

fn structured_request(model: &str, request: StructuredRequest) -> ChatCompletionRequest {
  ChatCompletionRequest {
    model: model.to_string(),
    messages: vec![
      ChatMessageReq { role: "system".into(), content: MessageContent::Text(request.system) },
      ChatMessageReq {
        role: "user".into(),
        content: MessageContent::Parts(vec![
          ContentPart::Text { text: request.instruction },
          ContentPart::File {
            file: FilePart {
              filename: request.document.name().to_string(),
              file_data: request.document.data_url().to_string(),
            },
          },
        ]),
      },
    ],
    temperature: 0.3,
    stream: true,
    response_format: Some(ResponseFormat {
      r#type: "json_schema".into(),
      json_schema: Some(JsonSchemaFormat { name: request.schema_name, strict: true, schema: request.schema }),
    }),
  }
}

// --- SSE decoding ---

/// Content tokens from an SSE body. Lines are cut by `AsyncBufReadExt::lines`,
/// so a chunk boundary inside a line (or inside a UTF-8 sequence) is harmless.
fn sse_tokens<S>(bytes: S, start: Instant) -> TextStream
where
  S: Stream<Item = io::Result<Bytes>> + Send + 'static,
{
  let mut lines = BufReader::new(StreamReader::new(Box::pin(bytes))).lines();
  stream! {
    let mut received = 0usize;
    loop {
      let line = match lines.next_line().await {
        Ok(Some(line)) => line,
        Ok(None) => break,
        Err(e) => {
          warn!(error = %e, received, "Model stream interrupted");
          yield Err(GatewayError::Http(e.to_string()));
          return;
        }
      };
      match parse_sse_line(&line) {
        SseLine::Delta(token) => {
          received += token.len();
          yield Ok(token);
        }
        SseLine::Done => {
          info!(elapsed = ?start.elapsed(), received, "Model stream finished");
          return;
        }
        SseLine::Error(message) => {
          yield Err(GatewayError::Api { status: 200, message });
          return;
        }
        SseLine::Skip => {}
      }
    }
    debug!(received, "Model stream closed without [DONE]");
  }
  .boxed()
}

#[derive(Debug, PartialEq)]
enum SseLine {
  Delta(String),
  Done,
  Error(String),
  Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
  let Some(payload) = line.strip_prefix("data:") else {
    return SseLine::Skip;
  };
  let payload = payload.trim();
  if payload == "[DONE]" {
    return SseLine::Done;
  }
  match serde_json::from_str::<ChatChunk>(payload) {
    Ok(chunk) => {
      if let Some(e) = chunk.error {
        return SseLine::Error(e.message);
      }
      match chunk.choices.into_iter().next().and_then(|c| c.delta.content) {
        Some(token) if !token.is_empty() => SseLine::Delta(token),
        _ => SseLine::Skip,
      }
    }
    Err(_) => SseLine::Skip,
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  stream: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: MessageContent }
#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
  Text(String),
  Parts(Vec<ContentPart>),
}
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
  Text { text: String },
  File { file: FilePart },
}
#[derive(Serialize)]
struct FilePart { filename: String, file_data: String }
#[derive(Serialize)]
struct ResponseFormat {
  #[serde(rename = "type")] r#type: String,
  #[serde(skip_serializing_if = "Option::is_none")] json_schema: Option<JsonSchemaFormat>,
}
#[derive(Serialize)]
struct JsonSchemaFormat { name: String, strict: bool, schema: Value }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatChunk {
  #[serde(default)] choices: Vec<ChunkChoice>,
  #[serde(default)] error: Option<EObj>,
}
#[derive(Deserialize)]
struct ChunkChoice { #[serde(default)] delta: ChunkDelta }
#[derive(Deserialize, Default)]
struct ChunkDelta { #[serde(default)] content: Option<String> }

#[derive(Deserialize)]
struct EObj { message: String }

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
