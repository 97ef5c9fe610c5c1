//! Generation gateway: one fixed-prompt model call per request, relayed as a
//! stream of growing item arrays that ends in a validated set or a failure.
//!
//! The model itself sits behind `ContentModel` so the gateway can run against
//! the OpenAI client in production and a scripted stub in tests.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::config::Prompts;
use crate::document::UploadedDocument;
use crate::error::GatewayError;
use crate::json_stream::ArrayScanner;
use crate::schemas::{ContentKind, ContentSchema, ContentSet, FlashcardSchema, MatchingSchema, QuizSchema};
use crate::util::fill_template;

/// Text deltas streamed back by a model.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, GatewayError>> + Send>>;

/// One structured-output request: instructions, the attached PDF, and the
/// JSON schema the model must follow (an object holding an `items` array).
#[derive(Clone, Debug)]
pub struct StructuredRequest {
  pub system: String,
  pub instruction: String,
  pub document: UploadedDocument,
  pub schema_name: String,
  pub schema: Value,
}

#[async_trait]
pub trait ContentModel: Send + Sync {
  /// Start a streaming structured completion.
  async fn stream_structured(&self, request: StructuredRequest) -> Result<TextStream, GatewayError>;

  /// Plain one-shot completion.
  async fn complete_text(&self, system: &str, user: &str) -> Result<String, GatewayError>;
}

/// What a typed generation stream yields.
#[derive(Debug)]
pub enum GenerationEvent<S: ContentSchema> {
  /// Every item completed so far, in model order.
  Partial(Vec<S::Draft>),
  Complete(S::Set),
  Failed(GatewayError),
}

/// Kind-erased progress of a generation, as the coordinator consumes it.
#[derive(Clone, Debug, PartialEq)]
pub enum GenerationUpdate {
  Started,
  Progress { observed: usize },
  Finished(ContentSet),
  Failed(String),
}

impl<S: ContentSchema> From<GenerationEvent<S>> for GenerationUpdate {
  fn from(ev: GenerationEvent<S>) -> Self {
    match ev {
      GenerationEvent::Partial(items) => GenerationUpdate::Progress { observed: items.len() },
      GenerationEvent::Complete(set) => GenerationUpdate::Finished(set.into()),
      GenerationEvent::Failed(e) => GenerationUpdate::Failed(e.to_string()),
    }
  }
}

/// Wrap the per-item schema the way structured output wants it: a root object.
pub fn items_schema(item_schema: Value) -> Value {
  json!({
    "type": "object",
    "properties": {
      "items": { "type": "array", "items": item_schema }
    },
    "required": ["items"],
    "additionalProperties": false
  })
}

pub struct Gateway {
  model: Option<Arc<dyn ContentModel>>,
  prompts: Prompts,
}

impl Gateway {
  pub fn new(model: Option<Arc<dyn ContentModel>>, prompts: Prompts) -> Self {
    Self { model, prompts }
  }

  pub fn is_enabled(&self) -> bool {
    self.model.is_some()
  }

  fn request_for<S: ContentSchema>(&self, document: UploadedDocument) -> StructuredRequest {
    let prompt = self.prompts.for_kind(S::KIND);
    let count = S::KIND.target_count().to_string();
    StructuredRequest {
      system: fill_template(&prompt.system, &[("count", &count)]),
      instruction: fill_template(&prompt.instruction, &[("count", &count)]),
      document,
      schema_name: format!("{}_items", S::KIND),
      schema: items_schema(S::item_schema()),
    }
  }

  /// Generate one set of kind `S` from `document`.
  ///
  /// Yields a `Partial` for each completed item, then exactly one of `Complete`
  /// or `Failed`. Nothing invalid is ever reported as complete.
  pub fn generate<S: ContentSchema>(&self, document: UploadedDocument) -> impl Stream<Item = GenerationEvent<S>> + Send + 'static {
    let model = self.model.clone();
    let request = self.request_for::<S>(document);

    stream! {
      let Some(model) = model else {
        yield GenerationEvent::Failed(GatewayError::Disabled);
        return;
      };
      let kind = S::KIND;
      info!(target: "generation", %kind, file = %request.document.name(), size = request.document.size(), "Generation requested");

      let mut text = match model.stream_structured(request).await {
        Ok(t) => t,
        Err(e) => {
          warn!(target: "generation", %kind, error = %e, "Model call failed");
          yield GenerationEvent::Failed(e);
          return;
        }
      };

      let mut scanner = ArrayScanner::new();
      let mut drafts: Vec<S::Draft> = Vec::new();
      while let Some(chunk) = text.next().await {
        let chunk = match chunk {
          Ok(c) => c,
          Err(e) => {
            warn!(target: "generation", %kind, error = %e, observed = drafts.len(), "Model stream failed");
            yield GenerationEvent::Failed(e);
            return;
          }
        };
        let completed = scanner.feed(&chunk);
        if completed.is_empty() {
          continue;
        }
        for raw in completed {
          match serde_json::from_str::<S::Draft>(&raw) {
            Ok(d) => drafts.push(d),
            Err(e) => {
              warn!(target: "generation", %kind, index = drafts.len(), error = %e, "Malformed item");
              yield GenerationEvent::Failed(GatewayError::MalformedItem(format!("item {}: {}", drafts.len(), e)));
              return;
            }
          }
        }
        debug!(target: "generation", %kind, observed = drafts.len(), "Partial result");
        yield GenerationEvent::Partial(drafts.clone());
      }

      if !scanner.is_closed() {
        warn!(target: "generation", %kind, observed = drafts.len(), "Model output truncated");
        yield GenerationEvent::Failed(GatewayError::Truncated);
        return;
      }
      match S::finish(drafts) {
        Ok(set) => {
          info!(target: "generation", %kind, "Generated set validated");
          yield GenerationEvent::Complete(set);
        }
        Err(e) => {
          warn!(target: "generation", %kind, error = %e, "Generated set rejected");
          yield GenerationEvent::Failed(e.into());
        }
      }
    }
  }

  /// Kind-erased `generate`, for callers that pick the kind at runtime.
  pub fn generate_kind(&self, kind: ContentKind, document: UploadedDocument) -> BoxStream<'static, GenerationUpdate> {
    match kind {
      ContentKind::Quiz => self.generate::<QuizSchema>(document).map(GenerationUpdate::from).boxed(),
      ContentKind::Flashcards => self.generate::<FlashcardSchema>(document).map(GenerationUpdate::from).boxed(),
      ContentKind::Matching => self.generate::<MatchingSchema>(document).map(GenerationUpdate::from).boxed(),
    }
  }

  /// Best-effort display title derived from a file name.
  #[instrument(level = "info", skip(self), fields(name_len = filename.len()))]
  pub async fn suggest_title(&self, filename: &str) -> Result<String, GatewayError> {
    let model = self.model.as_ref().ok_or(GatewayError::Disabled)?;
    let user = fill_template(&self.prompts.title_user_template, &[("file", filename)]);
    let raw = model.complete_text(&self.prompts.title_system, &user).await?;
    clean_title(&raw).ok_or(GatewayError::EmptyTitle)
  }
}

const MAX_TITLE_CHARS: usize = 60;

/// First non-empty line, without surrounding quotes, capped in length.
fn clean_title(raw: &str) -> Option<String> {
  let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
  let line = line.trim_matches(|c: char| c == '"' || c == '\'' || c == '*').trim();
  if line.is_empty() {
    return None;
  }
  Some(line.chars().take(MAX_TITLE_CHARS).collect())
}
