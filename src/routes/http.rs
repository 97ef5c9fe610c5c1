//! HTTP endpoint handlers. These are thin wrappers around the generation gateway.
//! Each handler is instrumented and logs sizes and outcomes, never document contents.

use std::convert::Infallible;
use std::sync::Arc;

use async_stream::stream;
use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::{
    sse::{Event, KeepAlive, Sse},
    IntoResponse, Response,
  },
  Json,
};
use futures::stream::{BoxStream, StreamExt};
use serde::Serialize;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{info, instrument, warn};

use crate::document::{single_document, UploadedDocument};
use crate::error::{DocumentError, GatewayError};
use crate::gateway::{Gateway, GenerationEvent};
use crate::protocol::*;
use crate::schemas::{ContentKind, ContentSchema, ContentSet, FlashcardSchema, MatchingSchema, QuizSchema};
use crate::state::AppState;

/// Shown when no title can be generated.
const FALLBACK_TITLE: &str = "Quiz";

/// Request rejected before any streaming starts.
#[derive(Debug)]
pub enum ApiError {
  BadRequest(String),
  PayloadTooLarge(String),
}

impl From<DocumentError> for ApiError {
  fn from(e: DocumentError) -> Self {
    match e {
      DocumentError::TooLarge { .. } => ApiError::PayloadTooLarge(e.to_string()),
      _ => ApiError::BadRequest(e.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, error) = match self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
      ApiError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m),
    };
    (status, Json(ErrorOut { error })).into_response()
  }
}

type EventStream = BoxStream<'static, Result<Event, Infallible>>;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, generation_enabled: state.gateway.is_enabled() })
}

#[instrument(level = "info", skip(state, body), fields(%kind, files = body.files.len()))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Path(kind): Path<String>,
  Json(body): Json<GenerateIn>,
) -> Result<Sse<EventStream>, ApiError> {
  let kind = ContentKind::ALL
    .into_iter()
    .find(|k| k.to_string() == kind)
    .ok_or_else(|| ApiError::BadRequest(format!("unknown content kind `{kind}`")))?;

  let limits = &state.config.limits;
  let document = single_document(body.files, limits).map_err(|e| {
    info!(target: "pdfstudy", %kind, error = %e, "Upload rejected");
    ApiError::from(e)
  })?;
  info!(target: "pdfstudy", %kind, file = %document.name(), size = document.size(), "HTTP generation started");

  let deadline = Instant::now() + limits.generation_timeout();
  let events = match kind {
    ContentKind::Quiz => sse_events::<QuizSchema>(&state.gateway, document, deadline),
    ContentKind::Flashcards => sse_events::<FlashcardSchema>(&state.gateway, document, deadline),
    ContentKind::Matching => sse_events::<MatchingSchema>(&state.gateway, document, deadline),
  };
  Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// `partial` per completed item, then one `complete` or `error`.
fn sse_events<S: ContentSchema>(gateway: &Gateway, document: UploadedDocument, deadline: Instant) -> EventStream {
  let kind = S::KIND;
  let mut generation = Box::pin(gateway.generate::<S>(document));

  stream! {
    loop {
      match timeout_at(deadline, generation.next()).await {
        Ok(Some(GenerationEvent::Partial(items))) => {
          let observed = items.len();
          yield Ok(json_event("partial", &PartialOut { items, observed, target: kind.target_count() }));
        }
        Ok(Some(GenerationEvent::Complete(set))) => {
          let set: ContentSet = set.into();
          yield Ok(json_event("complete", &set));
          break;
        }
        Ok(Some(GenerationEvent::Failed(e))) => {
          yield Ok(json_event("error", &MessageOut { message: e.to_string() }));
          break;
        }
        Ok(None) => break,
        Err(_) => {
          warn!(target: "generation", %kind, "HTTP generation timed out");
          yield Ok(json_event("error", &MessageOut { message: GatewayError::Timeout.to_string() }));
          break;
        }
      }
    }
  }
  .boxed()
}

fn json_event<T: Serialize>(name: &str, payload: &T) -> Event {
  Event::default()
    .event(name)
    .json_data(payload)
    .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

#[instrument(level = "info", skip(state, body), fields(name_len = body.name.len()))]
pub async fn http_post_title(State(state): State<Arc<AppState>>, Json(body): Json<TitleIn>) -> impl IntoResponse {
  let limit = state.config.limits.generation_timeout();
  let title = match timeout(limit, state.gateway.suggest_title(&body.name)).await {
    Ok(Ok(t)) => t,
    Ok(Err(e)) => {
      warn!(target: "generation", error = %e, "Title generation failed; using fallback");
      FALLBACK_TITLE.to_string()
    }
    Err(_) => {
      warn!(target: "generation", "Title generation timed out; using fallback");
      FALLBACK_TITLE.to_string()
    }
  };
  Json(TitleOut { title })
}
