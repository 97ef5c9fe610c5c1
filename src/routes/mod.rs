//! One router for everything the browser talks to. The study session runs over
//! `/ws`; the stateless `/api/v1` endpoints serve the same generation to plain
//! HTTP clients. Anything else falls through to the bundled SPA.

use std::sync::Arc;

use axum::{
  extract::DefaultBodyLimit,
  routing::{get, post},
  Router,
};
use tower_http::{
  cors::{Any, CorsLayer},
  services::{ServeDir, ServeFile},
  trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::Limits;
use crate::state::AppState;

pub mod http;
pub mod ws;

const STATIC_DIR: &str = "./static";

/// Largest request body accepted. Uploads travel base64-encoded inside JSON,
/// so the raw file limit grows by a third plus room for the envelope.
fn request_body_limit(limits: &Limits) -> usize {
  limits.max_upload_bytes / 3 * 4 + 64 * 1024
}

fn api_routes() -> Router<Arc<AppState>> {
  Router::new()
    .route("/health", get(http::http_health))
    .route("/generate/:kind", post(http::http_post_generate))
    .route("/title", post(http::http_post_title))
}

pub fn build_router(state: Arc<AppState>) -> Router {
  let body_limit = request_body_limit(&state.config.limits);

  let spa = ServeDir::new(STATIC_DIR)
    .append_index_html_on_directories(true)
    .not_found_service(ServeFile::new(format!("{STATIC_DIR}/index.html")));

  // The browser build may be served from another origin during development.
  let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

  let trace = TraceLayer::new_for_http()
    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
    .on_request(DefaultOnRequest::new().level(Level::DEBUG))
    .on_response(DefaultOnResponse::new().level(Level::INFO));

  Router::new()
    .route("/ws", get(ws::ws_upgrade))
    .nest("/api/v1", api_routes())
    .with_state(state)
    .layer(DefaultBodyLimit::max(body_limit))
    .layer(cors)
    .layer(trace)
    .fallback_service(spa)
}
