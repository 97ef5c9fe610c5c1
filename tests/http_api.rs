mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pdfstudy_backend::config::AppConfig;
use pdfstudy_backend::gateway::ContentModel;
use pdfstudy_backend::routes::build_router;
use pdfstudy_backend::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{pdf_upload, ScriptedModel};

fn app(model: Option<Arc<ScriptedModel>>) -> Router {
    let model = model.map(|m| m as Arc<dyn ContentModel>);
    build_router(Arc::new(AppState::with_model(model, AppConfig::default())))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(res: axum::response::Response) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// `(event, data)` pairs of an SSE body.
fn sse_events(body: &str) -> Vec<(String, Value)> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(e) = line.strip_prefix("event:") {
                    event = Some(e.trim().to_string());
                } else if let Some(d) = line.strip_prefix("data:") {
                    data = serde_json::from_str(d.trim()).ok();
                }
            }
            Some((event?, data?))
        })
        .collect()
}

#[tokio::test]
async fn health_reports_generation_availability() {
    let res = app(None)
        .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(res).await).unwrap();
    assert_eq!(body, json!({ "ok": true, "generationEnabled": false }));
}

#[tokio::test]
async fn quiz_generation_streams_partials_then_the_set() {
    let model = Arc::new(ScriptedModel::default());
    let res = app(Some(model.clone()))
        .oneshot(post_json("/api/v1/generate/quiz", json!({ "files": [pdf_upload("notes.pdf")] })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/event-stream"));

    let events = sse_events(&body_text(res).await);
    let observed: Vec<u64> = events
        .iter()
        .filter(|(e, _)| e == "partial")
        .map(|(_, d)| d["observed"].as_u64().unwrap())
        .collect();
    assert_eq!(observed, vec![1, 2, 3, 4]);

    let (last, data) = events.last().unwrap();
    assert_eq!(last, "complete");
    assert_eq!(data["kind"], "quiz");
    assert_eq!(data["items"].as_array().unwrap().len(), 4);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn matching_set_gets_ids() {
    let res = app(Some(Arc::new(ScriptedModel::default())))
        .oneshot(post_json("/api/v1/generate/matching", json!({ "files": [pdf_upload("notes.pdf")] })))
        .await
        .unwrap();
    let events = sse_events(&body_text(res).await);
    let (_, data) = events.iter().find(|(e, _)| e == "complete").unwrap();
    let items = data["items"].as_array().unwrap();
    assert_eq!(items.len(), 6);
    assert!(items.iter().all(|i| i["id"].as_str().is_some_and(|id| !id.is_empty())));
}

#[tokio::test]
async fn wrong_item_count_ends_in_an_error_event() {
    let model = Arc::new(ScriptedModel { item_override: Some(3), ..ScriptedModel::default() });
    let res = app(Some(model))
        .oneshot(post_json("/api/v1/generate/flashcards", json!({ "files": [pdf_upload("notes.pdf")] })))
        .await
        .unwrap();
    let events = sse_events(&body_text(res).await);
    let (last, data) = events.last().unwrap();
    assert_eq!(last, "error");
    assert!(data["message"].as_str().unwrap().contains("expected exactly 8 items"));
    assert!(!events.iter().any(|(e, _)| e == "complete"));
}

#[tokio::test]
async fn invalid_uploads_are_rejected_before_streaming() {
    let model = Arc::new(ScriptedModel::default());
    let app = app(Some(model.clone()));

    let res = app.clone().oneshot(post_json("/api/v1/generate/essay", json!({ "files": [pdf_upload("a.pdf")] }))).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(post_json("/api/v1/generate/quiz", json!({ "files": [pdf_upload("a.pdf"), pdf_upload("b.pdf")] })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let mut png = pdf_upload("a.png");
    png.mime = "image/png".into();
    let res = app.clone().oneshot(post_json("/api/v1/generate/quiz", json!({ "files": [png] }))).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_text(res).await).unwrap();
    assert!(body["error"].as_str().unwrap().contains("image/png"));

    let mut big = pdf_upload("big.pdf");
    big.data = format!("data:application/pdf;base64,{}", STANDARD.encode(vec![0u8; 5 * 1024 * 1024 + 1]));
    let res = app.oneshot(post_json("/api/v1/generate/quiz", json!({ "files": [big] }))).await.unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn title_uses_the_model_or_falls_back() {
    let model = Arc::new(ScriptedModel { title: Some("Photosynthesis Basics".into()), ..ScriptedModel::default() });
    let res = app(Some(model)).oneshot(post_json("/api/v1/title", json!({ "name": "bio-ch3.pdf" }))).await.unwrap();
    let body: Value = serde_json::from_str(&body_text(res).await).unwrap();
    assert_eq!(body["title"], "Photosynthesis Basics");

    let res = app(None).oneshot(post_json("/api/v1/title", json!({ "name": "bio-ch3.pdf" }))).await.unwrap();
    let body: Value = serde_json::from_str(&body_text(res).await).unwrap();
    assert_eq!(body["title"], "Quiz");
}
