//! WebSocket upgrade + session loop. Each connection owns one `Coordinator`.
//! Client messages become session actions; after every change the server pushes
//! any notices followed by a fresh session snapshot.

use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::coordinator::Coordinator;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "pdfstudy", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "pdfstudy", "WebSocket connected");
  let (mut coordinator, mut results) = Coordinator::new(state.gateway.clone(), state.config.limits.clone());

  if send(&mut socket, &ServerWsMessage::Session { session: coordinator.snapshot() }).await.is_err() {
    return;
  }

  loop {
    let replies = tokio::select! {
      incoming = socket.recv() => match incoming {
        Some(Ok(Message::Text(txt))) => handle_text(&mut coordinator, &txt),
        Some(Ok(Message::Ping(payload))) => {
          let _ = socket.send(Message::Pong(payload)).await;
          Vec::new()
        }
        Some(Ok(Message::Close(_))) | None => break,
        Some(Ok(_)) => Vec::new(),
        Some(Err(e)) => {
          error!(target: "pdfstudy", error = %e, "WS receive error");
          break;
        }
      },
      Some(action) = results.recv() => {
        coordinator.dispatch(action);
        updates(&mut coordinator)
      }
    };

    for reply in &replies {
      if send(&mut socket, reply).await.is_err() {
        info!(target: "pdfstudy", "WebSocket disconnected");
        return;
      }
    }
  }
  info!(target: "pdfstudy", "WebSocket disconnected");
}

/// Replies to one text frame from the client.
fn handle_text(coordinator: &mut Coordinator, txt: &str) -> Vec<ServerWsMessage> {
  match serde_json::from_str::<ClientWsMessage>(txt) {
    Ok(ClientWsMessage::Ping) => vec![ServerWsMessage::Pong],
    Ok(msg) => {
      debug!(target: "session", bytes = txt.len(), "WS message received");
      match msg.into_action() {
        Some(action) => {
          coordinator.dispatch(action);
          updates(coordinator)
        }
        None => Vec::new(),
      }
    }
    Err(e) => vec![ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }],
  }
}

/// Pending notices, then the current snapshot.
fn updates(coordinator: &mut Coordinator) -> Vec<ServerWsMessage> {
  let mut out: Vec<ServerWsMessage> = coordinator
    .take_notices()
    .into_iter()
    .map(|n| ServerWsMessage::Notice { message: n.message() })
    .collect();
  out.push(ServerWsMessage::Session { session: coordinator.snapshot() });
  out
}

async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await.map_err(|e| {
    error!(target: "pdfstudy", error = %e, "WS send error");
    e
  })
}

#[cfg(test)]
mod tests {
  use base64::engine::general_purpose::STANDARD;
  use base64::Engine;
  use serde_json::{json, Value};
  use tokio::sync::mpsc;

  use super::*;
  use crate::config::{Limits, Prompts};
  use crate::gateway::stub::{item_chunks, StubModel};
  use crate::gateway::{ContentModel, Gateway};
  use crate::schemas::ContentKind;
  use crate::session::{Action, Phase};

  fn connect(model: StubModel) -> (Coordinator, mpsc::UnboundedReceiver<Action>) {
    let gateway = Gateway::new(Some(Arc::new(model) as Arc<dyn ContentModel>), Prompts::default());
    Coordinator::new(Arc::new(gateway), Limits::default())
  }

  fn pdf(name: &str) -> Value {
    json!({ "name": name, "type": "application/pdf", "data": format!("data:application/pdf;base64,{}", STANDARD.encode(b"%PDF")) })
  }

  fn frames(replies: &[ServerWsMessage]) -> Vec<Value> {
    replies.iter().map(|r| serde_json::to_value(r).unwrap()).collect()
  }

  fn types(frames: &[Value]) -> Vec<&str> {
    frames.iter().map(|f| f["type"].as_str().unwrap()).collect()
  }

  /// Every batch pushed to the client is zero or more notices closed by one snapshot.
  fn assert_notices_then_session(frames: &[Value]) {
    let (last, notices) = frames.split_last().expect("empty batch");
    assert_eq!(last["type"], "session");
    assert!(notices.iter().all(|f| f["type"] == "notice"), "unexpected order: {:?}", types(frames));
  }

  async fn next_batch(c: &mut Coordinator, rx: &mut mpsc::UnboundedReceiver<Action>) -> Vec<Value> {
    let action = rx.recv().await.expect("coordinator channel closed");
    c.dispatch(action);
    frames(&updates(c))
  }

  #[tokio::test(start_paused = true)]
  async fn select_and_submit_reply_with_notices_before_the_snapshot() {
    let mut model = StubModel::with_chunks(item_chunks(ContentKind::Quiz, 4));
    model.title = Some("Cell Biology".into());
    let (mut c, mut rx) = connect(model);

    let two = json!({ "type": "select_files", "files": [pdf("a.pdf"), pdf("b.pdf")] }).to_string();
    let out = frames(&handle_text(&mut c, &two));
    assert_eq!(types(&out), vec!["notice", "session"]);
    assert_eq!(out[0]["message"], "Please upload a single PDF.");
    assert_eq!(out[1]["session"]["phase"]["state"], "idle");

    let one = json!({ "type": "select_files", "files": [pdf("cells.pdf")] }).to_string();
    let out = frames(&handle_text(&mut c, &one));
    assert_eq!(types(&out), vec!["session"]);
    assert_eq!(out[0]["session"]["file_name"], "cells.pdf");

    let out = frames(&handle_text(&mut c, r#"{"type":"submit"}"#));
    assert_eq!(types(&out), vec!["session"]);
    assert_eq!(out[0]["session"]["phase"]["state"], "awaiting_first_generation");

    while c.session().phase() != Phase::ModeSelectionPending {
      assert_notices_then_session(&next_batch(&mut c, &mut rx).await);
    }
  }

  #[tokio::test(start_paused = true)]
  async fn failed_generation_pushes_its_notice_ahead_of_the_reset_snapshot() {
    let (mut c, mut rx) = connect(StubModel::with_chunks(item_chunks(ContentKind::Quiz, 3)));
    let select = json!({ "type": "select_files", "files": [pdf("cells.pdf")] }).to_string();
    handle_text(&mut c, &select);
    handle_text(&mut c, r#"{"type":"submit"}"#);

    loop {
      let batch = next_batch(&mut c, &mut rx).await;
      assert_notices_then_session(&batch);
      if batch.len() > 1 {
        assert_eq!(types(&batch), vec!["notice", "session"]);
        assert_eq!(batch[0]["message"], "Failed to generate quiz. Please try again.");
        assert_eq!(batch[1]["session"]["phase"]["state"], "idle");
        break;
      }
    }
  }

  #[test]
  fn ping_and_bad_json_do_not_touch_the_session() {
    let (mut c, _rx) = connect(StubModel::default());
    assert_eq!(types(&frames(&handle_text(&mut c, r#"{"type":"ping"}"#))), vec!["pong"]);
    let out = frames(&handle_text(&mut c, "{not json"));
    assert_eq!(types(&out), vec!["error"]);
    assert!(out[0]["message"].as_str().unwrap().starts_with("Invalid JSON"));
  }
}
