//! Scripted model shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::StreamExt;
use pdfstudy_backend::document::FileIn;
use pdfstudy_backend::error::GatewayError;
use pdfstudy_backend::gateway::{ContentModel, StructuredRequest, TextStream};
use pdfstudy_backend::schemas::ContentKind;

/// Streams a valid set of whatever kind is requested, one item per chunk.
#[derive(Default)]
pub struct ScriptedModel {
    pub calls: AtomicUsize,
    pub title: Option<String>,
    /// Items to emit instead of the kind's target count.
    pub item_override: Option<usize>,
}

impl ScriptedModel {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn item(kind: ContentKind, i: usize) -> String {
    match kind {
        ContentKind::Quiz => format!(r#"{{"question":"Question {i}?","options":["one","two","three","four"],"answer":"A"}}"#),
        ContentKind::Flashcards | ContentKind::Matching => format!(r#"{{"term":"term {i}","definition":"definition {i}"}}"#),
    }
}

#[async_trait]
impl ContentModel for ScriptedModel {
    async fn stream_structured(&self, request: StructuredRequest) -> Result<TextStream, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let kind = ContentKind::ALL
            .into_iter()
            .find(|k| request.schema_name.starts_with(&k.to_string()))
            .ok_or_else(|| GatewayError::Http("unexpected schema".into()))?;
        let n = self.item_override.unwrap_or_else(|| kind.target_count());

        let mut chunks = vec![r#"{"items":["#.to_string()];
        for i in 0..n {
            let sep = if i == 0 { "" } else { "," };
            chunks.push(format!("{sep}{}", item(kind, i)));
        }
        chunks.push("]}".to_string());
        Ok(futures::stream::iter(chunks.into_iter().map(Ok)).boxed())
    }

    async fn complete_text(&self, _system: &str, _user: &str) -> Result<String, GatewayError> {
        self.title.clone().ok_or_else(|| GatewayError::Http("no title".into()))
    }
}

pub fn pdf_upload(name: &str) -> FileIn {
    FileIn {
        name: name.into(),
        mime: "application/pdf".into(),
        data: format!("data:application/pdf;base64,{}", STANDARD.encode(b"%PDF-1.7 test")),
    }
}
