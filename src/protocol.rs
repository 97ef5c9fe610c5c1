//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::document::FileIn;
use crate::modes::{FlashcardAction, MatchingAction, QuizAction};
use crate::schemas::{AnswerKey, ContentKind};
use crate::session::{Action, SessionSnapshot};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    SelectFiles {
        files: Vec<FileIn>,
    },
    Submit,
    SelectMode {
        mode: ContentKind,
    },
    Reset,
    QuizAnswer {
        answer: AnswerKey,
    },
    QuizNext,
    QuizPrev,
    QuizRestart,
    FlashcardFlip,
    FlashcardNext,
    FlashcardPrev,
    FlashcardRestart,
    MatchTerm {
        id: String,
    },
    MatchDefinition {
        id: String,
    },
    MatchRestart,
}

impl ClientWsMessage {
    /// Session action carried by this message; `None` for transport-level messages.
    pub fn into_action(self) -> Option<Action> {
        let action = match self {
            ClientWsMessage::Ping => return None,
            ClientWsMessage::SelectFiles { files } => Action::SelectFiles(files),
            ClientWsMessage::Submit => Action::Submit,
            ClientWsMessage::SelectMode { mode } => Action::SelectMode(mode),
            ClientWsMessage::Reset => Action::Reset,
            ClientWsMessage::QuizAnswer { answer } => Action::Quiz(QuizAction::Answer(answer)),
            ClientWsMessage::QuizNext => Action::Quiz(QuizAction::Next),
            ClientWsMessage::QuizPrev => Action::Quiz(QuizAction::Prev),
            ClientWsMessage::QuizRestart => Action::Quiz(QuizAction::Restart),
            ClientWsMessage::FlashcardFlip => Action::Flashcards(FlashcardAction::Flip),
            ClientWsMessage::FlashcardNext => Action::Flashcards(FlashcardAction::Next),
            ClientWsMessage::FlashcardPrev => Action::Flashcards(FlashcardAction::Prev),
            ClientWsMessage::FlashcardRestart => Action::Flashcards(FlashcardAction::Restart),
            ClientWsMessage::MatchTerm { id } => Action::Matching(MatchingAction::SelectTerm(id)),
            ClientWsMessage::MatchDefinition { id } => Action::Matching(MatchingAction::SelectDefinition(id)),
            ClientWsMessage::MatchRestart => Action::Matching(MatchingAction::Restart),
        };
        Some(action)
    }
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        session: SessionSnapshot,
    },
    Notice {
        message: String,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    #[serde(rename = "generationEnabled")]
    pub generation_enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    pub files: Vec<FileIn>,
}

/// Body of an SSE `partial` event: every item completed so far.
#[derive(Serialize)]
pub struct PartialOut<T> {
    pub items: Vec<T>,
    pub observed: usize,
    pub target: usize,
}

#[derive(Serialize)]
pub struct MessageOut {
    pub message: String,
}

#[derive(Deserialize)]
pub struct TitleIn {
    pub name: String,
}
#[derive(Serialize)]
pub struct TitleOut {
    pub title: String,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_map_to_session_actions() {
        let msg: ClientWsMessage = serde_json::from_str(r#"{"type":"select_mode","mode":"flashcards"}"#).unwrap();
        assert_eq!(msg.into_action(), Some(Action::SelectMode(ContentKind::Flashcards)));

        let msg: ClientWsMessage = serde_json::from_str(r#"{"type":"quiz_answer","answer":"C"}"#).unwrap();
        assert_eq!(msg.into_action(), Some(Action::Quiz(QuizAction::Answer(AnswerKey::C))));

        let msg: ClientWsMessage = serde_json::from_str(r#"{"type":"match_term","id":"abc"}"#).unwrap();
        assert_eq!(msg.into_action(), Some(Action::Matching(MatchingAction::SelectTerm("abc".into()))));

        let msg: ClientWsMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg.into_action(), None);
    }

    #[test]
    fn select_files_uses_the_browser_field_names() {
        let msg: ClientWsMessage = serde_json::from_str(
            r#"{"type":"select_files","files":[{"name":"a.pdf","type":"application/pdf","data":"data:application/pdf;base64,JVBERg=="}]}"#,
        )
        .unwrap();
        match msg {
            ClientWsMessage::SelectFiles { files } => {
                assert_eq!(files.len(), 1);
                assert_eq!(files[0].mime, "application/pdf");
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn server_messages_are_tagged() {
        let out = serde_json::to_value(ServerWsMessage::Notice { message: "hi".into() }).unwrap();
        assert_eq!(out, serde_json::json!({ "type": "notice", "message": "hi" }));
    }
}
