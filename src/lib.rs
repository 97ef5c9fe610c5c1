//! PDF study backend: turns one uploaded PDF into a quiz, flashcards and a
//! matching game, generated on demand by a hosted model and streamed back.

pub mod config;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod gateway;
pub mod json_stream;
pub mod modes;
pub mod openai;
pub mod protocol;
pub mod routes;
pub mod schemas;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod util;
