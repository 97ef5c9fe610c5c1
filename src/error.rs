//! Error types shared across the backend.
//!
//! `SchemaError` rejects a whole generated set, `DocumentError` rejects an upload,
//! `GatewayError` covers everything that can fail a generation stream.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
  #[error("expected exactly {expected} items, got {actual}")]
  WrongCount { expected: usize, actual: usize },
  #[error("item {index}: expected exactly 4 options, got {actual}")]
  WrongOptionCount { index: usize, actual: usize },
  #[error("item {index}: field `{field}` must not be empty")]
  EmptyField { index: usize, field: &'static str },
  #[error("item {index}: duplicate id {id}")]
  DuplicateId { index: usize, id: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
  #[error("no file was provided")]
  NoFile,
  #[error("only one PDF can be used at a time ({0} files given)")]
  MultipleFiles(usize),
  #[error("unsupported file type `{0}`, only application/pdf is accepted")]
  UnsupportedType(String),
  #[error("file is {size} bytes, the limit is {limit} bytes")]
  TooLarge { size: usize, limit: usize },
  #[error("file data is not a base64 data URL: {0}")]
  InvalidEncoding(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
  #[error("content generation is disabled (no model configured)")]
  Disabled,
  #[error("HTTP error: {0}")]
  Http(String),
  #[error("model API error ({status}): {message}")]
  Api { status: u16, message: String },
  #[error("malformed item in model output: {0}")]
  MalformedItem(String),
  #[error("model output ended before the item array was closed")]
  Truncated,
  #[error("generated set rejected: {0}")]
  Schema(#[from] SchemaError),
  #[error("generation timed out")]
  Timeout,
  #[error("model returned an empty title")]
  EmptyTitle,
}
