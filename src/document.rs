//! The uploaded PDF: a base64 data URL plus its declared name and MIME type.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::Limits;
use crate::error::DocumentError;

pub const PDF_MIME: &str = "application/pdf";

/// File as the browser sends it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIn {
  pub name: String,
  #[serde(rename = "type")]
  pub mime: String,
  pub data: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct UploadedDocument {
  name: String,
  mime: String,
  data_url: String,
  size: usize,
}

// Payload stays out of Debug output (and therefore out of logs).
impl std::fmt::Debug for UploadedDocument {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("UploadedDocument")
      .field("name", &self.name)
      .field("mime", &self.mime)
      .field("size", &self.size)
      .finish()
  }
}

impl UploadedDocument {
  /// Validate one uploaded file: PDF MIME, well-formed base64 data URL, size limit.
  pub fn from_upload(file: FileIn, limits: &Limits) -> Result<Self, DocumentError> {
    if file.mime != PDF_MIME {
      return Err(DocumentError::UnsupportedType(file.mime));
    }
    let payload = file
      .data
      .strip_prefix("data:")
      .and_then(|rest| rest.split_once(','))
      .filter(|(header, _)| header.ends_with(";base64"))
      .map(|(_, payload)| payload)
      .ok_or_else(|| DocumentError::InvalidEncoding("missing `data:<mime>;base64,` header".into()))?;

    // Cheap upper bound first so oversized uploads are not decoded.
    let estimate = payload.len() / 4 * 3;
    if estimate > limits.max_upload_bytes + 2 {
      return Err(DocumentError::TooLarge { size: estimate, limit: limits.max_upload_bytes });
    }
    let bytes = STANDARD
      .decode(payload.trim())
      .map_err(|e| DocumentError::InvalidEncoding(e.to_string()))?;
    if bytes.len() > limits.max_upload_bytes {
      return Err(DocumentError::TooLarge { size: bytes.len(), limit: limits.max_upload_bytes });
    }

    Ok(Self { name: file.name, mime: file.mime, size: bytes.len(), data_url: file.data })
  }

  /// Encode raw file bytes as a data URL document (no validation).
  pub fn from_bytes(name: impl Into<String>, mime: impl Into<String>, bytes: &[u8]) -> Self {
    let mime = mime.into();
    let data_url = format!("data:{};base64,{}", mime, STANDARD.encode(bytes));
    Self { name: name.into(), mime, data_url, size: bytes.len() }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn mime(&self) -> &str {
    &self.mime
  }

  pub fn data_url(&self) -> &str {
    &self.data_url
  }

  /// Decoded payload size in bytes.
  pub fn size(&self) -> usize {
    self.size
  }
}

/// Accept exactly one valid document out of a submission.
pub fn single_document(files: Vec<FileIn>, limits: &Limits) -> Result<UploadedDocument, DocumentError> {
  match files.len() {
    0 => Err(DocumentError::NoFile),
    1 => files.into_iter().next().map_or(Err(DocumentError::NoFile), |f| UploadedDocument::from_upload(f, limits)),
    n => Err(DocumentError::MultipleFiles(n)),
  }
}
