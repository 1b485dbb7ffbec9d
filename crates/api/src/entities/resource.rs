use std::{fmt, str::FromStr};

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
  File,
  Link,
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      ResourceKind::File => write!(f, "file"),
      ResourceKind::Link => write!(f, "link"),
    }
  }
}

impl FromStr for ResourceKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "file" => Ok(ResourceKind::File),
      "link" => Ok(ResourceKind::Link),
      _ => Err(format!("'{}' is not a valid resource type", s)),
    }
  }
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
  pub id: Uuid,
  pub title: String,
  pub r#type: String,
  pub url: String,
  #[serde(skip_serializing)]
  #[sqlx(default)]
  pub file_data: Option<String>,
  pub file_size: Option<i64>,
  pub file_type: Option<String>,
  pub file_name: Option<String>,
  pub description: Option<String>,
  pub group_id: Option<Uuid>,
  #[sqlx(default)]
  pub group_name: Option<String>,
  pub uploaded_by: Option<Uuid>,
  #[sqlx(default)]
  pub uploader_name: Option<String>,
  pub downloads: i64,
  pub status: String,
  pub uploaded_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Resource {
  pub fn kind(&self) -> Option<ResourceKind> {
    self.r#type.parse().ok()
  }
}

/// Decoded `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
  pub mime_type: String,
  pub bytes: Vec<u8>,
}

impl FilePayload {
  pub fn parse(data_url: &str) -> ApiResult<Self> {
    let rest = data_url
      .strip_prefix("data:")
      .ok_or_else(|| ApiError::InvalidFileData("expected a data URL".to_string()))?;
    let (mime_type, payload) = rest
      .split_once(";base64,")
      .ok_or_else(|| ApiError::InvalidFileData("expected base64 encoded data".to_string()))?;

    if mime_type.is_empty() {
      return Err(ApiError::InvalidFileData("missing MIME type".to_string()));
    }

    let bytes = STANDARD
      .decode(payload.trim())
      .map_err(|e| ApiError::InvalidFileData(e.to_string()))?;

    Ok(Self {
      mime_type: mime_type.to_string(),
      bytes,
    })
  }

  pub fn size(&self) -> i64 {
    self.bytes.len() as i64
  }

  /// Extension of `file_name` when it has one, otherwise the MIME subtype.
  pub fn file_type(&self, file_name: &str) -> String {
    file_name
      .rsplit_once('.')
      .map(|(_, extension)| extension.to_ascii_lowercase())
      .filter(|extension| !extension.is_empty() && !extension.contains('/'))
      .unwrap_or_else(|| {
        self
          .mime_type
          .rsplit('/')
          .next()
          .unwrap_or(&self.mime_type)
          .to_string()
      })
  }
}

#[cfg(test)]
mod tests {
  use assert_matches::assert_matches;

  use super::*;

  #[test]
  fn test_parse_data_url() {
    let payload = FilePayload::parse("data:text/plain;base64,aGVsbG8=").unwrap();

    assert_eq!(payload.mime_type, "text/plain");
    assert_eq!(payload.bytes, b"hello");
    assert_eq!(payload.size(), 5);
  }

  #[test]
  fn test_file_type_prefers_extension() {
    let payload = FilePayload::parse("data:application/pdf;base64,JVBERi0=").unwrap();

    assert_eq!(payload.file_type("Slides.PDF"), "pdf");
    assert_eq!(payload.file_type("slides"), "pdf");
    assert_eq!(payload.file_type("https://example.com/slides"), "pdf");
  }

  #[test]
  fn test_rejects_malformed_data() {
    assert_matches!(FilePayload::parse("aGVsbG8="), Err(ApiError::InvalidFileData(_)));
    assert_matches!(FilePayload::parse("data:text/plain,hello"), Err(ApiError::InvalidFileData(_)));
    assert_matches!(FilePayload::parse("data:;base64,aGVsbG8="), Err(ApiError::InvalidFileData(_)));
    assert_matches!(FilePayload::parse("data:text/plain;base64,@@@"), Err(ApiError::InvalidFileData(_)));
  }
}
