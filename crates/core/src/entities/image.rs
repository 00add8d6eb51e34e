use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectImage {
  pub id: String,
  pub project_id: String,
  pub url: String,
  pub caption: Option<String>,
  pub alt: Option<String>,
  pub width: Option<i64>,
  pub height: Option<i64>,
  pub file_size: i64,
  pub mime_type: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// An image file handed over by the user, before it is validated and stored.
#[derive(Debug, Clone)]
pub struct ImageUpload {
  pub file_name: String,
  pub mime_type: String,
  pub bytes: Vec<u8>,
  pub caption: Option<String>,
  pub alt: Option<String>,
}

impl ImageUpload {
  pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
    Self {
      file_name: file_name.into(),
      mime_type: mime_type.into(),
      bytes,
      caption: None,
      alt: None,
    }
  }

  pub fn caption(mut self, caption: impl Into<String>) -> Self {
    self.caption = Some(caption.into());
    self
  }

  pub fn alt(mut self, alt: impl Into<String>) -> Self {
    self.alt = Some(alt.into());
    self
  }
}
