use std::io;

use sqlx::Error as SqlxError;
use thiserror::Error;

pub type HubResult<T = ()> = Result<T, HubError>;

/// Coarse classification used when presenting an error to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  Validation,
  Backend,
  Model,
}

#[derive(Debug, Error)]
pub enum HubError {
  #[error("{entity} with id `{id}` is not found")]
  NotFound { entity: &'static str, id: String },
  #[error("Validation failed: {0}")]
  Validation(String),
  #[error("Database error: {0}")]
  Database(#[from] SqlxError),
  #[error("Storage I/O error: {0}")]
  Io(#[from] io::Error),
  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
  #[error("Backend error: {0}")]
  Backend(String),
  #[error("Model error: {0}")]
  Model(String),
}

impl HubError {
  pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
    HubError::NotFound { entity, id: id.into() }
  }

  pub fn validation(message: impl Into<String>) -> Self {
    HubError::Validation(message.into())
  }

  pub fn kind(&self) -> ErrorKind {
    use HubError::*;

    match self {
      NotFound { .. } => ErrorKind::NotFound,
      Validation(_) => ErrorKind::Validation,
      Database(_) | Io(_) | Serialization(_) | Backend(_) => ErrorKind::Backend,
      Model(_) => ErrorKind::Model,
    }
  }

  /// Text suitable for a toast or an inline message. Backend details stay in the logs.
  pub fn user_message(&self) -> String {
    match self.kind() {
      ErrorKind::NotFound => self.to_string(),
      ErrorKind::Validation => match self {
        HubError::Validation(message) => message.clone(),
        other => other.to_string(),
      },
      ErrorKind::Backend => "Storage is unavailable right now, please try again".to_string(),
      ErrorKind::Model => "Could not generate a suggestion, try again".to_string(),
    }
  }
}
