use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use project_hub_core::{ErrorKind, HubError};

pub type ApiResult<T = ()> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Hub(#[from] HubError),
  #[error(transparent)]
  JsonRejection(JsonRejection),
  #[error(transparent)]
  InvalidInputError(#[from] validator::ValidationErrors),
  #[error("Invalid upload: {0}")]
  Multipart(#[from] MultipartError),
}

impl ApiError {
  pub fn response(self) -> (StatusCode, AppResponseError) {
    use ApiError::*;

    let (kind, message, details, status_code) = match self {
      Hub(error) => {
        let (kind, status_code) = match error.kind() {
          ErrorKind::NotFound => ("RESOURCE_NOT_FOUND", StatusCode::NOT_FOUND),
          ErrorKind::Validation => ("INVALID_INPUT_ERROR", StatusCode::BAD_REQUEST),
          ErrorKind::Backend => {
            tracing::error!("Backend error: {:?}", error);
            ("INTERNAL_SERVER_ERROR", StatusCode::INTERNAL_SERVER_ERROR)
          },
          ErrorKind::Model => {
            tracing::error!("Model error: {}", error);
            ("MODEL_ERROR", StatusCode::BAD_GATEWAY)
          },
        };

        (kind, error.user_message(), vec![], status_code)
      },
      JsonRejection(rejection) => (
        "INVALID_INPUT_ERROR",
        rejection.body_text(),
        vec![(rejection.status().to_string(), vec![rejection.body_text()])],
        StatusCode::BAD_REQUEST,
      ),
      InvalidInputError(err) => (
        "INVALID_INPUT_ERROR",
        err.to_string(),
        err
          .field_errors()
          .into_iter()
          .map(|(p, e)| {
            (
              p.to_string(),
              e.iter().map(|err| err.code.to_string()).collect::<Vec<String>>(),
            )
          })
          .collect(),
        StatusCode::BAD_REQUEST,
      ),
      Multipart(err) => (
        "INVALID_INPUT_ERROR",
        err.body_text(),
        vec![],
        StatusCode::BAD_REQUEST,
      ),
    };

    (status_code, AppResponseError::new(kind, message, details))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status_code, body) = self.response();
    (status_code, Json(body)).into_response()
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::JsonRejection(rejection)
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AppResponseError {
  pub kind: String,
  pub error_message: String,
  pub details: Vec<(String, Vec<String>)>,
}

impl AppResponseError {
  pub fn new(kind: impl Into<String>, message: impl Into<String>, details: Vec<(String, Vec<String>)>) -> Self {
    Self {
      kind: kind.into(),
      error_message: message.into(),
      details,
    }
  }
}
