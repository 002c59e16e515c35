//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a store error onto a status code by walking its source chain for a
  /// domain error: not-found lookups become 404, validation failures 400,
  /// anything else 500.
  pub fn from_store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    use labnote_core::Error as CoreError;

    enum Kind {
      NotFound(String),
      BadRequest(String),
      Internal,
    }

    let kind = {
      let mut cur: Option<&(dyn std::error::Error + 'static)> = Some(&e);
      let mut kind = Kind::Internal;
      while let Some(err) = cur {
        if let Some(core) = err.downcast_ref::<CoreError>() {
          kind = match core {
            CoreError::NoteNotFound { .. }
            | CoreError::RevisionNotFound(_)
            | CoreError::ProposalNotFound(_) => Kind::NotFound(core.to_string()),
            CoreError::MissingSlug
            | CoreError::MissingTitle(_)
            | CoreError::ProposalNotPending(_) => {
              Kind::BadRequest(core.to_string())
            }
            CoreError::Serialization(_) => Kind::Internal,
          };
          break;
        }
        cur = err.source();
      }
      kind
    };

    match kind {
      Kind::NotFound(m) => ApiError::NotFound(m),
      Kind::BadRequest(m) => ApiError::BadRequest(m),
      Kind::Internal => ApiError::Store(Box::new(e)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
