//! Error type for `labnote-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[source] labnote_core::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored discriminant (status, source, …) did not decode.
  #[error("unrecognised stored value: {0}")]
  Decode(String),
}

impl From<labnote_core::Error> for Error {
  fn from(e: labnote_core::Error) -> Self { Error::Core(e) }
}

/// Domain errors raised inside a `conn.call` closure travel out through
/// [`tokio_rusqlite::Error::Other`]; unwrap them back here so callers see
/// [`Error::Core`] instead of an opaque database error.
impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Other(inner) => {
        match inner.downcast::<labnote_core::Error>() {
          Ok(core) => Error::Core(*core),
          Err(other) => Error::Database(tokio_rusqlite::Error::Other(other)),
        }
      }
      other => Error::Database(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
