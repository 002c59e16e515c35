//! Error types for the note-file codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("front section opened on line 1 but never closed with `---`")]
  UnterminatedFrontSection,

  #[error("malformed metadata line {line}: {text:?}")]
  MalformedLine { line: usize, text: String },

  #[error("invalid value for {key}: {value:?}")]
  InvalidValue { key: String, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
