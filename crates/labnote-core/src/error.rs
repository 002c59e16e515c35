//! Error types for `labnote-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("note not found: {slug:?} ({locale})")]
  NoteNotFound { slug: String, locale: String },

  #[error("revision not found: {0}")]
  RevisionNotFound(Uuid),

  #[error("proposal not found: {0}")]
  ProposalNotFound(Uuid),

  #[error("proposal {0} is no longer pending")]
  ProposalNotPending(Uuid),

  /// A write arrived without the slug that identifies the note.
  #[error("a note requires a non-empty slug")]
  MissingSlug,

  /// A write would create a note without a title.
  #[error("creating note {0:?} requires a title")]
  MissingTitle(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
