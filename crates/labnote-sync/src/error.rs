//! Error type for `labnote-sync`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("i/o error under {path:?}: {source}")]
  Io {
    path:   PathBuf,
    source: std::io::Error,
  },

  /// The store rejected the batch; individual file problems are never
  /// errors, they are skips counted in the report.
  #[error("store error: {0}")]
  Store(Box<dyn std::error::Error + Send + Sync + 'static>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
