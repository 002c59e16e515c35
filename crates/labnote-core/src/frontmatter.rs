//! Frontmatter — the structured metadata snapshot carried by every revision.
//!
//! Known fields are typed; anything else a source file declares lands in
//! `extra` so unknown keys survive a parse → store → read round trip. The
//! map is a `BTreeMap` so the serialised form is order-stable, which the
//! content hash depends on.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::note::NoteStatus;

/// Structured metadata parsed from the head of a note file, stored verbatim
/// on the revision it produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title:        Option<String>,
  /// Overrides the slug derived from the file name.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub slug:         Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tags:         Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category:     Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub author:       Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub published_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status:       Option<NoteStatus>,
  /// Forward-compatible extension fields (sorted, so serialisation is
  /// deterministic).
  #[serde(flatten)]
  pub extra:        BTreeMap<String, serde_json::Value>,
}

impl Frontmatter {
  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.slug.is_none()
      && self.tags.is_empty()
      && self.category.is_none()
      && self.author.is_none()
      && self.published_at.is_none()
      && self.status.is_none()
      && self.extra.is_empty()
  }
}
