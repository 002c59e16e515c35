//! Note — identity and pointers only.
//!
//! A note never stores canonical content directly; content lives in
//! revisions. The `legacy_content` field survives from the pre-revision
//! schema and is only consulted when a note has no revision at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::frontmatter::Frontmatter;

/// Publication state of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
  Draft,
  Published,
  Archived,
}

/// The externally addressable identity of a note: `(slug, locale)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteIdent {
  pub slug:   String,
  pub locale: String,
}

impl NoteIdent {
  pub fn new(slug: impl Into<String>, locale: impl Into<String>) -> Self {
    Self { slug: slug.into(), locale: locale.into() }
  }
}

/// The identity/pointer row for a note. Only the pointer fields and the
/// descriptive metadata are ever rewritten after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
  pub id:                    Uuid,
  /// Groups translations of conceptually the same note.
  pub group_id:              Uuid,
  pub slug:                  String,
  pub locale:                String,
  pub status:                NoteStatus,
  pub title:                 String,
  pub tags:                  Vec<String>,
  pub category:              Option<String>,
  pub author:                Option<String>,
  /// Pointer to the latest meaningful revision (draft-or-published tip).
  pub current_revision_id:   Option<Uuid>,
  /// Pointer to the revision exposed to public readers. Once set it only
  /// ever advances; it is never reset to `None`.
  pub published_revision_id: Option<Uuid>,
  pub published_at:          Option<DateTime<Utc>>,
  /// Pre-revision inline content; not truth once any revision exists.
  pub legacy_content:        Option<String>,
  pub created_at:            DateTime<Utc>,
  pub updated_at:            DateTime<Utc>,
}

impl Note {
  pub fn ident(&self) -> NoteIdent {
    NoteIdent::new(self.slug.clone(), self.locale.clone())
  }
}

/// Input to [`crate::store::LedgerStore::upsert_note`]. `None` fields leave
/// the existing value untouched; on create, `title` is required.
#[derive(Debug, Clone)]
pub struct NoteUpsert {
  pub slug:         String,
  pub locale:       String,
  pub title:        Option<String>,
  pub tags:         Option<Vec<String>>,
  pub category:     Option<String>,
  pub author:       Option<String>,
  pub status:       Option<NoteStatus>,
  /// Only ever overwritten when a value is supplied — never cleared, never
  /// invented.
  pub published_at: Option<DateTime<Utc>>,
  pub actor:        Option<String>,
}

impl NoteUpsert {
  pub fn new(slug: impl Into<String>, locale: impl Into<String>) -> Self {
    Self {
      slug:         slug.into(),
      locale:       locale.into(),
      title:        None,
      tags:         None,
      category:     None,
      author:       None,
      status:       None,
      published_at: None,
      actor:        None,
    }
  }
}

/// Listing row: note metadata plus the tip's revision number, without the
/// content body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotePreview {
  pub id:           Uuid,
  pub group_id:     Uuid,
  pub slug:         String,
  pub locale:       String,
  pub status:       NoteStatus,
  pub title:        String,
  pub tags:         Vec<String>,
  pub category:     Option<String>,
  pub author:       Option<String>,
  pub revision_num: Option<i64>,
  pub published_at: Option<DateTime<Utc>>,
  pub updated_at:   DateTime<Utc>,
}

// ─── Effective content ───────────────────────────────────────────────────────

/// Which rung of the resolution cascade served the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
  /// Resolved from `published_revision_id` (note is published).
  Published,
  /// Resolved from `current_revision_id`.
  Draft,
  /// Pointers were null or dangling; fell back to the newest revision.
  Fallback,
  /// No revision exists; served the legacy inline content field.
  Legacy,
  /// No revision and no legacy content.
  Pending,
}

/// The computed read model for a note — never stored, always derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveNote {
  pub note:         Note,
  pub revision_id:  Option<Uuid>,
  pub revision_num: Option<i64>,
  pub frontmatter:  Option<Frontmatter>,
  /// Empty when `source` is [`ContentSource::Pending`].
  pub body:         String,
  pub source:       ContentSource,
}
