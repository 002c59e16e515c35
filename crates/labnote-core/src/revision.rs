//! Revision types — the sole bearers of content.
//!
//! A revision is immutable once written. Edits always append a new revision
//! with a higher `revision_num`; the previous tip is linked through
//! `supersedes_revision_id`, forming a singly-linked chain per note.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{frontmatter::Frontmatter, note::NoteStatus};

// ─── Provenance ──────────────────────────────────────────────────────────────

/// The authoring surface a revision entered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
  Cli,
  Web,
  Api,
  Import,
}

impl Source {
  /// Primary-surface edits (anything a human or API client authored
  /// directly) are protected from being clobbered by a sync run.
  pub fn is_primary(self) -> bool { !matches!(self, Self::Import) }
}

/// How the actor behind a revision was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
  HumanSession,
  ApiToken,
}

/// Who/what/why descriptors attached to every revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
  pub source:       Source,
  pub intent:       Option<String>,
  pub auth_type:    AuthType,
  pub scope:        Option<String>,
  pub side_effects: Option<String>,
  pub reversible:   bool,
}

impl Default for Provenance {
  fn default() -> Self {
    Self {
      source:       Source::Api,
      intent:       None,
      auth_type:    AuthType::ApiToken,
      scope:        None,
      side_effects: None,
      reversible:   true,
    }
  }
}

impl Provenance {
  pub fn import(intent: impl Into<String>) -> Self {
    Self {
      source: Source::Import,
      intent: Some(intent.into()),
      ..Self::default()
    }
  }
}

// ─── Revision ────────────────────────────────────────────────────────────────

/// One immutable, content-addressed snapshot of a note's metadata + body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
  pub id:                      Uuid,
  pub note_id:                 Uuid,
  /// Strictly increasing per note, starting at 1, no gaps.
  pub revision_num:            i64,
  /// The previous tip at the time this revision was written.
  pub supersedes_revision_id:  Option<Uuid>,
  pub frontmatter:             Frontmatter,
  pub content_body:            String,
  /// Digest over the canonical (frontmatter, body) serialisation.
  pub content_hash:            String,
  pub provenance:              Provenance,
  pub created_at:              DateTime<Utc>,
}

// ─── Write input / outcome ───────────────────────────────────────────────────

/// Input to [`crate::store::LedgerStore::write_content`]: a new
/// (frontmatter, body) pair for a note identity, plus enough metadata to
/// create the note when it does not exist yet.
#[derive(Debug, Clone)]
pub struct ContentWrite {
  /// Required when the note does not exist yet.
  pub title:       Option<String>,
  pub frontmatter: Frontmatter,
  pub body:        String,
  /// When set, the note's status changes in the same transaction — which is
  /// what allows `published_revision_id` to advance on a publish-and-write.
  pub status:      Option<NoteStatus>,
  pub provenance:  Provenance,
  pub actor:       Option<String>,
}

impl ContentWrite {
  pub fn new(body: impl Into<String>) -> Self {
    Self {
      title:       None,
      frontmatter: Frontmatter::default(),
      body:        body.into(),
      status:      None,
      provenance:  Provenance::default(),
      actor:       None,
    }
  }
}

/// Result of a content write. When `noop` is `true`, the incoming content
/// hashed identically to the tip and `revision` is the existing tip — no row
/// was created and no pointer moved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteOutcome {
  pub note:     crate::note::Note,
  pub revision: Revision,
  pub noop:     bool,
}
