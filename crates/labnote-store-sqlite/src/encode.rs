//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings; UUIDs are hyphenated lowercase strings;
//! frontmatter, tags, and event payloads are compact JSON; enum fields are
//! their snake_case discriminants.

use chrono::{DateTime, Utc};
use labnote_core::{
  event::Event,
  frontmatter::Frontmatter,
  note::{ContentSource, EffectiveNote, Note, NotePreview, NoteStatus},
  proposal::{Proposal, ProposalStatus},
  revision::{AuthType, Provenance, Revision, Source},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── NoteStatus ──────────────────────────────────────────────────────────────

pub fn encode_status(s: NoteStatus) -> &'static str {
  match s {
    NoteStatus::Draft => "draft",
    NoteStatus::Published => "published",
    NoteStatus::Archived => "archived",
  }
}

pub fn decode_status(s: &str) -> Result<NoteStatus> {
  match s {
    "draft" => Ok(NoteStatus::Draft),
    "published" => Ok(NoteStatus::Published),
    "archived" => Ok(NoteStatus::Archived),
    other => Err(Error::Decode(format!("note status: {other:?}"))),
  }
}

// ─── Provenance ──────────────────────────────────────────────────────────────

pub fn encode_source(s: Source) -> &'static str {
  match s {
    Source::Cli => "cli",
    Source::Web => "web",
    Source::Api => "api",
    Source::Import => "import",
  }
}

pub fn decode_source(s: &str) -> Result<Source> {
  match s {
    "cli" => Ok(Source::Cli),
    "web" => Ok(Source::Web),
    "api" => Ok(Source::Api),
    "import" => Ok(Source::Import),
    other => Err(Error::Decode(format!("revision source: {other:?}"))),
  }
}

pub fn encode_auth_type(a: AuthType) -> &'static str {
  match a {
    AuthType::HumanSession => "human_session",
    AuthType::ApiToken => "api_token",
  }
}

pub fn decode_auth_type(s: &str) -> Result<AuthType> {
  match s {
    "human_session" => Ok(AuthType::HumanSession),
    "api_token" => Ok(AuthType::ApiToken),
    other => Err(Error::Decode(format!("auth type: {other:?}"))),
  }
}

// ─── ProposalStatus ──────────────────────────────────────────────────────────

pub fn encode_proposal_status(s: ProposalStatus) -> &'static str {
  match s {
    ProposalStatus::Pending => "pending",
    ProposalStatus::Accepted => "accepted",
    ProposalStatus::Rejected => "rejected",
    ProposalStatus::Withdrawn => "withdrawn",
  }
}

pub fn decode_proposal_status(s: &str) -> Result<ProposalStatus> {
  match s {
    "pending" => Ok(ProposalStatus::Pending),
    "accepted" => Ok(ProposalStatus::Accepted),
    "rejected" => Ok(ProposalStatus::Rejected),
    "withdrawn" => Ok(ProposalStatus::Withdrawn),
    other => Err(Error::Decode(format!("proposal status: {other:?}"))),
  }
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_tags(tags: &[String]) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_frontmatter(fm: &Frontmatter) -> Result<String> {
  Ok(serde_json::to_string(fm)?)
}

pub fn decode_frontmatter(s: &str) -> Result<Frontmatter> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `lab_notes` row.
pub struct RawNote {
  pub id:                    String,
  pub group_id:              String,
  pub slug:                  String,
  pub locale:                String,
  pub status:                String,
  pub title:                 String,
  pub tags:                  String,
  pub category:              Option<String>,
  pub author:                Option<String>,
  pub current_revision_id:   Option<String>,
  pub published_revision_id: Option<String>,
  pub published_at:          Option<String>,
  pub legacy_content:        Option<String>,
  pub created_at:            String,
  pub updated_at:            String,
}

impl RawNote {
  pub const COLUMNS: &'static str =
    "id, group_id, slug, locale, status, title, tags, category, author,
     current_revision_id, published_revision_id, published_at,
     legacy_content, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                    row.get(0)?,
      group_id:              row.get(1)?,
      slug:                  row.get(2)?,
      locale:                row.get(3)?,
      status:                row.get(4)?,
      title:                 row.get(5)?,
      tags:                  row.get(6)?,
      category:              row.get(7)?,
      author:                row.get(8)?,
      current_revision_id:   row.get(9)?,
      published_revision_id: row.get(10)?,
      published_at:          row.get(11)?,
      legacy_content:        row.get(12)?,
      created_at:            row.get(13)?,
      updated_at:            row.get(14)?,
    })
  }

  pub fn into_note(self) -> Result<Note> {
    Ok(Note {
      id:                    decode_uuid(&self.id)?,
      group_id:              decode_uuid(&self.group_id)?,
      slug:                  self.slug,
      locale:                self.locale,
      status:                decode_status(&self.status)?,
      title:                 self.title,
      tags:                  decode_tags(&self.tags)?,
      category:              self.category,
      author:                self.author,
      current_revision_id:   decode_opt_uuid(self.current_revision_id)?,
      published_revision_id: decode_opt_uuid(self.published_revision_id)?,
      published_at:          decode_opt_dt(self.published_at)?,
      legacy_content:        self.legacy_content,
      created_at:            decode_dt(&self.created_at)?,
      updated_at:            decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `lab_note_revisions` row.
pub struct RawRevision {
  pub id:                     String,
  pub note_id:                String,
  pub revision_num:           i64,
  pub supersedes_revision_id: Option<String>,
  pub frontmatter:            String,
  pub content_body:           String,
  pub content_hash:           String,
  pub source:                 String,
  pub intent:                 Option<String>,
  pub auth_type:              String,
  pub scope:                  Option<String>,
  pub side_effects:           Option<String>,
  pub reversible:             bool,
  pub created_at:             String,
}

impl RawRevision {
  pub const COLUMNS: &'static str =
    "id, note_id, revision_num, supersedes_revision_id, frontmatter,
     content_body, content_hash, source, intent, auth_type, scope,
     side_effects, reversible, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                     row.get(0)?,
      note_id:                row.get(1)?,
      revision_num:           row.get(2)?,
      supersedes_revision_id: row.get(3)?,
      frontmatter:            row.get(4)?,
      content_body:           row.get(5)?,
      content_hash:           row.get(6)?,
      source:                 row.get(7)?,
      intent:                 row.get(8)?,
      auth_type:              row.get(9)?,
      scope:                  row.get(10)?,
      side_effects:           row.get(11)?,
      reversible:             row.get(12)?,
      created_at:             row.get(13)?,
    })
  }

  pub fn into_revision(self) -> Result<Revision> {
    Ok(Revision {
      id:                     decode_uuid(&self.id)?,
      note_id:                decode_uuid(&self.note_id)?,
      revision_num:           self.revision_num,
      supersedes_revision_id: decode_opt_uuid(self.supersedes_revision_id)?,
      frontmatter:            decode_frontmatter(&self.frontmatter)?,
      content_body:           self.content_body,
      content_hash:           self.content_hash,
      provenance:             Provenance {
        source:       decode_source(&self.source)?,
        intent:       self.intent,
        auth_type:    decode_auth_type(&self.auth_type)?,
        scope:        self.scope,
        side_effects: self.side_effects,
        reversible:   self.reversible,
      },
      created_at:             decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read from a `lab_note_previews` view row.
pub struct RawPreview {
  pub id:           String,
  pub group_id:     String,
  pub slug:         String,
  pub locale:       String,
  pub status:       String,
  pub title:        String,
  pub tags:         String,
  pub category:     Option<String>,
  pub author:       Option<String>,
  pub revision_num: Option<i64>,
  pub published_at: Option<String>,
  pub updated_at:   String,
}

impl RawPreview {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      group_id:     row.get(1)?,
      slug:         row.get(2)?,
      locale:       row.get(3)?,
      status:       row.get(4)?,
      title:        row.get(5)?,
      tags:         row.get(6)?,
      category:     row.get(7)?,
      author:       row.get(8)?,
      revision_num: row.get(9)?,
      published_at: row.get(10)?,
      updated_at:   row.get(11)?,
    })
  }

  pub fn into_preview(self) -> Result<NotePreview> {
    Ok(NotePreview {
      id:           decode_uuid(&self.id)?,
      group_id:     decode_uuid(&self.group_id)?,
      slug:         self.slug,
      locale:       self.locale,
      status:       decode_status(&self.status)?,
      title:        self.title,
      tags:         decode_tags(&self.tags)?,
      category:     self.category,
      author:       self.author,
      revision_num: self.revision_num,
      published_at: decode_opt_dt(self.published_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

/// A `lab_notes` row joined to its `lab_note_effective` view row.
pub struct RawEffective {
  pub note:           RawNote,
  pub revision_id:    Option<String>,
  pub revision_num:   Option<i64>,
  pub frontmatter:    Option<String>,
  pub content_body:   Option<String>,
  pub content_source: Option<String>,
}

impl RawEffective {
  /// Resolve the legacy / pending rungs of the content cascade: a note
  /// without any revision serves its legacy inline content if present,
  /// otherwise reports "content pending" with an empty body.
  pub fn into_effective(self) -> Result<EffectiveNote> {
    let note = self.note.into_note()?;

    let (source, body, frontmatter) = match (&self.revision_id, &self.content_source) {
      (Some(_), Some(tag)) => {
        let source = match tag.as_str() {
          "published" => ContentSource::Published,
          "draft" => ContentSource::Draft,
          "fallback" => ContentSource::Fallback,
          other => {
            return Err(Error::Decode(format!("content source: {other:?}")));
          }
        };
        let fm = self
          .frontmatter
          .as_deref()
          .map(decode_frontmatter)
          .transpose()?;
        (source, self.content_body.unwrap_or_default(), fm)
      }
      _ => match &note.legacy_content {
        Some(legacy) if !legacy.is_empty() => {
          (ContentSource::Legacy, legacy.clone(), None)
        }
        _ => (ContentSource::Pending, String::new(), None),
      },
    };

    Ok(EffectiveNote {
      note,
      revision_id: decode_opt_uuid(self.revision_id)?,
      revision_num: self.revision_num,
      frontmatter,
      body,
      source,
    })
  }
}

/// Raw strings read directly from a `lab_note_events` row.
pub struct RawEvent {
  pub id:          String,
  pub note_id:     Option<String>,
  pub revision_id: Option<String>,
  pub proposal_id: Option<String>,
  pub actor:       Option<String>,
  pub action:      String,
  pub payload:     String,
  pub created_at:  String,
}

impl RawEvent {
  pub const COLUMNS: &'static str =
    "id, note_id, revision_id, proposal_id, actor, action, payload, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      note_id:     row.get(1)?,
      revision_id: row.get(2)?,
      proposal_id: row.get(3)?,
      actor:       row.get(4)?,
      action:      row.get(5)?,
      payload:     row.get(6)?,
      created_at:  row.get(7)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      id:          decode_uuid(&self.id)?,
      note_id:     decode_opt_uuid(self.note_id)?,
      revision_id: decode_opt_uuid(self.revision_id)?,
      proposal_id: decode_opt_uuid(self.proposal_id)?,
      actor:       self.actor,
      action:      self.action,
      payload:     serde_json::from_str(&self.payload)?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `lab_note_proposals` row.
pub struct RawProposal {
  pub id:                   String,
  pub note_id:              String,
  pub base_revision_id:     Option<String>,
  pub proposed_revision_id: String,
  pub status:               String,
  pub reviewer:             Option<String>,
  pub created_at:           String,
  pub resolved_at:          Option<String>,
}

impl RawProposal {
  pub const COLUMNS: &'static str =
    "id, note_id, base_revision_id, proposed_revision_id, status, reviewer,
     created_at, resolved_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                   row.get(0)?,
      note_id:              row.get(1)?,
      base_revision_id:     row.get(2)?,
      proposed_revision_id: row.get(3)?,
      status:               row.get(4)?,
      reviewer:             row.get(5)?,
      created_at:           row.get(6)?,
      resolved_at:          row.get(7)?,
    })
  }

  pub fn into_proposal(self) -> Result<Proposal> {
    Ok(Proposal {
      id:                   decode_uuid(&self.id)?,
      note_id:              decode_uuid(&self.note_id)?,
      base_revision_id:     decode_opt_uuid(self.base_revision_id)?,
      proposed_revision_id: decode_uuid(&self.proposed_revision_id)?,
      status:               decode_proposal_status(&self.status)?,
      reviewer:             self.reviewer,
      created_at:           decode_dt(&self.created_at)?,
      resolved_at:          decode_opt_dt(self.resolved_at)?,
    })
  }
}
