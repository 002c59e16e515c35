//! [`SqliteStore`] — the SQLite implementation of [`LedgerStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use labnote_core::{
  event::{Event, NewEvent},
  hash::content_hash,
  note::{EffectiveNote, Note, NoteIdent, NotePreview, NoteUpsert},
  proposal::{Proposal, ProposalDecision, ProposalStatus},
  revision::{ContentWrite, Revision, WriteOutcome},
  store::LedgerStore,
  sync::{NoteFile, SyncCounters, SyncOptions},
};

use crate::{
  Error, Result,
  encode::{
    RawEffective, RawEvent, RawNote, RawPreview, RawProposal, RawRevision,
    encode_auth_type, encode_dt, encode_frontmatter, encode_proposal_status,
    encode_source, encode_status, encode_tags, encode_uuid,
  },
  migrate::{self, MigrationReport},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lab Note Ledger backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. The ledger
/// is single-writer by design: all writes funnel through this connection's
/// worker thread, and every multi-step mutation runs inside one transaction.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run the schema migrator.
  /// Fails — rather than serving a half-migrated schema — if any step fails.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.migrate().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.migrate().await?;
    Ok(store)
  }

  /// Wrap an existing connection without migrating — lets tests seed a
  /// legacy schema first.
  #[cfg(test)]
  pub(crate) fn attach(conn: tokio_rusqlite::Connection) -> Self {
    Self { conn }
  }

  /// Run the schema migrator. Idempotent; a second run reports zero steps
  /// and zero column additions.
  pub async fn migrate(&self) -> Result<MigrationReport> {
    let report = self.conn.call(|conn| Ok(migrate::migrate(conn)?)).await?;
    Ok(report)
  }
}

// ─── Closure-side helpers ────────────────────────────────────────────────────
//
// Everything below the fold runs inside `conn.call` on the connection's
// worker thread; domain errors travel out through `abort`.

type CallResult<T> = std::result::Result<T, tokio_rusqlite::Error>;

fn abort(e: labnote_core::Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

fn find_note(
  conn: &rusqlite::Connection,
  slug: &str,
  locale: &str,
) -> rusqlite::Result<Option<RawNote>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM lab_notes WHERE slug = ?1 AND locale = ?2",
        RawNote::COLUMNS
      ),
      rusqlite::params![slug, locale],
      RawNote::from_row,
    )
    .optional()
}

fn find_note_by_id(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawNote>> {
  conn
    .query_row(
      &format!("SELECT {} FROM lab_notes WHERE id = ?1", RawNote::COLUMNS),
      rusqlite::params![id],
      RawNote::from_row,
    )
    .optional()
}

fn revision_by_id(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawRevision>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM lab_note_revisions WHERE id = ?1",
        RawRevision::COLUMNS
      ),
      rusqlite::params![id],
      RawRevision::from_row,
    )
    .optional()
}

/// The highest-numbered revision for a note, when any exists.
fn latest_revision(
  conn: &rusqlite::Connection,
  note_id: &str,
) -> rusqlite::Result<Option<RawRevision>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM lab_note_revisions WHERE note_id = ?1
          ORDER BY revision_num DESC LIMIT 1",
        RawRevision::COLUMNS
      ),
      rusqlite::params![note_id],
      RawRevision::from_row,
    )
    .optional()
}

/// The revision the note's `current_revision_id` points at; falls back to
/// the highest-numbered revision when the pointer is null or dangling.
fn pointer_tip(
  conn: &rusqlite::Connection,
  note: &RawNote,
) -> rusqlite::Result<Option<RawRevision>> {
  if let Some(cur) = &note.current_revision_id
    && let Some(rev) = revision_by_id(conn, cur)?
  {
    return Ok(Some(rev));
  }
  latest_revision(conn, &note.id)
}

/// A fully-prepared revision row, encoded before entering the closure.
struct RevisionRow {
  id:           String,
  note_id:      String,
  revision_num: i64,
  supersedes:   Option<String>,
  frontmatter:  String,
  body:         String,
  hash:         String,
  source:       String,
  intent:       Option<String>,
  auth_type:    String,
  scope:        Option<String>,
  side_effects: Option<String>,
  reversible:   bool,
  created_at:   String,
}

fn insert_revision(
  conn: &rusqlite::Connection,
  row: &RevisionRow,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO lab_note_revisions (
       id, note_id, revision_num, supersedes_revision_id, frontmatter,
       content_body, content_hash, source, intent, auth_type, scope,
       side_effects, reversible, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    rusqlite::params![
      row.id,
      row.note_id,
      row.revision_num,
      row.supersedes,
      row.frontmatter,
      row.body,
      row.hash,
      row.source,
      row.intent,
      row.auth_type,
      row.scope,
      row.side_effects,
      row.reversible,
      row.created_at,
    ],
  )?;
  Ok(())
}

/// Advance `current_revision_id` (and, when `publish`, the published pointer
/// and first-publish timestamp) in the same transaction as the revision
/// insert that made the new tip.
fn advance_pointers(
  conn: &rusqlite::Connection,
  note_id: &str,
  revision_id: &str,
  publish: bool,
  now: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "UPDATE lab_notes SET current_revision_id = ?2, updated_at = ?3
      WHERE id = ?1",
    rusqlite::params![note_id, revision_id, now],
  )?;
  if publish {
    conn.execute(
      "UPDATE lab_notes
          SET published_revision_id = ?2,
              published_at          = COALESCE(published_at, ?3)
        WHERE id = ?1",
      rusqlite::params![note_id, revision_id, now],
    )?;
  }
  Ok(())
}

#[allow(clippy::too_many_arguments)]
fn insert_event(
  conn: &rusqlite::Connection,
  note_id: Option<&str>,
  revision_id: Option<&str>,
  proposal_id: Option<&str>,
  actor: Option<&str>,
  action: &str,
  payload: &serde_json::Value,
  now: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO lab_note_events (
       id, note_id, revision_id, proposal_id, actor, action, payload,
       created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    rusqlite::params![
      encode_uuid(Uuid::new_v4()),
      note_id,
      revision_id,
      proposal_id,
      actor,
      action,
      payload.to_string(),
      now,
    ],
  )?;
  Ok(())
}

// ─── Prepared documents ──────────────────────────────────────────────────────

/// Everything a content write needs, string-encoded ahead of the closure.
#[derive(Clone)]
struct PreparedDoc {
  title:        Option<String>,
  status:       Option<String>,
  tags:         String,
  category:     Option<String>,
  author:       Option<String>,
  published_at: Option<String>,
  frontmatter:  String,
  body:         String,
  hash:         String,
  source:       String,
  intent:       Option<String>,
  auth_type:    String,
  scope:        Option<String>,
  side_effects: Option<String>,
  reversible:   bool,
  actor:        Option<String>,
}

impl PreparedDoc {
  fn from_write(write: &ContentWrite) -> Result<Self> {
    let fm = &write.frontmatter;
    Ok(Self {
      title:        write.title.clone().or_else(|| fm.title.clone()),
      status:       write
        .status
        .or(fm.status)
        .map(|s| encode_status(s).to_owned()),
      tags:         encode_tags(&fm.tags)?,
      category:     fm.category.clone(),
      author:       fm.author.clone(),
      published_at: fm.published_at.map(encode_dt),
      frontmatter:  encode_frontmatter(fm)?,
      body:         write.body.clone(),
      hash:         content_hash(fm, &write.body)?,
      source:       encode_source(write.provenance.source).to_owned(),
      intent:       write.provenance.intent.clone(),
      auth_type:    encode_auth_type(write.provenance.auth_type).to_owned(),
      scope:        write.provenance.scope.clone(),
      side_effects: write.provenance.side_effects.clone(),
      reversible:   write.provenance.reversible,
      actor:        write.actor.clone(),
    })
  }

  fn from_note_file(file: &NoteFile, actor: Option<&str>) -> Result<Self> {
    let fm = &file.frontmatter;
    let provenance = labnote_core::revision::Provenance::import("sync");
    Ok(Self {
      title:        fm.title.clone(),
      status:       fm.status.map(|s| encode_status(s).to_owned()),
      tags:         encode_tags(&fm.tags)?,
      category:     fm.category.clone(),
      author:       fm.author.clone(),
      published_at: fm.published_at.map(encode_dt),
      frontmatter:  encode_frontmatter(fm)?,
      body:         file.body.clone(),
      hash:         content_hash(fm, &file.body)?,
      source:       encode_source(provenance.source).to_owned(),
      intent:       provenance.intent.clone(),
      auth_type:    encode_auth_type(provenance.auth_type).to_owned(),
      scope:        provenance.scope.clone(),
      side_effects: provenance.side_effects.clone(),
      reversible:   provenance.reversible,
      actor:        actor.map(str::to_owned),
    })
  }

  fn revision_row(
    &self,
    note_id: &str,
    revision_num: i64,
    supersedes: Option<String>,
    now: &str,
  ) -> RevisionRow {
    RevisionRow {
      id: encode_uuid(Uuid::new_v4()),
      note_id: note_id.to_owned(),
      revision_num,
      supersedes,
      frontmatter: self.frontmatter.clone(),
      body: self.body.clone(),
      hash: self.hash.clone(),
      source: self.source.clone(),
      intent: self.intent.clone(),
      auth_type: self.auth_type.clone(),
      scope: self.scope.clone(),
      side_effects: self.side_effects.clone(),
      reversible: self.reversible,
      created_at: now.to_owned(),
    }
  }
}

/// Insert a brand-new note row for `(slug, locale)` and return its id.
/// Reuses the `group_id` of a sibling locale with the same slug so
/// translations stay grouped.
fn create_note_row(
  conn: &rusqlite::Connection,
  slug: &str,
  locale: &str,
  doc: &PreparedDoc,
  now: &str,
) -> CallResult<String> {
  if slug.trim().is_empty() {
    return Err(abort(labnote_core::Error::MissingSlug));
  }
  let Some(title) = &doc.title else {
    return Err(abort(labnote_core::Error::MissingTitle(slug.to_owned())));
  };

  let id = encode_uuid(Uuid::new_v4());
  let group_id: String = conn
    .query_row(
      "SELECT group_id FROM lab_notes WHERE slug = ?1 LIMIT 1",
      rusqlite::params![slug],
      |row| row.get(0),
    )
    .optional()?
    .unwrap_or_else(|| id.clone());

  conn.execute(
    "INSERT INTO lab_notes (
       id, group_id, slug, locale, status, title, tags, category, author,
       published_at, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
    rusqlite::params![
      id,
      group_id,
      slug,
      locale,
      doc.status.as_deref().unwrap_or("draft"),
      title,
      doc.tags,
      doc.category,
      doc.author,
      doc.published_at,
      now,
    ],
  )?;

  insert_event(
    conn,
    Some(&id),
    None,
    None,
    doc.actor.as_deref(),
    "note.created",
    &serde_json::json!({ "slug": slug, "locale": locale }),
    now,
  )?;
  Ok(id)
}

struct AppliedRevision {
  revision_id: String,
  advanced:    bool,
  inserted:    bool,
}

/// The write-path core, shared by admin writes and sync application.
/// Assumes the note row exists. Returns the revision id and whether the
/// pointer advanced; `None` means the write was a no-op.
#[allow(clippy::too_many_arguments)]
fn apply_revision(
  conn: &rusqlite::Connection,
  note: &RawNote,
  doc: &PreparedDoc,
  hold_if_primary_tip: bool,
  force: bool,
  compare_latest: bool,
  now: &str,
) -> CallResult<Option<AppliedRevision>> {
  let tip = pointer_tip(conn, note)?;
  let latest = latest_revision(conn, &note.id)?;
  let tip_is_primary =
    tip.as_ref().is_some_and(|r| r.source.as_str() != "import");
  let hold = hold_if_primary_tip && tip_is_primary && !force;

  // Idempotence guard: sync compares against the newest recorded revision
  // (so a protected revision is not re-recorded on every run); the admin
  // write path compares against the tip the caller is editing.
  let reference_hash = if compare_latest {
    latest.as_ref().map(|r| r.content_hash.as_str())
  } else {
    tip.as_ref().map(|r| r.content_hash.as_str())
  };
  if reference_hash == Some(doc.hash.as_str()) {
    // Already recorded — but when the matching revision was held back by
    // protection and this run may advance (e.g. forced), re-point at it
    // rather than duplicating it.
    if !hold
      && compare_latest
      && let (Some(latest), Some(tip)) = (latest.as_ref(), tip.as_ref())
      && latest.id != tip.id
    {
      let status = current_status(conn, &note.id)?;
      advance_pointers(conn, &note.id, &latest.id, status == "published", now)?;
      insert_event(
        conn,
        Some(&note.id),
        Some(&latest.id),
        None,
        doc.actor.as_deref(),
        "sync.pointer_advanced",
        &serde_json::json!({ "revision_num": latest.revision_num }),
        now,
      )?;
      return Ok(Some(AppliedRevision {
        revision_id: latest.id.clone(),
        advanced:    true,
        inserted:    false,
      }));
    }
    return Ok(None);
  }

  let revision_num = latest.as_ref().map(|r| r.revision_num + 1).unwrap_or(1);
  let supersedes = tip.as_ref().map(|r| r.id.clone());
  let row = doc.revision_row(&note.id, revision_num, supersedes, now);
  insert_revision(conn, &row)?;

  if hold {
    insert_event(
      conn,
      Some(&note.id),
      Some(&row.id),
      None,
      doc.actor.as_deref(),
      "sync.pointer_protected",
      &serde_json::json!({
        "revision_num": revision_num,
        "tip_revision_id": tip.as_ref().map(|r| r.id.clone()),
      }),
      now,
    )?;
    return Ok(Some(AppliedRevision {
      revision_id: row.id,
      advanced:    false,
      inserted:    true,
    }));
  }

  let status = current_status(conn, &note.id)?;
  advance_pointers(conn, &note.id, &row.id, status == "published", now)?;
  insert_event(
    conn,
    Some(&note.id),
    Some(&row.id),
    None,
    doc.actor.as_deref(),
    "revision.written",
    &serde_json::json!({
      "revision_num": revision_num,
      "content_hash": doc.hash,
      "source": doc.source,
    }),
    now,
  )?;
  Ok(Some(AppliedRevision {
    revision_id: row.id,
    advanced:    true,
    inserted:    true,
  }))
}

/// Status may have been updated earlier in the same transaction; re-read it.
fn current_status(
  conn: &rusqlite::Connection,
  note_id: &str,
) -> rusqlite::Result<String> {
  conn.query_row(
    "SELECT status FROM lab_notes WHERE id = ?1",
    rusqlite::params![note_id],
    |row| row.get(0),
  )
}

fn set_status(
  conn: &rusqlite::Connection,
  note: &RawNote,
  status: &str,
  actor: Option<&str>,
  now: &str,
) -> rusqlite::Result<()> {
  if note.status == status {
    return Ok(());
  }
  conn.execute(
    "UPDATE lab_notes SET status = ?2, updated_at = ?3 WHERE id = ?1",
    rusqlite::params![note.id, status, now],
  )?;
  insert_event(
    conn,
    Some(&note.id),
    None,
    None,
    actor,
    "note.status_changed",
    &serde_json::json!({ "from": note.status, "to": status }),
    now,
  )
}

// ─── LedgerStore impl ────────────────────────────────────────────────────────

impl LedgerStore for SqliteStore {
  type Error = Error;

  // ── Notes ──────────────────────────────────────────────────────────────

  async fn upsert_note(&self, input: NoteUpsert) -> Result<Note> {
    let now = encode_dt(Utc::now());
    let tags = input.tags.as_deref().map(encode_tags).transpose()?;
    let status = input.status.map(|s| encode_status(s).to_owned());
    let published_at = input.published_at.map(encode_dt);

    let raw: RawNote = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing = find_note(&tx, &input.slug, &input.locale)?;
        let id = match existing {
          None => {
            let doc = PreparedDoc {
              title:        input.title.clone(),
              status:       status.clone(),
              tags:         tags.clone().unwrap_or_else(|| "[]".to_owned()),
              category:     input.category.clone(),
              author:       input.author.clone(),
              published_at: published_at.clone(),
              frontmatter:  "{}".to_owned(),
              body:         String::new(),
              hash:         String::new(),
              source:       "api".to_owned(),
              intent:       None,
              auth_type:    "api_token".to_owned(),
              scope:        None,
              side_effects: None,
              reversible:   true,
              actor:        input.actor.clone(),
            };
            create_note_row(&tx, &input.slug, &input.locale, &doc, &now)?
          }
          Some(note) => {
            if let Some(title) = &input.title {
              tx.execute(
                "UPDATE lab_notes SET title = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![note.id, title, now],
              )?;
            }
            if let Some(tags) = &tags {
              tx.execute(
                "UPDATE lab_notes SET tags = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![note.id, tags, now],
              )?;
            }
            if let Some(category) = &input.category {
              tx.execute(
                "UPDATE lab_notes SET category = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![note.id, category, now],
              )?;
            }
            if let Some(author) = &input.author {
              tx.execute(
                "UPDATE lab_notes SET author = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![note.id, author, now],
              )?;
            }
            if let Some(published_at) = &published_at {
              tx.execute(
                "UPDATE lab_notes SET published_at = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![note.id, published_at, now],
              )?;
            }
            if let Some(status) = &status {
              set_status(&tx, &note, status, input.actor.as_deref(), &now)?;
            }
            insert_event(
              &tx,
              Some(&note.id),
              None,
              None,
              input.actor.as_deref(),
              "note.metadata_updated",
              &serde_json::json!({ "slug": note.slug, "locale": note.locale }),
              &now,
            )?;
            note.id
          }
        };

        let raw = find_note_by_id(&tx, &id)?
          .ok_or_else(|| abort(labnote_core::Error::NoteNotFound {
            slug:   input.slug.clone(),
            locale: input.locale.clone(),
          }))?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_note()
  }

  async fn get_note(&self, ident: &NoteIdent) -> Result<Option<Note>> {
    let slug = ident.slug.clone();
    let locale = ident.locale.clone();
    let raw = self
      .conn
      .call(move |conn| Ok(find_note(conn, &slug, &locale)?))
      .await?;
    raw.map(RawNote::into_note).transpose()
  }

  async fn get_note_by_id(&self, id: Uuid) -> Result<Option<Note>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(find_note_by_id(conn, &id_str)?))
      .await?;
    raw.map(RawNote::into_note).transpose()
  }

  async fn list_notes(&self, locale: Option<&str>) -> Result<Vec<NotePreview>> {
    let locale = locale.map(str::to_owned);
    let raws: Vec<RawPreview> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(locale) = locale {
          let mut stmt = conn.prepare(
            "SELECT id, group_id, slug, locale, status, title, tags,
                    category, author, revision_num, published_at, updated_at
               FROM lab_note_previews WHERE locale = ?1
              ORDER BY slug",
          )?;
          stmt
            .query_map(rusqlite::params![locale], RawPreview::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT id, group_id, slug, locale, status, title, tags,
                    category, author, revision_num, published_at, updated_at
               FROM lab_note_previews
              ORDER BY slug, locale",
          )?;
          stmt
            .query_map([], RawPreview::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPreview::into_preview).collect()
  }

  // ── Effective content ──────────────────────────────────────────────────

  async fn effective_content(
    &self,
    ident: &NoteIdent,
  ) -> Result<Option<EffectiveNote>> {
    let slug = ident.slug.clone();
    let locale = ident.locale.clone();

    let raw: Option<RawEffective> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {}, e.revision_id, e.revision_num, e.frontmatter,
                        e.content_body, e.content_source
                   FROM lab_notes n
                   JOIN lab_note_effective e ON e.note_id = n.id
                  WHERE n.slug = ?1 AND n.locale = ?2",
                RawNote::COLUMNS
                  .split(',')
                  .map(|c| format!("n.{}", c.trim()))
                  .collect::<Vec<_>>()
                  .join(", ")
              ),
              rusqlite::params![slug, locale],
              |row| {
                Ok(RawEffective {
                  note:           RawNote::from_row(row)?,
                  revision_id:    row.get(15)?,
                  revision_num:   row.get(16)?,
                  frontmatter:    row.get(17)?,
                  content_body:   row.get(18)?,
                  content_source: row.get(19)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEffective::into_effective).transpose()
  }

  // ── Content writes ─────────────────────────────────────────────────────

  async fn write_content(
    &self,
    ident: &NoteIdent,
    write: ContentWrite,
  ) -> Result<WriteOutcome> {
    let slug = ident.slug.clone();
    let locale = ident.locale.clone();
    let doc = PreparedDoc::from_write(&write)?;
    let now = encode_dt(Utc::now());

    let (raw_note, raw_rev, noop): (RawNote, RawRevision, bool) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let note = match find_note(&tx, &slug, &locale)? {
          Some(note) => note,
          None => {
            let id = create_note_row(&tx, &slug, &locale, &doc, &now)?;
            find_note_by_id(&tx, &id)?.ok_or_else(|| {
              abort(labnote_core::Error::NoteNotFound {
                slug:   slug.clone(),
                locale: locale.clone(),
              })
            })?
          }
        };

        // Status and title changes land in the same transaction as the
        // revision insert, which is what lets the published pointer advance
        // on a publish-and-write.
        if let Some(status) = &doc.status {
          set_status(&tx, &note, status, doc.actor.as_deref(), &now)?;
        }
        if let Some(title) = &doc.title
          && *title != note.title
        {
          tx.execute(
            "UPDATE lab_notes SET title = ?2, updated_at = ?3 WHERE id = ?1",
            rusqlite::params![note.id, title, now],
          )?;
        }

        let applied = apply_revision(&tx, &note, &doc, false, false, false, &now)?;

        let (revision_id, noop) = match applied {
          Some(applied) => (applied.revision_id, false),
          None => {
            // No-op write: content matched the tip. Publishing intent still
            // applies — expose the tip if the status flipped to published.
            let tip = pointer_tip(&tx, &note)?.ok_or_else(|| {
              abort(labnote_core::Error::NoteNotFound {
                slug:   slug.clone(),
                locale: locale.clone(),
              })
            })?;
            if current_status(&tx, &note.id)? == "published" {
              advance_pointers(&tx, &note.id, &tip.id, true, &now)?;
            }
            (tip.id, true)
          }
        };

        let raw_note = find_note_by_id(&tx, &note.id)?.ok_or_else(|| {
          abort(labnote_core::Error::NoteNotFound {
            slug:   slug.clone(),
            locale: locale.clone(),
          })
        })?;
        let raw_rev = revision_by_id(&tx, &revision_id)?.ok_or_else(|| {
          abort(labnote_core::Error::RevisionNotFound(Uuid::nil()))
        })?;

        tx.commit()?;
        Ok((raw_note, raw_rev, noop))
      })
      .await?;

    Ok(WriteOutcome {
      note:     raw_note.into_note()?,
      revision: raw_rev.into_revision()?,
      noop,
    })
  }

  async fn get_revision(&self, id: Uuid) -> Result<Option<Revision>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(revision_by_id(conn, &id_str)?))
      .await?;
    raw.map(RawRevision::into_revision).transpose()
  }

  async fn list_revisions(&self, note_id: Uuid) -> Result<Vec<Revision>> {
    let id_str = encode_uuid(note_id);
    let raws: Vec<RawRevision> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM lab_note_revisions WHERE note_id = ?1
            ORDER BY revision_num",
          RawRevision::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawRevision::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRevision::into_revision).collect()
  }

  // ── Pointer repair ─────────────────────────────────────────────────────

  async fn repair_pointers(&self) -> Result<u64> {
    let now = encode_dt(Utc::now());

    let repaired = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let notes: Vec<RawNote> = {
          let mut stmt = tx.prepare(&format!(
            "SELECT {} FROM lab_notes n
              WHERE EXISTS (SELECT 1 FROM lab_note_revisions r
                             WHERE r.note_id = n.id)",
            RawNote::COLUMNS
          ))?;
          let rows = stmt
            .query_map([], RawNote::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        };

        let mut repaired = 0u64;
        for note in notes {
          let current_ok = match &note.current_revision_id {
            Some(id) => revision_by_id(&tx, id)?.is_some(),
            None => false,
          };
          let published_ok = match &note.published_revision_id {
            Some(id) => revision_by_id(&tx, id)?.is_some(),
            None => false,
          };
          let needs_published = note.status == "published" && !published_ok;

          if current_ok && !needs_published {
            continue;
          }

          let Some(best) = latest_revision(&tx, &note.id)? else {
            continue;
          };
          if !current_ok {
            tx.execute(
              "UPDATE lab_notes SET current_revision_id = ?2 WHERE id = ?1",
              rusqlite::params![note.id, best.id],
            )?;
          }
          if needs_published {
            tx.execute(
              "UPDATE lab_notes
                  SET published_revision_id = ?2,
                      published_at          = COALESCE(published_at, ?3)
                WHERE id = ?1",
              rusqlite::params![note.id, best.id, now],
            )?;
          }
          repaired += 1;
        }

        tx.commit()?;
        Ok(repaired)
      })
      .await?;

    Ok(repaired)
  }

  // ── Synchronizer batch ─────────────────────────────────────────────────

  async fn apply_sync(
    &self,
    batch: Vec<NoteFile>,
    opts: SyncOptions,
  ) -> Result<SyncCounters> {
    let now = encode_dt(Utc::now());
    let force = opts.force;

    // Hash and encode outside the transaction; apply inside one.
    let mut prepared = Vec::with_capacity(batch.len());
    for file in &batch {
      let doc = PreparedDoc::from_note_file(file, opts.actor.as_deref())?;
      prepared.push((file.slug.clone(), file.locale.clone(), doc));
    }

    let counters = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut counters = SyncCounters::default();

        for (slug, locale, doc) in &prepared {
          let note = match find_note(&tx, slug, locale)? {
            Some(note) => {
              // Metadata from disk wins for display fields; `published_at`
              // is only overwritten when the file supplies one.
              tx.execute(
                "UPDATE lab_notes
                    SET title        = COALESCE(?2, title),
                        tags         = ?3,
                        category     = ?4,
                        author       = ?5,
                        published_at = COALESCE(?6, published_at),
                        updated_at   = ?7
                  WHERE id = ?1",
                rusqlite::params![
                  note.id,
                  doc.title,
                  doc.tags,
                  doc.category,
                  doc.author,
                  doc.published_at,
                  now,
                ],
              )?;
              if let Some(status) = &doc.status {
                set_status(&tx, &note, status, doc.actor.as_deref(), &now)?;
              }
              note
            }
            None => {
              // Files without a title still become notes: fall back to the
              // slug so a metadata-only file is not a hard error.
              let mut doc_for_create = doc.clone();
              doc_for_create.title =
                doc.title.clone().or_else(|| Some(slug.clone()));
              let id =
                create_note_row(&tx, slug, locale, &doc_for_create, &now)?;
              find_note_by_id(&tx, &id)?.ok_or_else(|| {
                abort(labnote_core::Error::NoteNotFound {
                  slug:   slug.clone(),
                  locale: locale.clone(),
                })
              })?
            }
          };
          counters.notes_upserted += 1;

          // Guard: an empty body never creates a revision and never touches
          // pointers, force or not.
          if doc.body.trim().is_empty() {
            counters.empty_skipped += 1;
            continue;
          }

          match apply_revision(&tx, &note, doc, true, force, true, &now)? {
            None => counters.unchanged_skipped += 1,
            Some(applied) => {
              if applied.inserted {
                counters.revisions_inserted += 1;
              }
              if applied.advanced {
                counters.pointers_advanced += 1;
              } else {
                counters.pointers_protected += 1;
              }
            }
          }
        }

        tx.commit()?;
        Ok(counters)
      })
      .await?;

    Ok(counters)
  }

  // ── Events ─────────────────────────────────────────────────────────────

  async fn record_event(&self, event: NewEvent) -> Result<Event> {
    let id = Uuid::new_v4();
    let id_str = encode_uuid(id);
    let now = encode_dt(Utc::now());
    let note_id = event.note_id.map(encode_uuid);
    let revision_id = event.revision_id.map(encode_uuid);
    let proposal_id = event.proposal_id.map(encode_uuid);

    let raw: RawEvent = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO lab_note_events (
             id, note_id, revision_id, proposal_id, actor, action, payload,
             created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            note_id,
            revision_id,
            proposal_id,
            event.actor,
            event.action,
            event.payload.to_string(),
            now,
          ],
        )?;
        Ok(
          conn.query_row(
            &format!(
              "SELECT {} FROM lab_note_events WHERE id = ?1",
              RawEvent::COLUMNS
            ),
            rusqlite::params![id_str],
            RawEvent::from_row,
          )?,
        )
      })
      .await?;

    raw.into_event()
  }

  async fn list_events(&self, note_id: Uuid) -> Result<Vec<Event>> {
    let id_str = encode_uuid(note_id);
    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM lab_note_events WHERE note_id = ?1
            ORDER BY created_at, rowid",
          RawEvent::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  // ── Proposals ──────────────────────────────────────────────────────────

  async fn create_proposal(
    &self,
    ident: &NoteIdent,
    write: ContentWrite,
  ) -> Result<Proposal> {
    let slug = ident.slug.clone();
    let locale = ident.locale.clone();
    let doc = PreparedDoc::from_write(&write)?;
    let now = encode_dt(Utc::now());

    let raw: RawProposal = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let note = find_note(&tx, &slug, &locale)?.ok_or_else(|| {
          abort(labnote_core::Error::NoteNotFound {
            slug:   slug.clone(),
            locale: locale.clone(),
          })
        })?;

        let tip = pointer_tip(&tx, &note)?;
        let latest = latest_revision(&tx, &note.id)?;
        let revision_num =
          latest.as_ref().map(|r| r.revision_num + 1).unwrap_or(1);

        // The proposed content is a real revision; only the pointers wait
        // for review.
        let row = doc.revision_row(
          &note.id,
          revision_num,
          tip.as_ref().map(|r| r.id.clone()),
          &now,
        );
        insert_revision(&tx, &row)?;

        let proposal_id = encode_uuid(Uuid::new_v4());
        tx.execute(
          "INSERT INTO lab_note_proposals (
             id, note_id, base_revision_id, proposed_revision_id, status,
             created_at
           ) VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
          rusqlite::params![
            proposal_id,
            note.id,
            tip.as_ref().map(|r| r.id.clone()),
            row.id,
            now,
          ],
        )?;
        insert_event(
          &tx,
          Some(&note.id),
          Some(&row.id),
          Some(&proposal_id),
          doc.actor.as_deref(),
          "proposal.created",
          &serde_json::json!({ "revision_num": revision_num }),
          &now,
        )?;

        let raw = tx.query_row(
          &format!(
            "SELECT {} FROM lab_note_proposals WHERE id = ?1",
            RawProposal::COLUMNS
          ),
          rusqlite::params![proposal_id],
          RawProposal::from_row,
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_proposal()
  }

  async fn review_proposal(
    &self,
    id: Uuid,
    decision: ProposalDecision,
    reviewer: Option<String>,
  ) -> Result<Proposal> {
    let id_str = encode_uuid(id);
    let status = encode_proposal_status(decision.into_status()).to_owned();
    let accept = decision == ProposalDecision::Accept;
    let now = encode_dt(Utc::now());

    let raw: RawProposal = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let proposal = tx
          .query_row(
            &format!(
              "SELECT {} FROM lab_note_proposals WHERE id = ?1",
              RawProposal::COLUMNS
            ),
            rusqlite::params![id_str],
            RawProposal::from_row,
          )
          .optional()?
          .ok_or_else(|| {
            abort(labnote_core::Error::ProposalNotFound(id))
          })?;

        if proposal.status != "pending" {
          return Err(abort(labnote_core::Error::ProposalNotPending(id)));
        }

        tx.execute(
          "UPDATE lab_note_proposals
              SET status = ?2, reviewer = ?3, resolved_at = ?4
            WHERE id = ?1",
          rusqlite::params![id_str, status, reviewer, now],
        )?;

        if accept {
          let note =
            find_note_by_id(&tx, &proposal.note_id)?.ok_or_else(|| {
              abort(labnote_core::Error::ProposalNotFound(id))
            })?;
          let proposed = revision_by_id(&tx, &proposal.proposed_revision_id)?
            .ok_or_else(|| {
              abort(labnote_core::Error::RevisionNotFound(id))
            })?;

          tx.execute(
            "UPDATE lab_notes SET current_revision_id = ?2, updated_at = ?3
              WHERE id = ?1",
            rusqlite::params![note.id, proposed.id, now],
          )?;

          // Published pointer only ever advances: accepting a stale
          // proposal must not rewind what readers see.
          if note.status == "published" {
            let published_num = match &note.published_revision_id {
              Some(pid) => {
                revision_by_id(&tx, pid)?.map(|r| r.revision_num)
              }
              None => None,
            };
            if published_num.is_none_or(|n| proposed.revision_num >= n) {
              tx.execute(
                "UPDATE lab_notes
                    SET published_revision_id = ?2,
                        published_at          = COALESCE(published_at, ?3)
                  WHERE id = ?1",
                rusqlite::params![note.id, proposed.id, now],
              )?;
            }
          }
        }

        let note_id = proposal.note_id.clone();
        insert_event(
          &tx,
          Some(&note_id),
          Some(&proposal.proposed_revision_id),
          Some(&id_str),
          reviewer.as_deref(),
          &format!("proposal.{status}"),
          &serde_json::Value::Null,
          &now,
        )?;

        let raw = tx.query_row(
          &format!(
            "SELECT {} FROM lab_note_proposals WHERE id = ?1",
            RawProposal::COLUMNS
          ),
          rusqlite::params![id_str],
          RawProposal::from_row,
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_proposal()
  }

  async fn list_proposals(
    &self,
    status: Option<ProposalStatus>,
  ) -> Result<Vec<Proposal>> {
    let status = status.map(|s| encode_proposal_status(s).to_owned());
    let raws: Vec<RawProposal> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(status) = status {
          let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM lab_note_proposals WHERE status = ?1
              ORDER BY created_at",
            RawProposal::COLUMNS
          ))?;
          stmt
            .query_map(rusqlite::params![status], RawProposal::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM lab_note_proposals ORDER BY created_at",
            RawProposal::COLUMNS
          ))?;
          stmt
            .query_map([], RawProposal::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProposal::into_proposal).collect()
  }
}
