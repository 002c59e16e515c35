//! Integration tests for `SqliteStore` against an in-memory database.

use labnote_core::{
  frontmatter::Frontmatter,
  note::{ContentSource, NoteIdent, NoteStatus, NoteUpsert},
  proposal::{ProposalDecision, ProposalStatus},
  revision::{ContentWrite, Provenance, Source},
  store::LedgerStore,
  sync::{NoteFile, SyncOptions},
};
use uuid::Uuid;

use crate::{CURRENT_VERSION, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn ident(slug: &str) -> NoteIdent { NoteIdent::new(slug, "en") }

fn write(title: &str, body: &str) -> ContentWrite {
  ContentWrite {
    title: Some(title.into()),
    ..ContentWrite::new(body)
  }
}

fn note_file(slug: &str, title: &str, body: &str) -> NoteFile {
  NoteFile {
    slug:        slug.into(),
    locale:      "en".into(),
    frontmatter: Frontmatter {
      title: Some(title.into()),
      slug: Some(slug.into()),
      ..Frontmatter::default()
    },
    body:        body.into(),
  }
}

// ─── Migration ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn migrate_fresh_database_runs_every_step() {
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  let s = SqliteStore::attach(conn);

  let report = s.migrate().await.unwrap();
  assert_eq!(report.from_version, 0);
  assert_eq!(report.to_version, CURRENT_VERSION);
  assert_eq!(report.steps_run, CURRENT_VERSION as u32);
}

#[tokio::test]
async fn migrate_is_idempotent() {
  let s = store().await;

  let report = s.migrate().await.unwrap();
  assert_eq!(report.from_version, CURRENT_VERSION);
  assert_eq!(report.steps_run, 0);
  assert_eq!(report.columns_added, 0);
}

#[tokio::test]
async fn migrate_heals_bare_id_table() {
  // The oldest shape in the wild: nothing but primary keys.
  let legacy_id = "3e9c1a52-0b9e-4f0a-8c30-b1dd4f6f3a11";
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  let seed_id = legacy_id.to_owned();
  conn
    .call(move |conn| {
      conn.execute_batch("CREATE TABLE lab_notes (id TEXT PRIMARY KEY);")?;
      conn.execute(
        "INSERT INTO lab_notes (id) VALUES (?1)",
        rusqlite::params![seed_id],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let s = SqliteStore::attach(conn);
  let report = s.migrate().await.unwrap();
  assert!(report.columns_added >= 12);

  // Backfill: slug = id, group_id = id, title = slug.
  let note = s.get_note(&ident(legacy_id)).await.unwrap().unwrap();
  assert_eq!(note.id.to_string(), legacy_id);
  assert_eq!(note.group_id, note.id);
  assert_eq!(note.locale, "en");
  assert_eq!(note.status, NoteStatus::Draft);
  assert_eq!(note.title, legacy_id);
}

#[tokio::test]
async fn migrate_carries_inline_content_to_legacy_column() {
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  conn
    .call(|conn| {
      conn.execute_batch(
        "CREATE TABLE lab_notes (
           id TEXT PRIMARY KEY, slug TEXT, title TEXT, content TEXT,
           status TEXT, created_at TEXT, updated_at TEXT
         );
         INSERT INTO lab_notes (id, slug, title, content, status)
         VALUES ('7c56e6f1-6a3f-4b46-9a37-2f2dce1c9f07',
                 'old-note', 'Old Note', 'inline body', 'draft');",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let s = SqliteStore::attach(conn);
  s.migrate().await.unwrap();

  let note = s.get_note(&ident("old-note")).await.unwrap().unwrap();
  assert_eq!(note.legacy_content.as_deref(), Some("inline body"));

  let effective = s
    .effective_content(&ident("old-note"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(effective.source, ContentSource::Legacy);
  assert_eq!(effective.body, "inline body");
}

// ─── Content writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn write_creates_note_and_first_revision() {
  let s = store().await;

  let outcome = s
    .write_content(&ident("field-notes"), write("Field Notes", "hello"))
    .await
    .unwrap();

  assert!(!outcome.noop);
  assert_eq!(outcome.revision.revision_num, 1);
  assert_eq!(outcome.revision.supersedes_revision_id, None);
  assert_eq!(outcome.note.current_revision_id, Some(outcome.revision.id));
  assert_eq!(outcome.note.published_revision_id, None);
  assert_eq!(outcome.note.status, NoteStatus::Draft);
}

#[tokio::test]
async fn write_without_title_on_missing_note_fails() {
  let s = store().await;

  let result = s
    .write_content(&ident("untitled"), ContentWrite::new("body"))
    .await;
  assert!(matches!(
    result,
    Err(crate::Error::Core(labnote_core::Error::MissingTitle(_)))
  ));
}

#[tokio::test]
async fn identical_write_is_a_noop() {
  let s = store().await;
  let id = ident("field-notes");

  let first = s
    .write_content(&id, write("Field Notes", "hello"))
    .await
    .unwrap();
  let second = s
    .write_content(&id, write("Field Notes", "hello"))
    .await
    .unwrap();

  assert!(second.noop);
  assert_eq!(second.revision.id, first.revision.id);
  assert_eq!(
    s.list_revisions(first.note.id).await.unwrap().len(),
    1
  );
}

#[tokio::test]
async fn revisions_chain_through_supersedes() {
  let s = store().await;
  let id = ident("field-notes");

  let first = s
    .write_content(&id, write("Field Notes", "one"))
    .await
    .unwrap();
  let second = s
    .write_content(&id, write("Field Notes", "two"))
    .await
    .unwrap();

  assert_eq!(second.revision.revision_num, 2);
  assert_eq!(
    second.revision.supersedes_revision_id,
    Some(first.revision.id)
  );
}

#[tokio::test]
async fn publish_write_advances_both_pointers() {
  let s = store().await;
  let id = ident("field-notes");

  s.write_content(&id, write("Field Notes", "draft body"))
    .await
    .unwrap();

  let published = s
    .write_content(&id, ContentWrite {
      status: Some(NoteStatus::Published),
      ..write("Field Notes", "public body")
    })
    .await
    .unwrap();

  assert_eq!(published.note.status, NoteStatus::Published);
  assert_eq!(
    published.note.current_revision_id,
    Some(published.revision.id)
  );
  assert_eq!(
    published.note.published_revision_id,
    Some(published.revision.id)
  );
  assert!(published.note.published_at.is_some());
}

#[tokio::test]
async fn noop_write_still_applies_publish() {
  let s = store().await;
  let id = ident("field-notes");

  let first = s
    .write_content(&id, write("Field Notes", "body"))
    .await
    .unwrap();

  let outcome = s
    .write_content(&id, ContentWrite {
      status: Some(NoteStatus::Published),
      ..write("Field Notes", "body")
    })
    .await
    .unwrap();

  assert!(outcome.noop);
  assert_eq!(outcome.note.status, NoteStatus::Published);
  assert_eq!(
    outcome.note.published_revision_id,
    Some(first.revision.id)
  );
}

#[tokio::test]
async fn write_to_a_published_note_republishes() {
  let s = store().await;
  let id = ident("field-notes");

  s.write_content(&id, ContentWrite {
    status: Some(NoteStatus::Published),
    ..write("Field Notes", "v1")
  })
  .await
  .unwrap();

  // No explicit status: the note is already published, so the new revision
  // goes live in the same operation.
  let second = s
    .write_content(&id, write("Field Notes", "v2"))
    .await
    .unwrap();

  assert_eq!(
    second.note.published_revision_id,
    Some(second.revision.id)
  );
  let effective = s.effective_content(&id).await.unwrap().unwrap();
  assert_eq!(effective.body, "v2");
}

// ─── Effective content ───────────────────────────────────────────────────────

#[tokio::test]
async fn effective_prefers_published_pointer() {
  let s = store().await;
  let id = ident("field-notes");

  s.write_content(&id, ContentWrite {
    status: Some(NoteStatus::Published),
    ..write("Field Notes", "v1 public")
  })
  .await
  .unwrap();
  let proposal = s
    .create_proposal(&id, write("Field Notes", "v2 proposed"))
    .await
    .unwrap();
  let newer = s
    .write_content(&id, write("Field Notes", "v3 public"))
    .await
    .unwrap();

  // Accepting the stale proposal pulls `current` back to it while the
  // published pointer stays on the newer revision; readers resolve through
  // the published pointer.
  s.review_proposal(proposal.id, ProposalDecision::Accept, None)
    .await
    .unwrap();

  let note = s.get_note(&id).await.unwrap().unwrap();
  assert_ne!(note.current_revision_id, note.published_revision_id);

  let effective = s.effective_content(&id).await.unwrap().unwrap();
  assert_eq!(effective.source, ContentSource::Published);
  assert_eq!(effective.revision_id, Some(newer.revision.id));
  assert_eq!(effective.body, "v3 public");
}

#[tokio::test]
async fn effective_uses_current_pointer_for_drafts() {
  let s = store().await;
  let id = ident("field-notes");

  let outcome = s
    .write_content(&id, write("Field Notes", "draft body"))
    .await
    .unwrap();

  let effective = s.effective_content(&id).await.unwrap().unwrap();
  assert_eq!(effective.source, ContentSource::Draft);
  assert_eq!(effective.revision_id, Some(outcome.revision.id));
}

#[tokio::test]
async fn effective_is_pending_for_note_without_content() {
  let s = store().await;

  s.upsert_note(NoteUpsert {
    title: Some("Empty".into()),
    ..NoteUpsert::new("empty", "en")
  })
  .await
  .unwrap();

  let effective = s.effective_content(&ident("empty")).await.unwrap().unwrap();
  assert_eq!(effective.source, ContentSource::Pending);
  assert_eq!(effective.body, "");
  assert_eq!(effective.revision_id, None);
}

#[tokio::test]
async fn effective_missing_note_is_none() {
  let s = store().await;
  let result = s.effective_content(&ident("nope")).await.unwrap();
  assert!(result.is_none());
}

// ─── Pointer repair ──────────────────────────────────────────────────────────

#[tokio::test]
async fn repair_fixes_dangling_current_pointer() {
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  let s = SqliteStore::attach(conn.clone());
  s.migrate().await.unwrap();

  let id = ident("field-notes");
  let outcome = s
    .write_content(&id, write("Field Notes", "body"))
    .await
    .unwrap();

  // A pointer that decodes fine but matches no revision row.
  conn
    .call(|conn| {
      conn.execute(
        "UPDATE lab_notes SET current_revision_id =
           '11f3c6e4-9d7a-4c7e-8b61-5a0d6c6f2b9d'",
        [],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  // Dangling pointer: the read path falls back on its own...
  let effective = s.effective_content(&id).await.unwrap().unwrap();
  assert_eq!(effective.source, ContentSource::Fallback);
  assert_eq!(effective.revision_id, Some(outcome.revision.id));

  // ...and repair makes it a proper tip again.
  let repaired = s.repair_pointers().await.unwrap();
  assert_eq!(repaired, 1);

  let note = s.get_note(&id).await.unwrap().unwrap();
  assert_eq!(note.current_revision_id, Some(outcome.revision.id));

  assert_eq!(s.repair_pointers().await.unwrap(), 0);
}

#[tokio::test]
async fn repair_sets_published_pointer_for_published_notes() {
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  let s = SqliteStore::attach(conn.clone());
  s.migrate().await.unwrap();

  let id = ident("field-notes");
  let outcome = s
    .write_content(&id, ContentWrite {
      status: Some(NoteStatus::Published),
      ..write("Field Notes", "body")
    })
    .await
    .unwrap();

  conn
    .call(|conn| {
      conn.execute(
        "UPDATE lab_notes
            SET current_revision_id = NULL, published_revision_id = NULL",
        [],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  assert_eq!(s.repair_pointers().await.unwrap(), 1);

  let note = s.get_note(&id).await.unwrap().unwrap();
  assert_eq!(note.current_revision_id, Some(outcome.revision.id));
  assert_eq!(note.published_revision_id, Some(outcome.revision.id));
}

// ─── Sync batches ────────────────────────────────────────────────────────────

#[tokio::test]
async fn sync_creates_notes_and_advances_pointers() {
  let s = store().await;

  let counters = s
    .apply_sync(
      vec![note_file("a", "A", "body a"), note_file("b", "B", "body b")],
      SyncOptions::default(),
    )
    .await
    .unwrap();

  assert_eq!(counters.notes_upserted, 2);
  assert_eq!(counters.revisions_inserted, 2);
  assert_eq!(counters.pointers_advanced, 2);
  assert_eq!(counters.pointers_protected, 0);

  let effective = s.effective_content(&ident("a")).await.unwrap().unwrap();
  assert_eq!(effective.body, "body a");
  assert_eq!(
    effective.frontmatter.unwrap().title.as_deref(),
    Some("A")
  );
}

#[tokio::test]
async fn sync_is_idempotent() {
  let s = store().await;
  let batch = vec![note_file("a", "A", "body a")];

  s.apply_sync(batch.clone(), SyncOptions::default())
    .await
    .unwrap();
  let second = s
    .apply_sync(batch, SyncOptions::default())
    .await
    .unwrap();

  assert_eq!(second.revisions_inserted, 0);
  assert_eq!(second.unchanged_skipped, 1);

  let note = s.get_note(&ident("a")).await.unwrap().unwrap();
  assert_eq!(s.list_revisions(note.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sync_skips_empty_bodies() {
  let s = store().await;

  let counters = s
    .apply_sync(
      vec![note_file("stub", "Stub", "  \n  ")],
      SyncOptions::default(),
    )
    .await
    .unwrap();

  assert_eq!(counters.empty_skipped, 1);
  assert_eq!(counters.revisions_inserted, 0);

  // The note row still exists — metadata-only files are not errors.
  let effective = s.effective_content(&ident("stub")).await.unwrap().unwrap();
  assert_eq!(effective.source, ContentSource::Pending);
}

#[tokio::test]
async fn sync_protects_a_primary_surface_tip() {
  let s = store().await;
  let id = ident("launch-notes");

  // Day 1: the note arrives from disk.
  s.apply_sync(
    vec![note_file("launch-notes", "Launch Notes", "v1 from disk")],
    SyncOptions::default(),
  )
  .await
  .unwrap();

  // Day 2: someone edits it in the admin UI.
  let web_edit = s
    .write_content(&id, ContentWrite {
      provenance: Provenance {
        source: Source::Web,
        auth_type: labnote_core::revision::AuthType::HumanSession,
        ..Provenance::default()
      },
      ..write("Launch Notes", "v2 edited in admin")
    })
    .await
    .unwrap();

  // Day 3: a sync run carries the stale disk copy plus other changes.
  let counters = s
    .apply_sync(
      vec![note_file("launch-notes", "Launch Notes", "v3 stale disk copy")],
      SyncOptions::default(),
    )
    .await
    .unwrap();

  // The disk content is recorded but the admin edit stays live.
  assert_eq!(counters.revisions_inserted, 1);
  assert_eq!(counters.pointers_protected, 1);
  assert_eq!(counters.pointers_advanced, 0);

  let note = s.get_note(&id).await.unwrap().unwrap();
  assert_eq!(note.current_revision_id, Some(web_edit.revision.id));
  let effective = s.effective_content(&id).await.unwrap().unwrap();
  assert_eq!(effective.body, "v2 edited in admin");

  // The protected revision still exists in the log.
  assert_eq!(s.list_revisions(note.id).await.unwrap().len(), 3);

  // Re-running the same sync does not re-record the protected revision.
  let rerun = s
    .apply_sync(
      vec![note_file("launch-notes", "Launch Notes", "v3 stale disk copy")],
      SyncOptions::default(),
    )
    .await
    .unwrap();
  assert_eq!(rerun.revisions_inserted, 0);
  assert_eq!(rerun.unchanged_skipped, 1);
}

#[tokio::test]
async fn forced_sync_overrides_protection() {
  let s = store().await;
  let id = ident("launch-notes");

  s.write_content(&id, write("Launch Notes", "primary edit"))
    .await
    .unwrap();

  let counters = s
    .apply_sync(
      vec![note_file("launch-notes", "Launch Notes", "forced from disk")],
      SyncOptions { force: true, actor: None },
    )
    .await
    .unwrap();

  assert_eq!(counters.pointers_advanced, 1);
  assert_eq!(counters.pointers_protected, 0);

  let effective = s.effective_content(&id).await.unwrap().unwrap();
  assert_eq!(effective.body, "forced from disk");
}

#[tokio::test]
async fn forced_rerun_reuses_the_protected_revision() {
  let s = store().await;
  let id = ident("a");

  s.write_content(&id, write("A", "primary edit")).await.unwrap();
  s.apply_sync(vec![note_file("a", "A", "from disk")], SyncOptions::default())
    .await
    .unwrap();

  // Same file again, forced: the held-back revision already exists, so it
  // is re-pointed at rather than re-recorded.
  let counters = s
    .apply_sync(
      vec![note_file("a", "A", "from disk")],
      SyncOptions { force: true, actor: None },
    )
    .await
    .unwrap();

  assert_eq!(counters.revisions_inserted, 0);
  assert_eq!(counters.pointers_advanced, 1);

  let note = s.get_note(&id).await.unwrap().unwrap();
  assert_eq!(s.list_revisions(note.id).await.unwrap().len(), 2);
  let effective = s.effective_content(&id).await.unwrap().unwrap();
  assert_eq!(effective.body, "from disk");
}

#[tokio::test]
async fn sync_over_an_import_tip_advances_without_force() {
  let s = store().await;
  let id = ident("a");

  s.apply_sync(vec![note_file("a", "A", "first")], SyncOptions::default())
    .await
    .unwrap();
  let counters = s
    .apply_sync(vec![note_file("a", "A", "second")], SyncOptions::default())
    .await
    .unwrap();

  assert_eq!(counters.pointers_advanced, 1);
  assert_eq!(counters.pointers_protected, 0);

  let effective = s.effective_content(&id).await.unwrap().unwrap();
  assert_eq!(effective.body, "second");
}

// ─── Notes & metadata ────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_requires_title_on_create() {
  let s = store().await;

  let result = s.upsert_note(NoteUpsert::new("untitled", "en")).await;
  assert!(matches!(
    result,
    Err(crate::Error::Core(labnote_core::Error::MissingTitle(_)))
  ));
}

#[tokio::test]
async fn upsert_updates_metadata_without_touching_content() {
  let s = store().await;
  let id = ident("field-notes");

  let outcome = s
    .write_content(&id, write("Field Notes", "body"))
    .await
    .unwrap();

  let note = s
    .upsert_note(NoteUpsert {
      title: Some("Renamed".into()),
      tags: Some(vec!["lab".into(), "notes".into()]),
      category: Some("research".into()),
      ..NoteUpsert::new("field-notes", "en")
    })
    .await
    .unwrap();

  assert_eq!(note.title, "Renamed");
  assert_eq!(note.tags, vec!["lab".to_string(), "notes".to_string()]);
  assert_eq!(note.category.as_deref(), Some("research"));
  assert_eq!(note.current_revision_id, Some(outcome.revision.id));
  assert_eq!(s.list_revisions(note.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn translations_share_a_group() {
  let s = store().await;

  let en = s
    .write_content(&NoteIdent::new("guide", "en"), write("Guide", "hello"))
    .await
    .unwrap();
  let de = s
    .write_content(&NoteIdent::new("guide", "de"), write("Anleitung", "hallo"))
    .await
    .unwrap();

  assert_ne!(en.note.id, de.note.id);
  assert_eq!(en.note.group_id, de.note.group_id);
}

#[tokio::test]
async fn list_notes_filters_by_locale() {
  let s = store().await;

  s.write_content(&NoteIdent::new("guide", "en"), write("Guide", "a"))
    .await
    .unwrap();
  s.write_content(&NoteIdent::new("guide", "de"), write("Anleitung", "b"))
    .await
    .unwrap();
  s.write_content(&NoteIdent::new("intro", "en"), write("Intro", "c"))
    .await
    .unwrap();

  let all = s.list_notes(None).await.unwrap();
  assert_eq!(all.len(), 3);

  let de = s.list_notes(Some("de")).await.unwrap();
  assert_eq!(de.len(), 1);
  assert_eq!(de[0].slug, "guide");
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn writes_leave_an_audit_trail() {
  let s = store().await;
  let id = ident("field-notes");

  let outcome = s
    .write_content(&id, write("Field Notes", "body"))
    .await
    .unwrap();

  let events = s.list_events(outcome.note.id).await.unwrap();
  let actions: Vec<&str> =
    events.iter().map(|e| e.action.as_str()).collect();
  assert!(actions.contains(&"note.created"));
  assert!(actions.contains(&"revision.written"));
}

#[tokio::test]
async fn protection_is_recorded_as_an_event() {
  let s = store().await;
  let id = ident("a");

  s.write_content(&id, write("A", "primary")).await.unwrap();
  s.apply_sync(vec![note_file("a", "A", "from disk")], SyncOptions::default())
    .await
    .unwrap();

  let note = s.get_note(&id).await.unwrap().unwrap();
  let events = s.list_events(note.id).await.unwrap();
  assert!(
    events
      .iter()
      .any(|e| e.action == "sync.pointer_protected")
  );
}

// ─── Proposals ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn proposal_records_revision_without_moving_pointers() {
  let s = store().await;
  let id = ident("field-notes");

  let base = s
    .write_content(&id, write("Field Notes", "original"))
    .await
    .unwrap();

  let proposal = s
    .create_proposal(&id, write("Field Notes", "proposed change"))
    .await
    .unwrap();

  assert_eq!(proposal.status, ProposalStatus::Pending);
  assert_eq!(proposal.base_revision_id, Some(base.revision.id));

  let note = s.get_note(&id).await.unwrap().unwrap();
  assert_eq!(note.current_revision_id, Some(base.revision.id));
  assert_eq!(s.list_revisions(note.id).await.unwrap().len(), 2);

  let effective = s.effective_content(&id).await.unwrap().unwrap();
  assert_eq!(effective.body, "original");
}

#[tokio::test]
async fn accepting_a_proposal_advances_the_pointer() {
  let s = store().await;
  let id = ident("field-notes");

  s.write_content(&id, write("Field Notes", "original"))
    .await
    .unwrap();
  let proposal = s
    .create_proposal(&id, write("Field Notes", "proposed change"))
    .await
    .unwrap();

  let reviewed = s
    .review_proposal(
      proposal.id,
      ProposalDecision::Accept,
      Some("editor".into()),
    )
    .await
    .unwrap();
  assert_eq!(reviewed.status, ProposalStatus::Accepted);
  assert_eq!(reviewed.reviewer.as_deref(), Some("editor"));
  assert!(reviewed.resolved_at.is_some());

  let effective = s.effective_content(&id).await.unwrap().unwrap();
  assert_eq!(effective.body, "proposed change");
}

#[tokio::test]
async fn rejecting_a_proposal_leaves_the_note_untouched() {
  let s = store().await;
  let id = ident("field-notes");

  let base = s
    .write_content(&id, write("Field Notes", "original"))
    .await
    .unwrap();
  let proposal = s
    .create_proposal(&id, write("Field Notes", "proposed change"))
    .await
    .unwrap();

  s.review_proposal(proposal.id, ProposalDecision::Reject, None)
    .await
    .unwrap();

  let note = s.get_note(&id).await.unwrap().unwrap();
  assert_eq!(note.current_revision_id, Some(base.revision.id));
}

#[tokio::test]
async fn reviewing_twice_fails() {
  let s = store().await;
  let id = ident("field-notes");

  s.write_content(&id, write("Field Notes", "original"))
    .await
    .unwrap();
  let proposal = s
    .create_proposal(&id, write("Field Notes", "change"))
    .await
    .unwrap();

  s.review_proposal(proposal.id, ProposalDecision::Reject, None)
    .await
    .unwrap();
  let again = s
    .review_proposal(proposal.id, ProposalDecision::Accept, None)
    .await;
  assert!(matches!(
    again,
    Err(crate::Error::Core(labnote_core::Error::ProposalNotPending(_)))
  ));
}

#[tokio::test]
async fn accepting_a_stale_proposal_never_rewinds_published() {
  let s = store().await;
  let id = ident("field-notes");

  // Publish, then draft a proposal, then publish something newer.
  s.write_content(&id, ContentWrite {
    status: Some(NoteStatus::Published),
    ..write("Field Notes", "v1 public")
  })
  .await
  .unwrap();
  let proposal = s
    .create_proposal(&id, write("Field Notes", "v2 proposed"))
    .await
    .unwrap();
  let newer = s
    .write_content(&id, write("Field Notes", "v3 newer publish"))
    .await
    .unwrap();

  s.review_proposal(proposal.id, ProposalDecision::Accept, None)
    .await
    .unwrap();

  let note = s.get_note(&id).await.unwrap().unwrap();
  // Current moved to the accepted proposal...
  assert_eq!(note.current_revision_id, Some(proposal.proposed_revision_id));
  // ...but readers still see the newer published revision.
  assert_eq!(
    note.published_revision_id,
    Some(newer.revision.id)
  );
}

#[tokio::test]
async fn list_proposals_filters_by_status() {
  let s = store().await;
  let id = ident("field-notes");

  s.write_content(&id, write("Field Notes", "original"))
    .await
    .unwrap();
  let p1 = s
    .create_proposal(&id, write("Field Notes", "change one"))
    .await
    .unwrap();
  s.create_proposal(&id, write("Field Notes", "change two"))
    .await
    .unwrap();
  s.review_proposal(p1.id, ProposalDecision::Withdraw, None)
    .await
    .unwrap();

  let pending = s
    .list_proposals(Some(ProposalStatus::Pending))
    .await
    .unwrap();
  assert_eq!(pending.len(), 1);

  let all = s.list_proposals(None).await.unwrap();
  assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn review_of_unknown_proposal_fails() {
  let s = store().await;
  let result = s
    .review_proposal(Uuid::new_v4(), ProposalDecision::Accept, None)
    .await;
  assert!(matches!(
    result,
    Err(crate::Error::Core(labnote_core::Error::ProposalNotFound(_)))
  ));
}
