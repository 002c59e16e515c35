//! Versioned schema migrator.
//!
//! Brings any database — fresh, or written by an older version of this
//! system — to [`CURRENT_VERSION`]. The version lives in the `ledger_meta`
//! key/value table; a missing table or row reads as version 0.
//!
//! Every step is idempotent and runs in its own transaction, with the
//! version bump committed in the same transaction as the step's DDL, so a
//! crash mid-pass leaves a database the next pass can resume from. Column
//! additions never rewrite rows; removing or renaming a column goes through
//! a shadow-table rebuild with foreign-key checking disabled for the
//! duration (step 4).

use rusqlite::{Connection, OptionalExtension as _, Transaction};

use crate::schema;

pub const CURRENT_VERSION: i64 = 5;

/// What one migrator pass did. A second pass over the same database reports
/// `steps_run == 0` and `columns_added == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
  pub from_version:  i64,
  pub to_version:    i64,
  pub steps_run:     u32,
  pub columns_added: u32,
}

/// Run all outstanding steps, then recreate the derived views.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<MigrationReport> {
  conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;
  conn.execute_batch(schema::META_TABLE)?;

  let from = schema_version(conn)?;
  let mut report = MigrationReport {
    from_version: from,
    to_version:   from.max(CURRENT_VERSION),
    ..MigrationReport::default()
  };

  for version in (from + 1)..=CURRENT_VERSION {
    apply_step(conn, version, &mut report)?;
    report.steps_run += 1;
  }

  // Views are cheap and must never drift from the table shape: drop and
  // recreate them on every run, whether or not any step executed.
  let tx = conn.transaction()?;
  tx.execute_batch(schema::RECREATE_VIEWS)?;
  tx.commit()?;

  Ok(report)
}

/// Current schema version; 0 when the meta table or row is absent.
pub fn schema_version(conn: &Connection) -> rusqlite::Result<i64> {
  let meta_exists: bool = conn
    .query_row(
      "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'ledger_meta'",
      [],
      |_| Ok(true),
    )
    .optional()?
    .unwrap_or(false);

  if !meta_exists {
    return Ok(0);
  }

  Ok(
    conn
      .query_row(
        "SELECT CAST(value AS INTEGER) FROM ledger_meta
          WHERE key = 'schema_version'",
        [],
        |row| row.get(0),
      )
      .optional()?
      .unwrap_or(0),
  )
}

fn set_version(tx: &Transaction<'_>, version: i64) -> rusqlite::Result<()> {
  tx.execute(
    "INSERT INTO ledger_meta (key, value) VALUES ('schema_version', ?1)
       ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    rusqlite::params![version.to_string()],
  )?;
  Ok(())
}

fn apply_step(
  conn: &mut Connection,
  version: i64,
  report: &mut MigrationReport,
) -> rusqlite::Result<()> {
  // The rebuild step drops and recreates `lab_notes` while other tables
  // still reference it.
  let rebuild = version == 4;
  if rebuild {
    conn.pragma_update(None, "foreign_keys", false)?;
  }

  let result = (|| {
    let tx = conn.transaction()?;
    match version {
      1 => step_v1_base_table(&tx)?,
      2 => step_v2_identity_columns(&tx, report)?,
      3 => step_v3_revision_log(&tx, report)?,
      4 => step_v4_rebuild_notes(&tx)?,
      5 => step_v5_proposals(&tx)?,
      // The caller iterates (from + 1)..=CURRENT_VERSION.
      other => unreachable!("no migration step for schema version {other}"),
    }
    set_version(&tx, version)?;
    tx.commit()
  })();

  if rebuild {
    conn.pragma_update(None, "foreign_keys", true)?;
  }
  result
}

// ─── Steps ───────────────────────────────────────────────────────────────────

/// v1: the original note table (content still inline).
fn step_v1_base_table(tx: &Transaction<'_>) -> rusqlite::Result<()> {
  tx.execute_batch(schema::NOTES_V1)
}

/// v2: localisation and grouping. Adds every column the v1/v2 shape needs —
/// which also heals databases that predate v1 proper and carry a bare
/// id-only table — then backfills legacy rows with sane defaults.
fn step_v2_identity_columns(
  tx: &Transaction<'_>,
  report: &mut MigrationReport,
) -> rusqlite::Result<()> {
  const COLUMNS: &[(&str, &str)] = &[
    ("slug", "TEXT"),
    ("title", "TEXT"),
    ("content", "TEXT"),
    ("status", "TEXT"),
    ("created_at", "TEXT"),
    ("updated_at", "TEXT"),
    ("group_id", "TEXT"),
    ("locale", "TEXT"),
    ("tags", "TEXT"),
    ("category", "TEXT"),
    ("author", "TEXT"),
    ("published_at", "TEXT"),
  ];
  for (name, decl) in COLUMNS {
    if add_column_if_missing(tx, "lab_notes", name, decl)? {
      report.columns_added += 1;
    }
  }

  let now = chrono::Utc::now().to_rfc3339();
  tx.execute_batch(
    "UPDATE lab_notes SET slug     = id     WHERE slug     IS NULL OR slug     = '';
     UPDATE lab_notes SET group_id = id     WHERE group_id IS NULL OR group_id = '';
     UPDATE lab_notes SET locale   = 'en'   WHERE locale   IS NULL OR locale   = '';
     UPDATE lab_notes SET status   = 'draft' WHERE status  IS NULL OR status   = '';
     UPDATE lab_notes SET tags     = '[]'   WHERE tags     IS NULL OR tags     = '';
     UPDATE lab_notes SET title    = slug   WHERE title    IS NULL OR title    = '';",
  )?;
  tx.execute(
    "UPDATE lab_notes SET created_at = ?1
      WHERE created_at IS NULL OR created_at = ''",
    rusqlite::params![now],
  )?;
  tx.execute(
    "UPDATE lab_notes SET updated_at = ?1
      WHERE updated_at IS NULL OR updated_at = ''",
    rusqlite::params![now],
  )?;

  tx.execute_batch(schema::NOTES_SLUG_LOCALE_INDEX)
}

/// v3: the append-only revision log, the audit trail, and the pointer
/// columns on the note row.
fn step_v3_revision_log(
  tx: &Transaction<'_>,
  report: &mut MigrationReport,
) -> rusqlite::Result<()> {
  tx.execute_batch(schema::REVISIONS_TABLE)?;
  tx.execute_batch(schema::EVENTS_TABLE)?;

  for name in ["current_revision_id", "published_revision_id"] {
    if add_column_if_missing(tx, "lab_notes", name, "TEXT")? {
      report.columns_added += 1;
    }
  }
  Ok(())
}

/// v4: rename `content` → `legacy_content` via a full shadow-table rebuild
/// (SQLite column renames on a table other tables reference are only safe
/// this way). No-op when the table was already rebuilt.
fn step_v4_rebuild_notes(tx: &Transaction<'_>) -> rusqlite::Result<()> {
  let has_content = has_column(tx, "lab_notes", "content")?;
  let has_legacy = has_column(tx, "lab_notes", "legacy_content")?;

  if has_legacy {
    return Ok(());
  }
  if !has_content {
    // Degenerate database shape; nothing to carry over.
    tx.execute_batch(
      "ALTER TABLE lab_notes ADD COLUMN legacy_content TEXT;",
    )?;
    return Ok(());
  }

  tx.execute_batch(schema::NOTES_REBUILT)?;
  tx.execute_batch(schema::NOTES_REBUILD_COPY)?;
  tx.execute_batch(
    "DROP TABLE lab_notes;
     ALTER TABLE lab_notes_new RENAME TO lab_notes;",
  )?;
  // Indexes drop with the old table.
  tx.execute_batch(schema::NOTES_SLUG_LOCALE_INDEX)
}

/// v5: collaborative-review proposals.
fn step_v5_proposals(tx: &Transaction<'_>) -> rusqlite::Result<()> {
  tx.execute_batch(schema::PROPOSALS_TABLE)
}

// ─── Introspection helpers ───────────────────────────────────────────────────

fn has_column(
  conn: &Connection,
  table: &str,
  column: &str,
) -> rusqlite::Result<bool> {
  let n: i64 = conn.query_row(
    "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
    rusqlite::params![table, column],
    |row| row.get(0),
  )?;
  Ok(n > 0)
}

/// Add `column` with a safe default rather than rewriting the table.
/// Returns `true` when the column was actually added.
fn add_column_if_missing(
  conn: &Connection,
  table: &str,
  column: &str,
  decl: &str,
) -> rusqlite::Result<bool> {
  if has_column(conn, table, column)? {
    return Ok(false);
  }
  conn.execute_batch(&format!(
    "ALTER TABLE {table} ADD COLUMN {column} {decl};"
  ))?;
  Ok(true)
}
