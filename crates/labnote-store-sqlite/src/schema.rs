//! DDL for the Lab Note Ledger tables and views.
//!
//! Tables are created by the versioned steps in [`crate::migrate`]; the
//! constants here are the statements those steps execute. Views are derived,
//! disposable state: [`RECREATE_VIEWS`] drops and recreates them on every
//! migrator run so they can never drift from the underlying table shape.

/// Key/value metadata; holds the `schema_version` row.
pub const META_TABLE: &str = "
CREATE TABLE IF NOT EXISTS ledger_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// The original (version 1) note table: content still inline on the row.
pub const NOTES_V1: &str = "
CREATE TABLE IF NOT EXISTS lab_notes (
    id         TEXT PRIMARY KEY,
    slug       TEXT,
    title      TEXT,
    content    TEXT,
    status     TEXT,
    created_at TEXT,
    updated_at TEXT
);
";

pub const NOTES_SLUG_LOCALE_INDEX: &str =
  "CREATE UNIQUE INDEX IF NOT EXISTS lab_notes_slug_locale_idx
     ON lab_notes(slug, locale);";

/// Revisions are strictly append-only.
/// No UPDATE or DELETE is ever issued against this table.
pub const REVISIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS lab_note_revisions (
    id                     TEXT PRIMARY KEY,
    note_id                TEXT NOT NULL REFERENCES lab_notes(id) ON DELETE CASCADE,
    revision_num           INTEGER NOT NULL,
    supersedes_revision_id TEXT,
    frontmatter            TEXT NOT NULL DEFAULT '{}',
    content_body           TEXT NOT NULL,
    content_hash           TEXT NOT NULL,
    source                 TEXT NOT NULL DEFAULT 'api',      -- cli | web | api | import
    intent                 TEXT,
    auth_type              TEXT NOT NULL DEFAULT 'api_token', -- human_session | api_token
    scope                  TEXT,
    side_effects           TEXT,
    reversible             INTEGER NOT NULL DEFAULT 1,
    created_at             TEXT NOT NULL,
    UNIQUE (note_id, revision_num)
);
CREATE INDEX IF NOT EXISTS lab_note_revisions_note_idx
    ON lab_note_revisions(note_id);
";

/// Append-only audit trail.
pub const EVENTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS lab_note_events (
    id          TEXT PRIMARY KEY,
    note_id     TEXT,
    revision_id TEXT,
    proposal_id TEXT,
    actor       TEXT,
    action      TEXT NOT NULL,
    payload     TEXT NOT NULL DEFAULT 'null',
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS lab_note_events_note_idx
    ON lab_note_events(note_id);
";

pub const PROPOSALS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS lab_note_proposals (
    id                   TEXT PRIMARY KEY,
    note_id              TEXT NOT NULL REFERENCES lab_notes(id) ON DELETE CASCADE,
    base_revision_id     TEXT,
    proposed_revision_id TEXT NOT NULL REFERENCES lab_note_revisions(id),
    status               TEXT NOT NULL DEFAULT 'pending', -- pending | accepted | rejected | withdrawn
    reviewer             TEXT,
    created_at           TEXT NOT NULL,
    resolved_at          TEXT
);
CREATE INDEX IF NOT EXISTS lab_note_proposals_note_idx
    ON lab_note_proposals(note_id);
";

/// The final shape of `lab_notes`, used by the shadow-table rebuild step
/// (the inline `content` column becomes `legacy_content`).
pub const NOTES_REBUILT: &str = "
CREATE TABLE lab_notes_new (
    id                    TEXT PRIMARY KEY,
    group_id              TEXT NOT NULL,
    slug                  TEXT NOT NULL,
    locale                TEXT NOT NULL DEFAULT 'en',
    status                TEXT NOT NULL DEFAULT 'draft', -- draft | published | archived
    title                 TEXT NOT NULL DEFAULT '',
    tags                  TEXT NOT NULL DEFAULT '[]',
    category              TEXT,
    author                TEXT,
    current_revision_id   TEXT,
    published_revision_id TEXT,
    published_at          TEXT,
    legacy_content        TEXT,
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL
);
";

pub const NOTES_REBUILD_COPY: &str = "
INSERT INTO lab_notes_new (
    id, group_id, slug, locale, status, title, tags, category, author,
    current_revision_id, published_revision_id, published_at,
    legacy_content, created_at, updated_at
)
SELECT
    id, group_id, slug, locale, status, title, tags, category, author,
    current_revision_id, published_revision_id, published_at,
    content, created_at, updated_at
FROM lab_notes;
";

/// Effective-content resolution as a derived view (§ read path).
///
/// The revision a reader should see: the published pointer when the note is
/// published, else the current pointer, else the highest-numbered revision.
/// Each rung only matches when its target row actually exists, so dangling
/// pointers fall through instead of producing a phantom NULL join. The
/// legacy-content / pending rungs have no revision row and are resolved by
/// the read path in Rust.
pub const RECREATE_VIEWS: &str = "
DROP VIEW IF EXISTS lab_note_previews;
DROP VIEW IF EXISTS lab_note_effective;

CREATE VIEW lab_note_effective AS
SELECT
    n.id           AS note_id,
    r.id           AS revision_id,
    r.revision_num AS revision_num,
    r.frontmatter  AS frontmatter,
    r.content_body AS content_body,
    r.content_hash AS content_hash,
    CASE
      WHEN r.id IS NULL THEN NULL
      WHEN n.status = 'published' AND r.id = n.published_revision_id
        THEN 'published'
      WHEN r.id = n.current_revision_id THEN 'draft'
      ELSE 'fallback'
    END AS content_source
FROM lab_notes n
LEFT JOIN lab_note_revisions r ON r.id = COALESCE(
    CASE WHEN n.status = 'published' THEN
      (SELECT p.id FROM lab_note_revisions p
        WHERE p.id = n.published_revision_id)
    END,
    (SELECT c.id FROM lab_note_revisions c
      WHERE c.id = n.current_revision_id),
    (SELECT x.id FROM lab_note_revisions x
      WHERE x.note_id = n.id
      ORDER BY x.revision_num DESC
      LIMIT 1)
);

CREATE VIEW lab_note_previews AS
SELECT
    n.id           AS id,
    n.group_id     AS group_id,
    n.slug         AS slug,
    n.locale       AS locale,
    n.status       AS status,
    n.title        AS title,
    n.tags         AS tags,
    n.category     AS category,
    n.author       AS author,
    e.revision_num AS revision_num,
    n.published_at AS published_at,
    n.updated_at   AS updated_at
FROM lab_notes n
LEFT JOIN lab_note_effective e ON e.note_id = n.id;
";
