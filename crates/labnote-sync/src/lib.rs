//! Filesystem → ledger synchronizer.
//!
//! Walks a directory tree of Markdown note files — one first-level
//! subdirectory per locale, one file per note — parses each with
//! [`labnote_notefile`], resolves a `(slug, locale)` identity per file, and
//! hands the whole batch to the store's `apply_sync` — which applies it in
//! one transaction under the empty-body, unchanged-hash, and
//! provenance-protection guards.
//!
//! A file that fails to read or parse is skipped, counted, and reported in
//! [`SyncReport::errors`]; it never aborts the run. Files on disk are
//! treated as one input surface among several, not as the source of truth.

use std::{
  fs,
  path::{Path, PathBuf},
};

use labnote_core::{
  store::LedgerStore,
  sync::{NoteFile, SyncCounters, SyncOptions},
};
use labnote_notefile::parse_note_file;
use serde::Serialize;
use tracing::{debug, warn};

pub mod error;

pub use error::{Error, Result};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Settings for one synchronizer run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
  /// Directory walked recursively for `*.md` / `*.markdown` files. Its
  /// first-level subdirectories are locale codes.
  pub root:           PathBuf,
  /// Locale assumed for files sitting directly under the root (a flat tree).
  pub default_locale: String,
  /// Advance pointers even over a primary-surface tip.
  pub force:          bool,
  /// Actor recorded on the audit events this run produces.
  pub actor:          Option<String>,
}

impl SyncConfig {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root:           root.into(),
      default_locale: "en".to_owned(),
      force:          false,
      actor:          None,
    }
  }
}

/// A file the walker skipped, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
  pub path:  PathBuf,
  pub error: String,
}

/// What one run did: walker-side counts plus the store-side counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  pub files_seen:   u64,
  pub files_parsed: u64,
  /// Unreadable or unparsable files; always `errors.len()`.
  pub files_failed: u64,
  /// One entry per skipped file, keyed by path.
  pub errors:       Vec<FileError>,
  pub counters:     SyncCounters,
}

// ─── Run ─────────────────────────────────────────────────────────────────────

/// Walk `config.root`, parse every note file, and apply the batch to
/// `store` atomically.
pub async fn run<S: LedgerStore>(
  store: &S,
  config: &SyncConfig,
) -> Result<SyncReport> {
  let mut report = SyncReport::default();
  let batch = collect_batch(config, &mut report)?;

  let opts = SyncOptions { force: config.force, actor: config.actor.clone() };
  report.counters = store
    .apply_sync(batch, opts)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  debug!(
    files_parsed = report.files_parsed,
    notes_upserted = report.counters.notes_upserted,
    pointers_advanced = report.counters.pointers_advanced,
    pointers_protected = report.counters.pointers_protected,
    "sync run applied"
  );
  Ok(report)
}

/// Parse the tree into a batch, in path order so a later duplicate identity
/// deterministically wins over an earlier one.
fn collect_batch(
  config: &SyncConfig,
  report: &mut SyncReport,
) -> Result<Vec<NoteFile>> {
  let mut paths = Vec::new();
  walk(&config.root, &mut paths)?;
  paths.sort();

  let mut batch: Vec<NoteFile> = Vec::with_capacity(paths.len());
  for path in paths {
    report.files_seen += 1;

    let text = match fs::read_to_string(&path) {
      Ok(text) => text,
      Err(source) => {
        warn!(path = %path.display(), error = %source, "unreadable file, skipped");
        report.files_failed += 1;
        report.errors.push(FileError {
          path:  path.clone(),
          error: source.to_string(),
        });
        continue;
      }
    };
    let parsed = match parse_note_file(&text) {
      Ok(parsed) => parsed,
      Err(e) => {
        warn!(path = %path.display(), error = %e, "unparsable file, skipped");
        report.files_failed += 1;
        report.errors.push(FileError {
          path:  path.clone(),
          error: e.to_string(),
        });
        continue;
      }
    };

    let (file_slug, locale) =
      identity_from_path(&config.root, &path, &config.default_locale);
    // A slug declared in frontmatter wins over the file name.
    let slug = parsed
      .frontmatter
      .slug
      .clone()
      .unwrap_or(file_slug);

    let file = NoteFile {
      slug,
      locale,
      frontmatter: parsed.frontmatter,
      body: parsed.body,
    };
    if let Some(existing) = batch
      .iter_mut()
      .find(|f| f.slug == file.slug && f.locale == file.locale)
    {
      warn!(
        slug = %file.slug,
        locale = %file.locale,
        path = %path.display(),
        "duplicate identity in batch, later file wins"
      );
      *existing = file;
    } else {
      batch.push(file);
    }
    report.files_parsed += 1;
  }

  Ok(batch)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
  let entries = fs::read_dir(dir)
    .map_err(|source| Error::Io { path: dir.to_path_buf(), source })?;
  for entry in entries {
    let entry = entry
      .map_err(|source| Error::Io { path: dir.to_path_buf(), source })?;
    let path = entry.path();
    if path.is_dir() {
      walk(&path, out)?;
    } else if path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| matches!(ext, "md" | "markdown"))
    {
      out.push(path);
    }
  }
  Ok(())
}

/// Derive `(slug, locale)` from the file's location under `root`: the
/// first-level directory name is the locale code (`de/guide.md` →
/// `("guide", "de")`); a file directly under the root takes the default
/// locale. The slug is the file stem, dots and all.
fn identity_from_path(
  root: &Path,
  path: &Path,
  default_locale: &str,
) -> (String, String) {
  let stem = path
    .file_stem()
    .and_then(|s| s.to_str())
    .unwrap_or_default()
    .to_owned();

  let rel = path.strip_prefix(root).unwrap_or(path);
  let mut components = rel.components();
  let first = components.next();
  let locale = match (first, components.next()) {
    (Some(dir), Some(_)) => dir
      .as_os_str()
      .to_str()
      .map(str::to_ascii_lowercase)
      .unwrap_or_else(|| default_locale.to_owned()),
    // A single component is the file itself: a flat tree.
    _ => default_locale.to_owned(),
  };
  (stem, locale)
}
