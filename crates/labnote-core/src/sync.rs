//! Batch types exchanged between the synchronizer and a store.
//!
//! The synchronizer parses files and resolves identities outside any
//! transaction, then hands the whole batch to
//! [`crate::store::LedgerStore::apply_sync`], which applies it atomically.

use serde::{Deserialize, Serialize};

use crate::frontmatter::Frontmatter;

/// One parsed note file, ready to reconcile into the ledger.
#[derive(Debug, Clone)]
pub struct NoteFile {
  pub slug:        String,
  pub locale:      String,
  pub frontmatter: Frontmatter,
  pub body:        String,
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
  /// Advance pointers even over a primary-surface tip.
  pub force: bool,
  pub actor: Option<String>,
}

/// Store-side counters for one sync batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounters {
  pub notes_upserted:     u64,
  pub revisions_inserted: u64,
  pub pointers_advanced:  u64,
  /// Revisions recorded (or skipped) whose pointer advance was held back by
  /// provenance protection.
  pub pointers_protected: u64,
  /// Files whose body was empty after parsing; never an error.
  pub empty_skipped:      u64,
  /// Files whose content hash matched the tip.
  pub unchanged_skipped:  u64,
}
