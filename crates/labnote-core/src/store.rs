//! The `LedgerStore` trait.
//!
//! Implemented by storage backends (e.g. `labnote-store-sqlite`). Higher
//! layers (`labnote-api`, `labnote-sync`) depend on this abstraction, not on
//! any concrete backend.
//!
//! Revisions and events are append-only. The only mutable shared state is
//! the pointer pair on each note, and implementations must only ever update
//! those pointers inside the transaction that performs the dependent
//! revision insert.

use std::future::Future;

use uuid::Uuid;

use crate::{
  event::{Event, NewEvent},
  note::{EffectiveNote, Note, NoteIdent, NotePreview, NoteUpsert},
  proposal::{Proposal, ProposalDecision, ProposalStatus},
  revision::{ContentWrite, Revision, WriteOutcome},
  sync::{NoteFile, SyncCounters, SyncOptions},
};

/// Abstraction over a Lab Note Ledger backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait LedgerStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Notes ─────────────────────────────────────────────────────────────

  /// Create a note, or update its descriptive metadata if `(slug, locale)`
  /// already exists. `None` fields leave existing values untouched;
  /// `published_at` is never cleared. Creating requires a title.
  fn upsert_note(
    &self,
    input: NoteUpsert,
  ) -> impl Future<Output = Result<Note, Self::Error>> + Send + '_;

  fn get_note<'a>(
    &'a self,
    ident: &'a NoteIdent,
  ) -> impl Future<Output = Result<Option<Note>, Self::Error>> + Send + 'a;

  fn get_note_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Note>, Self::Error>> + Send + '_;

  /// List preview rows, optionally restricted to one locale.
  fn list_notes<'a>(
    &'a self,
    locale: Option<&'a str>,
  ) -> impl Future<Output = Result<Vec<NotePreview>, Self::Error>> + Send + 'a;

  // ── Effective content ─────────────────────────────────────────────────

  /// Resolve what a reader should see for a note: published pointer when
  /// published, else current pointer, else the newest revision, else the
  /// legacy inline field, else "content pending".
  fn effective_content<'a>(
    &'a self,
    ident: &'a NoteIdent,
  ) -> impl Future<Output = Result<Option<EffectiveNote>, Self::Error>> + Send + 'a;

  // ── Content writes — append-only ──────────────────────────────────────

  /// Record an edit as a new revision and advance `current_revision_id`
  /// (and `published_revision_id` when the note is, or becomes, published)
  /// in one transaction. A write whose content hash matches the tip is a
  /// no-op and returns the existing tip.
  fn write_content<'a>(
    &'a self,
    ident: &'a NoteIdent,
    write: ContentWrite,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  fn get_revision(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Revision>, Self::Error>> + Send + '_;

  /// All revisions for a note, oldest first.
  fn list_revisions(
    &self,
    note_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Revision>, Self::Error>> + Send + '_;

  // ── Pointer repair ────────────────────────────────────────────────────

  /// Point any note with revisions but a null or dangling
  /// `current_revision_id` at its highest-numbered revision (and
  /// `published_revision_id` too when the note is published). Safe to call
  /// unconditionally at every startup; returns the number of notes
  /// repaired.
  fn repair_pointers(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Synchronizer batch ────────────────────────────────────────────────

  /// Apply one parsed sync batch inside a single transaction, enforcing the
  /// empty-body, unchanged-hash, and provenance-protection guards.
  fn apply_sync(
    &self,
    batch: Vec<NoteFile>,
    opts: SyncOptions,
  ) -> impl Future<Output = Result<SyncCounters, Self::Error>> + Send + '_;

  // ── Events ────────────────────────────────────────────────────────────

  fn record_event(
    &self,
    event: NewEvent,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  /// Events referencing a note, oldest first.
  fn list_events(
    &self,
    note_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  // ── Proposals ─────────────────────────────────────────────────────────

  /// Record the proposed content as a revision WITHOUT advancing pointers,
  /// and open a pending proposal against the current tip.
  fn create_proposal<'a>(
    &'a self,
    ident: &'a NoteIdent,
    write: ContentWrite,
  ) -> impl Future<Output = Result<Proposal, Self::Error>> + Send + 'a;

  /// Resolve a pending proposal. Accepting advances the note's pointers to
  /// the proposed revision under the normal write rules.
  fn review_proposal(
    &self,
    id: Uuid,
    decision: ProposalDecision,
    reviewer: Option<String>,
  ) -> impl Future<Output = Result<Proposal, Self::Error>> + Send + '_;

  fn list_proposals(
    &self,
    status: Option<ProposalStatus>,
  ) -> impl Future<Output = Result<Vec<Proposal>, Self::Error>> + Send + '_;
}
