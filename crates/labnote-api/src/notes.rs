//! Handlers for `/notes` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/notes` | Optional `?locale=` filter; preview rows |
//! | `GET`  | `/notes/:locale/:slug` | Effective content; 404 when unknown |
//! | `PUT`  | `/notes/:locale/:slug` | Body: [`WriteBody`]; append a revision |
//! | `GET`  | `/notes/:locale/:slug/revisions` | Full revision log, oldest first |
//! | `GET`  | `/notes/:locale/:slug/events` | Audit trail, oldest first |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use labnote_core::{
  event::Event,
  frontmatter::Frontmatter,
  note::{EffectiveNote, Note, NoteIdent, NotePreview, NoteStatus},
  revision::{AuthType, ContentWrite, Provenance, Revision, Source},
  store::LedgerStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiContext, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub locale: Option<String>,
}

/// `GET /notes[?locale=<locale>]`
pub async fn list<S>(
  State(ctx): State<ApiContext<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<NotePreview>>, ApiError>
where
  S: LedgerStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let previews = ctx
    .store
    .list_notes(params.locale.as_deref())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(previews))
}

// ─── Effective content ────────────────────────────────────────────────────────

/// `GET /notes/:locale/:slug` — the resolved read model.
pub async fn get_effective<S>(
  State(ctx): State<ApiContext<S>>,
  Path((locale, slug)): Path<(String, String)>,
) -> Result<Json<EffectiveNote>, ApiError>
where
  S: LedgerStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let ident = NoteIdent::new(slug, locale);
  let effective = ctx
    .store
    .effective_content(&ident)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "note {:?} ({}) not found",
        ident.slug, ident.locale
      ))
    })?;
  Ok(Json(effective))
}

// ─── Write ────────────────────────────────────────────────────────────────────

/// JSON body accepted by `PUT /notes/:locale/:slug` and
/// `POST .../proposals`.
#[derive(Debug, Deserialize)]
pub struct WriteBody {
  /// Required when the note does not exist yet.
  pub title:        Option<String>,
  #[serde(default)]
  pub frontmatter:  Frontmatter,
  pub body:         String,
  pub status:       Option<NoteStatus>,
  /// Actor identity as established by the caller's auth layer.
  pub actor:        Option<String>,
  pub source:       Option<Source>,
  pub intent:       Option<String>,
  pub auth_type:    Option<AuthType>,
  pub scope:        Option<String>,
  pub side_effects: Option<String>,
  pub reversible:   Option<bool>,
}

impl From<WriteBody> for ContentWrite {
  fn from(b: WriteBody) -> Self {
    let defaults = Provenance::default();
    ContentWrite {
      title:       b.title,
      frontmatter: b.frontmatter,
      body:        b.body,
      status:      b.status,
      provenance:  Provenance {
        source:       b.source.unwrap_or(defaults.source),
        intent:       b.intent,
        auth_type:    b.auth_type.unwrap_or(defaults.auth_type),
        scope:        b.scope,
        side_effects: b.side_effects,
        reversible:   b.reversible.unwrap_or(defaults.reversible),
      },
      actor:       b.actor,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct WriteResponse {
  pub note_id:      Uuid,
  pub revision_id:  Uuid,
  pub revision_num: i64,
  pub noop:         bool,
}

/// `PUT /notes/:locale/:slug` — append a revision (or no-op on identical
/// content).
pub async fn put_content<S>(
  State(ctx): State<ApiContext<S>>,
  Path((locale, slug)): Path<(String, String)>,
  Json(body): Json<WriteBody>,
) -> Result<Json<WriteResponse>, ApiError>
where
  S: LedgerStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let ident = NoteIdent::new(slug, locale);
  let outcome = ctx
    .store
    .write_content(&ident, ContentWrite::from(body))
    .await
    .map_err(ApiError::from_store)?;

  Ok(Json(WriteResponse {
    note_id:      outcome.note.id,
    revision_id:  outcome.revision.id,
    revision_num: outcome.revision.revision_num,
    noop:         outcome.noop,
  }))
}

// ─── Revision log / audit trail ───────────────────────────────────────────────

/// `GET /notes/:locale/:slug/revisions`
pub async fn list_revisions<S>(
  State(ctx): State<ApiContext<S>>,
  Path((locale, slug)): Path<(String, String)>,
) -> Result<Json<Vec<Revision>>, ApiError>
where
  S: LedgerStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let note = require_note(&ctx, slug, locale).await?;
  let revisions = ctx
    .store
    .list_revisions(note.id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(revisions))
}

/// `GET /notes/:locale/:slug/events`
pub async fn list_events<S>(
  State(ctx): State<ApiContext<S>>,
  Path((locale, slug)): Path<(String, String)>,
) -> Result<Json<Vec<Event>>, ApiError>
where
  S: LedgerStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let note = require_note(&ctx, slug, locale).await?;
  let events = ctx
    .store
    .list_events(note.id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(events))
}

pub(crate) async fn require_note<S>(
  ctx: &ApiContext<S>,
  slug: String,
  locale: String,
) -> Result<Note, ApiError>
where
  S: LedgerStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let ident = NoteIdent::new(slug, locale);
  ctx
    .store
    .get_note(&ident)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "note {:?} ({}) not found",
        ident.slug, ident.locale
      ))
    })
}
