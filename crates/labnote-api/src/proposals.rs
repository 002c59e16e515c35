//! Handlers for proposal endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/notes/:locale/:slug/proposals` | Body: [`WriteBody`](crate::notes::WriteBody); 201 |
//! | `GET`  | `/proposals` | Optional `?status=pending\|accepted\|rejected\|withdrawn` |
//! | `POST` | `/proposals/:id/review` | Body: `{"decision":"accept","reviewer":"..."}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use labnote_core::{
  note::NoteIdent,
  proposal::{Proposal, ProposalDecision, ProposalStatus},
  revision::ContentWrite,
  store::LedgerStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiContext, error::ApiError, notes::WriteBody};

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /notes/:locale/:slug/proposals` — record the proposed content and
/// open a pending review. Pointers do not move.
pub async fn create<S>(
  State(ctx): State<ApiContext<S>>,
  Path((locale, slug)): Path<(String, String)>,
  Json(body): Json<WriteBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let ident = NoteIdent::new(slug, locale);
  let proposal = ctx
    .store
    .create_proposal(&ident, ContentWrite::from(body))
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(proposal)))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<ProposalStatus>,
}

/// `GET /proposals[?status=<status>]`
pub async fn list<S>(
  State(ctx): State<ApiContext<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Proposal>>, ApiError>
where
  S: LedgerStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let proposals = ctx
    .store
    .list_proposals(params.status)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(proposals))
}

// ─── Review ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub decision: ProposalDecision,
  pub reviewer: Option<String>,
}

/// `POST /proposals/:id/review` — resolve a pending proposal. Accepting
/// advances the note's pointers to the proposed revision.
pub async fn review<S>(
  State(ctx): State<ApiContext<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ReviewBody>,
) -> Result<Json<Proposal>, ApiError>
where
  S: LedgerStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let proposal = ctx
    .store
    .review_proposal(id, body.decision, body.reviewer)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(proposal))
}
