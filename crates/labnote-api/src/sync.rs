//! Handler for `POST /sync` — a one-shot synchronizer run over the
//! configured note tree.

use axum::{Json, extract::State};
use labnote_core::store::LedgerStore;
use labnote_sync::{SyncConfig, SyncReport};
use serde::Deserialize;

use crate::{ApiContext, error::ApiError};

#[derive(Debug, Deserialize, Default)]
pub struct TriggerBody {
  /// Advance pointers even over primary-surface tips.
  #[serde(default)]
  pub force: bool,
  pub actor: Option<String>,
}

/// `POST /sync` — body `{"force": true}`; 400 when the server has no sync
/// root configured.
pub async fn trigger<S>(
  State(ctx): State<ApiContext<S>>,
  Json(body): Json<TriggerBody>,
) -> Result<Json<SyncReport>, ApiError>
where
  S: LedgerStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let Some(base) = &ctx.sync else {
    return Err(ApiError::BadRequest(
      "no sync root configured on this server".to_owned(),
    ));
  };

  let config = SyncConfig {
    force: body.force,
    actor: body.actor.or_else(|| base.actor.clone()),
    ..base.clone()
  };
  let report = labnote_sync::run(ctx.store.as_ref(), &config)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(report))
}
