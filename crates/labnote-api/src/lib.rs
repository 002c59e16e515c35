//! JSON REST API for the Lab Note Ledger.
//!
//! Exposes an axum [`Router`] backed by any
//! [`labnote_core::store::LedgerStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility; handlers take actor identity and
//! provenance descriptors at face value from the request body.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", labnote_api::api_router(context))
//! ```

pub mod error;
pub mod notes;
pub mod proposals;
pub mod sync;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use labnote_core::store::LedgerStore;
use labnote_sync::SyncConfig;

pub use error::ApiError;

/// Shared handler state: the store plus, optionally, a synchronizer
/// configuration for the `/sync` endpoint.
pub struct ApiContext<S> {
  pub store: Arc<S>,
  pub sync:  Option<SyncConfig>,
}

// Manual impl: `#[derive(Clone)]` would require `S: Clone`.
impl<S> Clone for ApiContext<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), sync: self.sync.clone() }
  }
}

/// Build a fully-materialised API router for `context`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(context: ApiContext<S>) -> Router<()>
where
  S: LedgerStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Notes
    .route("/notes", get(notes::list::<S>))
    .route(
      "/notes/{locale}/{slug}",
      get(notes::get_effective::<S>).put(notes::put_content::<S>),
    )
    .route(
      "/notes/{locale}/{slug}/revisions",
      get(notes::list_revisions::<S>),
    )
    .route("/notes/{locale}/{slug}/events", get(notes::list_events::<S>))
    // Sync
    .route("/sync", post(sync::trigger::<S>))
    // Proposals
    .route(
      "/notes/{locale}/{slug}/proposals",
      post(proposals::create::<S>),
    )
    .route("/proposals", get(proposals::list::<S>))
    .route("/proposals/{id}/review", post(proposals::review::<S>))
    .with_state(context)
}
