//! Audit-trail events.
//!
//! One row is appended for every mutating operation; rows are never updated
//! or deleted. Retention is an out-of-scope policy concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
  pub id:          Uuid,
  pub note_id:     Option<Uuid>,
  pub revision_id: Option<Uuid>,
  pub proposal_id: Option<Uuid>,
  /// Actor identity, supplied by the (external) auth layer.
  pub actor:       Option<String>,
  /// Dotted action name, e.g. `revision.written`.
  pub action:      String,
  pub payload:     serde_json::Value,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::LedgerStore::record_event`].
#[derive(Debug, Clone)]
pub struct NewEvent {
  pub note_id:     Option<Uuid>,
  pub revision_id: Option<Uuid>,
  pub proposal_id: Option<Uuid>,
  pub actor:       Option<String>,
  pub action:      String,
  pub payload:     serde_json::Value,
}

impl NewEvent {
  pub fn new(action: impl Into<String>) -> Self {
    Self {
      note_id:     None,
      revision_id: None,
      proposal_id: None,
      actor:       None,
      action:      action.into(),
      payload:     serde_json::Value::Null,
    }
  }
}
