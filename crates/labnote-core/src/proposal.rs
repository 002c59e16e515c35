//! Collaborative-review proposals.
//!
//! A proposal pairs the tip at the time it was drafted (`base_revision_id`)
//! with a proposed revision that was recorded through the normal revision
//! substrate but without advancing any pointer. Review either advances the
//! pointers to the proposed revision or leaves the note untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
  Pending,
  Accepted,
  Rejected,
  Withdrawn,
}

/// A reviewer's verdict on a pending proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalDecision {
  Accept,
  Reject,
  Withdraw,
}

impl ProposalDecision {
  pub fn into_status(self) -> ProposalStatus {
    match self {
      Self::Accept => ProposalStatus::Accepted,
      Self::Reject => ProposalStatus::Rejected,
      Self::Withdraw => ProposalStatus::Withdrawn,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
  pub id:                    Uuid,
  pub note_id:               Uuid,
  /// The note's tip when the proposal was drafted; `None` for a note that
  /// had no revision yet.
  pub base_revision_id:      Option<Uuid>,
  pub proposed_revision_id:  Uuid,
  pub status:                ProposalStatus,
  pub reviewer:              Option<String>,
  pub created_at:            DateTime<Utc>,
  pub resolved_at:           Option<DateTime<Utc>>,
}
