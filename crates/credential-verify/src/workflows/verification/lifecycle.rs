//! Verification record state machine.
//!
//! ```text
//! pending ──approve()──▶ approved   (terminal, propagates to the profile)
//!    │
//!    └──────reject()───▶ rejected   (terminal)
//! ```
//!
//! Transitions are computed in memory by [`decide`] and persisted through a
//! single [`DecisionLedger::commit`] carrying both the record and, for
//! approvals, a [`ProfileUpdate`] the ledger applies to the stored profile.
//! The commit is guarded on the stored status, so two reviewers racing on one
//! record produce exactly one decision.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{
    ProfileUpdate, ReviewStamp, ReviewerId, VerificationId, VerificationRecord,
    VerificationStatus,
};
use super::repository::{CommitGuard, DecisionCommit, DecisionLedger, StoreError};

/// Reviewer verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    pub const fn target(self) -> VerificationStatus {
        match self {
            Self::Approve => VerificationStatus::Approved,
            Self::Reject => VerificationStatus::Rejected,
        }
    }
}

impl FromStr for ReviewAction {
    type Err = TransitionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            _ => Err(TransitionError::UnknownAction(value.to_string())),
        }
    }
}

/// A verdict together with who issued it and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDecision {
    pub action: ReviewAction,
    pub reviewer: ReviewerId,
    pub comments: String,
    pub decided_at: DateTime<Utc>,
}

impl ReviewDecision {
    pub fn now(action: ReviewAction, reviewer: ReviewerId, comments: impl Into<String>) -> Self {
        Self {
            action,
            reviewer,
            comments: comments.into(),
            decided_at: Utc::now(),
        }
    }
}

/// Who is driving an approval. Auto-approval tolerates re-entry on an approved record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOrigin {
    Reviewer,
    AutoApproval,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("invalid action '{0}'; must be 'approve' or 'reject'")]
    UnknownAction(String),
    #[error("verification {id} is already {status}")]
    AlreadyDecided {
        id: VerificationId,
        status: VerificationStatus,
    },
    #[error("verification {id} was decided by a concurrent review")]
    Superseded { id: VerificationId },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of evaluating a decision against a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Applied(VerificationRecord),
    Unchanged,
}

/// Compute the decided record without touching storage.
pub fn decide(
    record: &VerificationRecord,
    decision: &ReviewDecision,
    origin: ApprovalOrigin,
) -> Result<Transition, TransitionError> {
    match (record.status, decision.action, origin) {
        (VerificationStatus::Pending, action, _) => {
            let mut next = record.clone();
            next.status = action.target();
            next.review = Some(ReviewStamp {
                reviewer: decision.reviewer.clone(),
                reviewed_at: decision.decided_at,
            });
            next.review_comments = decision.comments.clone();
            Ok(Transition::Applied(next))
        }
        (VerificationStatus::Approved, ReviewAction::Approve, ApprovalOrigin::AutoApproval) => {
            Ok(Transition::Unchanged)
        }
        (status, _, _) => Err(TransitionError::AlreadyDecided {
            id: record.id.clone(),
            status,
        }),
    }
}

/// Profile changes for an approval of `record`: verified now, plus any registration id and specialization it carries.
pub fn propagate(
    record: &VerificationRecord,
    approved_at: DateTime<Utc>,
    default_specialization: &str,
) -> ProfileUpdate {
    ProfileUpdate {
        subject: record.subject.clone(),
        verified_at: approved_at,
        registration_id: record
            .attributes
            .registration_id
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string),
        specialization: record.attributes.specialization().map(str::to_string),
        default_specialization: default_specialization.to_string(),
    }
}

/// Apply `decision` to `record` and persist the result as one unit of work.
pub fn apply_decision<L>(
    ledger: &L,
    record: &VerificationRecord,
    guard: CommitGuard,
    decision: &ReviewDecision,
    origin: ApprovalOrigin,
    default_specialization: &str,
) -> Result<VerificationRecord, LifecycleError>
where
    L: DecisionLedger + ?Sized,
{
    let next = match decide(record, decision, origin)? {
        Transition::Applied(next) => next,
        Transition::Unchanged => return Ok(record.clone()),
    };

    let profile = (next.status == VerificationStatus::Approved)
        .then(|| propagate(&next, decision.decided_at, default_specialization));

    let commit = DecisionCommit {
        guard,
        record: next.clone(),
        profile,
    };

    match ledger.commit(commit) {
        Ok(()) => {
            info!(
                verification_id = %next.id,
                subject = %next.subject,
                status = %next.status,
                reviewer = %decision.reviewer.0,
                "verification decided"
            );
            Ok(next)
        }
        Err(StoreError::Conflict { expected, found }) => {
            warn!(
                verification_id = %next.id,
                %expected,
                %found,
                "verification decision lost a concurrent race"
            );
            Err(TransitionError::Superseded {
                id: next.id.clone(),
            }
            .into())
        }
        Err(other) => Err(other.into()),
    }
}
