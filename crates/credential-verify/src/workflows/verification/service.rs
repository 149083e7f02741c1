use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use super::domain::{
    Actor, ActorRole, ConfidenceTier, ExtractedAttributes, ReviewerId, SubjectId, VerificationId,
    VerificationMethod, VerificationRecord, VerificationStatus,
};
use super::extractor::{ExtractionError, OcrEngine, OcrSettings, TextExtractor};
use super::lifecycle::{
    apply_decision, ApprovalOrigin, LifecycleError, ReviewAction, ReviewDecision, TransitionError,
};
use super::parser::{validate_attributes, AttributeError};
use super::repository::{
    CommitGuard, DecisionLedger, DocumentVault, RecordFilter, RecordSummary, StoreError,
};
use super::strategies::{manual, registry, DocumentStrategy, VerificationRequest};
use super::upload::{UploadPolicy, UploadViolation, DEFAULT_MAX_UPLOAD_BYTES};
use crate::config::VerificationConfig;

/// Runtime knobs for [`VerificationService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationSettings {
    pub max_upload_bytes: u64,
    pub ocr: OcrSettings,
    pub status_history_limit: usize,
    pub default_specialization: String,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            ocr: OcrSettings::default(),
            status_history_limit: 5,
            default_specialization: registry::FALLBACK_SPECIALIZATION.to_string(),
        }
    }
}

impl From<&VerificationConfig> for VerificationSettings {
    fn from(config: &VerificationConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
            ocr: OcrSettings {
                language: config.ocr_language.clone(),
                mode: config.ocr_mode.clone(),
            },
            status_history_limit: config.status_history_limit,
            default_specialization: config.default_specialization.clone(),
        }
    }
}

/// Returned for every accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReceipt {
    pub success: bool,
    pub verification_id: VerificationId,
    pub method: VerificationMethod,
    pub status: VerificationStatus,
    pub extracted_attributes: ExtractedAttributes,
    pub confidence: ConfidenceTier,
    pub requires_review: bool,
    pub message: String,
}

impl SubmissionReceipt {
    fn from_record(record: &VerificationRecord) -> Self {
        let message = match record.method {
            VerificationMethod::Document => {
                "Certificate uploaded and processed. Pending admin review."
            }
            VerificationMethod::SimulatedRegistry => {
                "Verification completed via simulated registry lookup."
            }
            VerificationMethod::Manual => "Manual verification submitted. Pending admin review.",
        };

        Self {
            success: true,
            verification_id: record.id.clone(),
            method: record.method,
            status: record.status,
            extracted_attributes: record.attributes.clone(),
            confidence: record.confidence,
            requires_review: record.requires_review(),
            message: message.to_string(),
        }
    }
}

/// Returned for a successful review decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewReceipt {
    pub status: VerificationStatus,
    pub verification_id: VerificationId,
    pub message: String,
}

/// A subject's verified standing plus its most recent records, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub registration_id: Option<String>,
    pub specialization: String,
    pub recent_verifications: Vec<RecordSummary>,
}

/// Service composing the strategies, the lifecycle, and the stores.
pub struct VerificationService<L, E, V> {
    ledger: Arc<L>,
    documents: DocumentStrategy<E, V>,
    settings: VerificationSettings,
}

static VERIFICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_verification_id() -> VerificationId {
    let id = VERIFICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    VerificationId(format!("ver-{id:06}"))
}

impl<L, E, V> VerificationService<L, E, V>
where
    L: DecisionLedger + 'static,
    E: OcrEngine + 'static,
    V: DocumentVault + 'static,
{
    pub fn new(
        ledger: Arc<L>,
        engine: Arc<E>,
        vault: Arc<V>,
        settings: VerificationSettings,
    ) -> Self {
        let extractor = TextExtractor::new(engine, settings.ocr.clone());
        let documents = DocumentStrategy::new(
            UploadPolicy::new(settings.max_upload_bytes),
            extractor,
            vault,
        );

        Self {
            ledger,
            documents,
            settings,
        }
    }

    pub fn settings(&self) -> &VerificationSettings {
        &self.settings
    }

    /// Run the strategy selected by `request` on behalf of `subject`.
    pub fn submit(
        &self,
        subject: &SubjectId,
        request: VerificationRequest,
    ) -> Result<SubmissionReceipt, VerificationError> {
        let method = request.method();
        let outcome = self.run_strategy(subject, request);

        match &outcome {
            Ok(receipt) => info!(
                verification_id = %receipt.verification_id,
                subject = %subject,
                method = method.label(),
                status = %receipt.status,
                confidence = receipt.confidence.label(),
                "verification submitted"
            ),
            Err(err) if err.is_retryable() => error!(
                subject = %subject,
                method = method.label(),
                error = %err,
                "verification submission failed"
            ),
            Err(err) => warn!(
                subject = %subject,
                method = method.label(),
                kind = err.kind(),
                error = %err,
                "verification submission refused"
            ),
        }

        outcome
    }

    fn run_strategy(
        &self,
        subject: &SubjectId,
        request: VerificationRequest,
    ) -> Result<SubmissionReceipt, VerificationError> {
        self.ledger
            .get_or_create(subject, &self.settings.default_specialization)?;

        let id = next_verification_id();
        let now = Utc::now();

        let record = match request {
            VerificationRequest::Document(upload) => {
                let record = self.documents.draft(id, subject, &upload, now)?;
                if let Err(err) = self.ledger.insert(record.clone()) {
                    self.documents.withdraw(&record);
                    return Err(err.into());
                }
                record
            }
            VerificationRequest::Manual(claim) => {
                let record = manual::draft(id, subject, claim, now)?;
                self.ledger.insert(record.clone())?;
                record
            }
            VerificationRequest::SimulatedRegistry(seed) => {
                let draft = registry::draft(id, subject, &seed, now);
                let decision = ReviewDecision {
                    action: ReviewAction::Approve,
                    reviewer: ReviewerId::registry_simulator(),
                    comments: registry::AUTO_APPROVAL_COMMENT.to_string(),
                    decided_at: now,
                };
                apply_decision(
                    self.ledger.as_ref(),
                    &draft,
                    CommitGuard::Absent,
                    &decision,
                    ApprovalOrigin::AutoApproval,
                    &self.settings.default_specialization,
                )?
            }
        };

        Ok(SubmissionReceipt::from_record(&record))
    }

    /// Approve or reject a pending record. `action` must be `approve` or `reject`.
    pub fn review(
        &self,
        actor: &Actor,
        verification_id: &VerificationId,
        action: &str,
        comments: &str,
    ) -> Result<ReviewReceipt, VerificationError> {
        ensure_reviewer(actor)?;
        let action: ReviewAction = action.parse()?;

        let record = self
            .ledger
            .fetch(verification_id)?
            .ok_or_else(|| VerificationError::NotFound(verification_id.clone()))?;

        let decision = ReviewDecision::now(action, actor.reviewer(), comments);
        let decided = apply_decision(
            self.ledger.as_ref(),
            &record,
            CommitGuard::Status(VerificationStatus::Pending),
            &decision,
            ApprovalOrigin::Reviewer,
            &self.settings.default_specialization,
        )
        .inspect_err(|err| {
            warn!(
                verification_id = %verification_id,
                reviewer = %actor.id,
                error = %err,
                "review decision refused"
            )
        })?;

        Ok(ReviewReceipt {
            status: decided.status,
            verification_id: decided.id,
            message: format!("Verification {}", decided.status.label()),
        })
    }

    /// Verified standing of `subject` and up to `limit` of its newest records.
    pub fn status(
        &self,
        subject: &SubjectId,
        limit: Option<usize>,
    ) -> Result<StatusReport, VerificationError> {
        let profile = self
            .ledger
            .get_or_create(subject, &self.settings.default_specialization)?;
        let limit = limit.unwrap_or(self.settings.status_history_limit);
        let records = self
            .ledger
            .list(&RecordFilter::for_subject(subject.clone(), limit))?;

        Ok(StatusReport {
            verified: profile.verified,
            verified_at: profile.verified_at,
            registration_id: profile.registration_id,
            specialization: profile.specialization,
            recent_verifications: records.iter().map(VerificationRecord::summary).collect(),
        })
    }

    /// Review queue, newest first. Reviewer roles only.
    pub fn pending(&self, actor: &Actor) -> Result<Vec<RecordSummary>, VerificationError> {
        ensure_reviewer(actor)?;
        let records = self.ledger.list(&RecordFilter::pending())?;
        Ok(records.iter().map(VerificationRecord::summary).collect())
    }

    pub fn get(&self, verification_id: &VerificationId) -> Result<VerificationRecord, VerificationError> {
        self.ledger
            .fetch(verification_id)?
            .ok_or_else(|| VerificationError::NotFound(verification_id.clone()))
    }

    /// Advisory format check for review tooling; nothing is stored.
    pub fn validate(&self, attributes: &ExtractedAttributes) -> Result<(), VerificationError> {
        validate_attributes(attributes)?;
        Ok(())
    }
}

fn ensure_reviewer(actor: &Actor) -> Result<(), VerificationError> {
    if actor.can_review() {
        Ok(())
    } else {
        Err(VerificationError::Authorization {
            actor: actor.id.clone(),
            role: actor.role,
        })
    }
}

/// Error raised by the verification service.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("invalid upload: {0}")]
    InvalidUpload(#[from] UploadViolation),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Attributes(#[from] AttributeError),
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
    #[error("actor '{actor}' ({role:?}) is not allowed to review verifications")]
    Authorization { actor: String, role: ActorRole },
    #[error("verification {0} not found")]
    NotFound(VerificationId),
    #[error("internal error: {0}")]
    Internal(#[from] StoreError),
}

impl From<LifecycleError> for VerificationError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::Transition(err) => Self::InvalidTransition(err),
            LifecycleError::Store(err) => Self::Internal(err),
        }
    }
}

impl VerificationError {
    /// Stable machine-readable code for failure payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUpload(_) => "invalid_upload",
            Self::Extraction(ExtractionError::UnsupportedFormat(_)) => "unsupported_format",
            Self::Extraction(_) => "extraction_error",
            Self::Attributes(AttributeError::MissingRequiredField { .. }) => {
                "missing_required_field"
            }
            Self::Attributes(AttributeError::InvalidFormat { .. }) => "invalid_format",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::Authorization { .. } => "authorization_error",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Only store faults are worth retrying; everything else needs different input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}
