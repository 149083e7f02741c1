use serde::Serialize;

use super::domain::{
    ConfidenceTier, DocumentReference, ExtractedAttributes, ProfessionalProfile, ProfileUpdate,
    SubjectId,
    VerificationId, VerificationMethod, VerificationRecord, VerificationStatus,
};

/// Query for [`VerificationStore::list`]. Results are ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub status: Option<VerificationStatus>,
    pub subject: Option<SubjectId>,
    pub limit: Option<usize>,
}

impl RecordFilter {
    pub fn pending() -> Self {
        Self {
            status: Some(VerificationStatus::Pending),
            ..Self::default()
        }
    }

    pub fn for_subject(subject: SubjectId, limit: usize) -> Self {
        Self {
            subject: Some(subject),
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &VerificationRecord) -> bool {
        self.status.map_or(true, |status| record.status == status)
            && self
                .subject
                .as_ref()
                .map_or(true, |subject| &record.subject == subject)
    }
}

/// Persistence for verification records.
pub trait VerificationStore: Send + Sync {
    fn insert(&self, record: VerificationRecord) -> Result<VerificationId, StoreError>;
    fn fetch(&self, id: &VerificationId) -> Result<Option<VerificationRecord>, StoreError>;
    fn list(&self, filter: &RecordFilter) -> Result<Vec<VerificationRecord>, StoreError>;
}

/// Persistence for professional profiles.
pub trait ProfileStore: Send + Sync {
    /// Idempotent: returns the existing profile or creates one with `default_specialization`.
    fn get_or_create(
        &self,
        subject: &SubjectId,
        default_specialization: &str,
    ) -> Result<ProfessionalProfile, StoreError>;
    fn fetch_profile(&self, subject: &SubjectId)
        -> Result<Option<ProfessionalProfile>, StoreError>;
}

/// Precondition the stored record must satisfy for a commit to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitGuard {
    /// The record must not exist yet (auto-approved records are written already decided).
    Absent,
    /// The stored record must still be in this status.
    Status(VerificationStatus),
}

/// Record and profile writes that must land together or not at all.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionCommit {
    pub guard: CommitGuard,
    pub record: VerificationRecord,
    pub profile: Option<ProfileUpdate>,
}

/// Unit of work spanning records and profiles.
///
/// `commit` checks the guard and applies both writes under one critical
/// section or transaction. The profile update is applied to the profile as
/// stored at commit time, creating it when absent. A failed guard surfaces as [`StoreError::Conflict`]
/// and leaves every row untouched.
pub trait DecisionLedger: VerificationStore + ProfileStore {
    fn commit(&self, commit: DecisionCommit) -> Result<(), StoreError>;
}

/// Storage for original certificate files.
pub trait DocumentVault: Send + Sync {
    fn store(
        &self,
        storage_key: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<DocumentReference, StoreError>;
    /// Remove a filed document. Unknown keys are not an error.
    fn discard(&self, storage_key: &str) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Duplicate,
    #[error("record not found")]
    NotFound,
    #[error("stored status changed: expected {expected}, found {found}")]
    Conflict {
        expected: String,
        found: String,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Sanitized representation of a record for status and queue responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSummary {
    pub verification_id: VerificationId,
    pub subject: SubjectId,
    pub method: VerificationMethod,
    pub method_label: &'static str,
    pub status: VerificationStatus,
    pub confidence: ConfidenceTier,
    pub review_comments: String,
    pub extracted_attributes: ExtractedAttributes,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentReference>,
}

impl VerificationRecord {
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            verification_id: self.id.clone(),
            subject: self.subject.clone(),
            method: self.method,
            method_label: self.method.display_name(),
            status: self.status,
            confidence: self.confidence,
            review_comments: self.review_comments.clone(),
            extracted_attributes: self.attributes.clone(),
            created_at: self.created_at,
            document: self.document.clone(),
        }
    }
}
