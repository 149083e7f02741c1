//! The three ways a professional can substantiate a credential.
//!
//! Every strategy turns its input into a draft [`VerificationRecord`] in the
//! `pending` state. Persisting the draft (and, for the simulated registry,
//! approving it) is left to the service so the lifecycle has one entry point.

pub mod document;
pub mod manual;
pub mod registry;

use chrono::{DateTime, Utc};

use super::domain::{
    ConfidenceTier, ExtractedAttributes, SubjectId, VerificationId, VerificationMethod,
    VerificationRecord, VerificationStatus,
};
use super::upload::UploadedDocument;

pub use document::DocumentStrategy;
pub use registry::RegistrySeed;

/// A submission, tagged by the strategy that should handle it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationRequest {
    Document(UploadedDocument),
    SimulatedRegistry(RegistrySeed),
    Manual(ExtractedAttributes),
}

impl VerificationRequest {
    pub fn method(&self) -> VerificationMethod {
        match self {
            Self::Document(_) => VerificationMethod::Document,
            Self::SimulatedRegistry(_) => VerificationMethod::SimulatedRegistry,
            Self::Manual(_) => VerificationMethod::Manual,
        }
    }
}

pub(crate) fn pending_record(
    id: VerificationId,
    subject: &SubjectId,
    method: VerificationMethod,
    attributes: ExtractedAttributes,
    confidence: ConfidenceTier,
    created_at: DateTime<Utc>,
) -> VerificationRecord {
    VerificationRecord {
        id,
        subject: subject.clone(),
        method,
        status: VerificationStatus::Pending,
        attributes,
        raw_text: None,
        document: None,
        confidence,
        metadata: None,
        review: None,
        review_comments: String::new(),
        created_at,
    }
}
