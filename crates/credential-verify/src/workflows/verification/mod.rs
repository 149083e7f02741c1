//! Credential verification: strategies, attribute parsing, and the review lifecycle.

pub mod domain;
pub mod extractor;
pub mod lifecycle;
pub(crate) mod normalizer;
pub mod parser;
pub mod patterns;
pub mod repository;
pub mod router;
pub mod service;
pub mod strategies;
pub mod upload;

#[cfg(test)]
mod tests;

pub use domain::{
    Actor, ActorRole, AttributeField, ConfidenceTier, DocumentReference, ExtractedAttributes,
    ExtractionMetadata, ProfessionalProfile, ProfileUpdate, ReviewStamp, ReviewerId, SubjectId,
    VerificationId, VerificationMethod, VerificationRecord, VerificationStatus, SPECIALIZATION_KEY,
};
pub use extractor::{
    ExtractionError, OcrEngine, OcrEngineError, OcrSettings, TesseractCli, TextExtractor,
};
pub use lifecycle::{ApprovalOrigin, LifecycleError, ReviewAction, ReviewDecision, TransitionError};
pub use parser::{
    require_fields, validate_attributes, AttributeError, AttributeParser, ParsedCertificate,
};
pub use repository::{
    CommitGuard, DecisionCommit, DecisionLedger, DocumentVault, ProfileStore, RecordFilter,
    RecordSummary, StoreError, VerificationStore,
};
pub use router::verification_router;
pub use service::{
    ReviewReceipt, StatusReport, SubmissionReceipt, VerificationError, VerificationService,
    VerificationSettings,
};
pub use strategies::{RegistrySeed, VerificationRequest};
pub use upload::{DocumentKind, UploadPolicy, UploadViolation, UploadedDocument};
