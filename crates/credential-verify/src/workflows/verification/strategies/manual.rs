use chrono::{DateTime, Utc};

use super::pending_record;
use crate::workflows::verification::domain::{
    ConfidenceTier, ExtractedAttributes, SubjectId, VerificationId, VerificationMethod,
    VerificationRecord,
};
use crate::workflows::verification::parser::{require_fields, AttributeError};

/// Draft a manual claim. Only presence of name and registration id is checked;
/// the attributes are kept exactly as submitted.
pub fn draft(
    id: VerificationId,
    subject: &SubjectId,
    claim: ExtractedAttributes,
    created_at: DateTime<Utc>,
) -> Result<VerificationRecord, AttributeError> {
    require_fields(&claim)?;

    Ok(pending_record(
        id,
        subject,
        VerificationMethod::Manual,
        claim,
        ConfidenceTier::Medium,
        created_at,
    ))
}
