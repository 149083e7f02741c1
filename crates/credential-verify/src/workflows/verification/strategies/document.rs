use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::pending_record;
use crate::workflows::verification::domain::{
    SubjectId, VerificationId, VerificationMethod, VerificationRecord,
};
use crate::workflows::verification::extractor::{OcrEngine, TextExtractor};
use crate::workflows::verification::parser::AttributeParser;
use crate::workflows::verification::repository::DocumentVault;
use crate::workflows::verification::service::VerificationError;
use crate::workflows::verification::upload::{DocumentKind, UploadPolicy, UploadedDocument};

/// Certificate upload: policy check, OCR, parse, and filing of the original.
pub struct DocumentStrategy<E, V> {
    policy: UploadPolicy,
    extractor: TextExtractor<E>,
    parser: AttributeParser,
    vault: Arc<V>,
}

impl<E, V> DocumentStrategy<E, V>
where
    E: OcrEngine,
    V: DocumentVault,
{
    pub fn new(policy: UploadPolicy, extractor: TextExtractor<E>, vault: Arc<V>) -> Self {
        Self {
            policy,
            extractor,
            parser: AttributeParser::default(),
            vault,
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Build the pending record for `upload`. Fails before anything is stored
    /// when the upload is refused or the scan cannot be read.
    pub fn draft(
        &self,
        id: VerificationId,
        subject: &SubjectId,
        upload: &UploadedDocument,
        created_at: DateTime<Utc>,
    ) -> Result<VerificationRecord, VerificationError> {
        let kind = self.policy.check(upload)?;
        let raw_text = self.extractor.extract(&upload.bytes, kind)?;
        let parsed = self.parser.parse(&raw_text);
        debug!(
            verification_id = %id,
            fields_matched = parsed.metadata.fields_matched,
            confidence = parsed.confidence.label(),
            "certificate text parsed"
        );

        let mut document =
            self.vault
                .store(&storage_key(subject, kind), &upload.content_type, &upload.bytes)?;
        document.original_name = upload.file_name.clone();

        let mut record = pending_record(
            id,
            subject,
            VerificationMethod::Document,
            parsed.attributes,
            parsed.confidence,
            created_at,
        );
        record.raw_text = Some(raw_text);
        record.document = Some(document);
        record.metadata = Some(parsed.metadata);
        Ok(record)
    }

    /// Remove the filed original of a draft that was never persisted.
    pub fn withdraw(&self, record: &VerificationRecord) {
        let Some(document) = &record.document else {
            return;
        };
        if let Err(err) = self.vault.discard(&document.storage_key) {
            warn!(
                verification_id = %record.id,
                storage_key = %document.storage_key,
                error = %err,
                "orphaned certificate could not be discarded"
            );
        }
    }
}

/// `cert_{subject}_{8 hex}.{ext}`, with the subject reduced to characters safe in a file name.
pub fn storage_key(subject: &SubjectId, kind: DocumentKind) -> String {
    let subject: String = subject
        .0
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '-'
            }
        })
        .collect();
    let token = Uuid::new_v4().simple().to_string();
    format!("cert_{subject}_{}.{}", &token[..8], kind.extension())
}
