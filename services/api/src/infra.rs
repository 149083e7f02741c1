use credential_verify::workflows::verification::{
    CommitGuard, DecisionCommit, DecisionLedger, DocumentReference, DocumentVault, OcrEngine,
    OcrEngineError, OcrSettings, ProfessionalProfile, ProfileStore, ProfileUpdate, RecordFilter,
    StoreError, SubjectId, VerificationId, VerificationRecord, VerificationStore,
};
use image::RgbImage;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct LedgerTables {
    // Kept in insertion order so listing newest-first is a reverse walk.
    records: Vec<VerificationRecord>,
    index: HashMap<VerificationId, usize>,
    profiles: HashMap<SubjectId, ProfessionalProfile>,
}

/// Process-local ledger. Records and profiles share one lock so a decision
/// commit is observed all at once.
#[derive(Default, Clone)]
pub(crate) struct InMemoryLedger {
    tables: Arc<Mutex<LedgerTables>>,
}

impl VerificationStore for InMemoryLedger {
    fn insert(&self, record: VerificationRecord) -> Result<VerificationId, StoreError> {
        let mut tables = self.tables.lock().expect("ledger mutex poisoned");
        if tables.index.contains_key(&record.id) {
            return Err(StoreError::Duplicate);
        }
        let id = record.id.clone();
        let position = tables.records.len();
        tables.records.push(record);
        tables.index.insert(id.clone(), position);
        Ok(id)
    }

    fn fetch(&self, id: &VerificationId) -> Result<Option<VerificationRecord>, StoreError> {
        let tables = self.tables.lock().expect("ledger mutex poisoned");
        Ok(tables
            .index
            .get(id)
            .map(|position| tables.records[*position].clone()))
    }

    fn list(&self, filter: &RecordFilter) -> Result<Vec<VerificationRecord>, StoreError> {
        let tables = self.tables.lock().expect("ledger mutex poisoned");
        Ok(tables
            .records
            .iter()
            .rev()
            .filter(|record| filter.matches(record))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

impl ProfileStore for InMemoryLedger {
    fn get_or_create(
        &self,
        subject: &SubjectId,
        default_specialization: &str,
    ) -> Result<ProfessionalProfile, StoreError> {
        let mut tables = self.tables.lock().expect("ledger mutex poisoned");
        Ok(tables
            .profiles
            .entry(subject.clone())
            .or_insert_with(|| ProfessionalProfile::new(subject.clone(), default_specialization))
            .clone())
    }

    fn fetch_profile(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<ProfessionalProfile>, StoreError> {
        let tables = self.tables.lock().expect("ledger mutex poisoned");
        Ok(tables.profiles.get(subject).cloned())
    }
}

impl DecisionLedger for InMemoryLedger {
    fn commit(&self, commit: DecisionCommit) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().expect("ledger mutex poisoned");
        let existing = tables.index.get(&commit.record.id).copied();

        match (commit.guard, existing) {
            (CommitGuard::Absent, None) => {
                let position = tables.records.len();
                tables.index.insert(commit.record.id.clone(), position);
                tables.records.push(commit.record);
            }
            (CommitGuard::Absent, Some(position)) => {
                return Err(StoreError::Conflict {
                    expected: "absent".to_string(),
                    found: tables.records[position].status.to_string(),
                });
            }
            (CommitGuard::Status(_), None) => return Err(StoreError::NotFound),
            (CommitGuard::Status(expected), Some(position)) => {
                let found = tables.records[position].status;
                if found != expected {
                    return Err(StoreError::Conflict {
                        expected: expected.to_string(),
                        found: found.to_string(),
                    });
                }
                tables.records[position] = commit.record;
            }
        }

        if let Some(update) = commit.profile {
            tables
                .profiles
                .entry(update.subject.clone())
                .and_modify(|profile| update.apply(profile))
                .or_insert_with(|| update.create());
        }
        Ok(())
    }
}

struct StoredDocument {
    content_type: String,
    bytes: Vec<u8>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryVault {
    documents: Arc<Mutex<HashMap<String, StoredDocument>>>,
}

impl InMemoryVault {
    pub(crate) fn len(&self) -> usize {
        self.documents.lock().expect("vault mutex poisoned").len()
    }

    /// Content type and size of a filed document.
    pub(crate) fn describe(&self, storage_key: &str) -> Option<(String, usize)> {
        let documents = self.documents.lock().expect("vault mutex poisoned");
        documents
            .get(storage_key)
            .map(|document| (document.content_type.clone(), document.bytes.len()))
    }
}

impl DocumentVault for InMemoryVault {
    fn store(
        &self,
        storage_key: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<DocumentReference, StoreError> {
        let mut documents = self.documents.lock().expect("vault mutex poisoned");
        if documents.contains_key(storage_key) {
            return Err(StoreError::Duplicate);
        }
        documents.insert(
            storage_key.to_string(),
            StoredDocument {
                content_type: content_type.to_string(),
                bytes: bytes.to_vec(),
            },
        );
        Ok(DocumentReference {
            storage_key: storage_key.to_string(),
            original_name: storage_key.to_string(),
            content_type: content_type.to_string(),
            size_bytes: bytes.len() as u64,
        })
    }

    fn discard(&self, storage_key: &str) -> Result<(), StoreError> {
        self.documents
            .lock()
            .expect("vault mutex poisoned")
            .remove(storage_key);
        Ok(())
    }
}

/// Engine for the demo command: answers every scan with a fixed transcript.
pub(crate) struct FixtureOcrEngine {
    transcript: String,
}

impl FixtureOcrEngine {
    pub(crate) fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
        }
    }
}

impl OcrEngine for FixtureOcrEngine {
    fn recognize(&self, image: &RgbImage, _settings: &OcrSettings) -> Result<String, OcrEngineError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OcrEngineError::Engine("empty scan".to_string()));
        }
        Ok(self.transcript.clone())
    }
}

pub(crate) const SAMPLE_CERTIFICATE: &str = "BAR COUNCIL OF DELHI\n\
Certificate of Enrolment\n\
Name: Rajesh Kumar\n\
Bar Council Registration No: BCI/778/2021\n\
Date of Registration: 12/03/2021\n";
