use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::Value;

use crate::workflows::verification::domain::{
    Actor, ActorRole, DocumentReference, ProfessionalProfile, SubjectId, VerificationId,
    VerificationRecord,
};
use crate::workflows::verification::extractor::{OcrEngine, OcrEngineError, OcrSettings};
use crate::workflows::verification::repository::{
    CommitGuard, DecisionCommit, DecisionLedger, DocumentVault, ProfileStore, RecordFilter,
    StoreError, VerificationStore,
};
use crate::workflows::verification::upload::UploadedDocument;
use crate::workflows::verification::{
    verification_router, VerificationService, VerificationSettings,
};

pub(super) const CERTIFICATE_TEXT: &str = "BAR COUNCIL OF DELHI\n\
Certificate of Enrolment\n\
Name: Rajesh Kumar\n\
Bar Council Registration No: BCI/778/2021\n\
Date of Registration: 12/03/2021\n";

pub(super) type TestService = VerificationService<MemoryLedger, ScriptedOcr, MemoryVault>;

pub(super) fn build_service(ocr_text: &str) -> (TestService, Arc<MemoryLedger>, Arc<MemoryVault>) {
    let ledger = Arc::new(MemoryLedger::default());
    let vault = Arc::new(MemoryVault::default());
    let service = VerificationService::new(
        ledger.clone(),
        Arc::new(ScriptedOcr::new(ocr_text)),
        vault.clone(),
        VerificationSettings::default(),
    );
    (service, ledger, vault)
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    verification_router(Arc::new(service))
}

pub(super) fn professional(id: &str) -> Actor {
    Actor::new(id, ActorRole::Professional)
}

pub(super) fn admin() -> Actor {
    Actor::new("admin-1", ActorRole::Administrator)
}

pub(super) fn subject(id: &str) -> SubjectId {
    SubjectId(id.to_string())
}

pub(super) fn png_bytes() -> Vec<u8> {
    let image = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("encode png");
    buffer.into_inner()
}

pub(super) fn png_upload() -> UploadedDocument {
    UploadedDocument::new(png_bytes(), "image/png", "certificate.png")
}

#[derive(Default)]
struct LedgerState {
    // Insertion order doubles as creation order.
    records: Vec<VerificationRecord>,
    profiles: HashMap<SubjectId, ProfessionalProfile>,
}

#[derive(Default, Clone)]
pub(super) struct MemoryLedger {
    state: Arc<Mutex<LedgerState>>,
    inserts_refused: Arc<AtomicBool>,
}

impl MemoryLedger {
    /// Make every later `insert` fail as if the database went away.
    pub(super) fn refuse_inserts(&self) {
        self.inserts_refused.store(true, Ordering::SeqCst);
    }

    pub(super) fn record(&self, id: &VerificationId) -> Option<VerificationRecord> {
        let state = self.state.lock().expect("ledger mutex poisoned");
        state.records.iter().find(|record| &record.id == id).cloned()
    }

    pub(super) fn record_count(&self) -> usize {
        self.state.lock().expect("ledger mutex poisoned").records.len()
    }

    pub(super) fn profile(&self, subject: &SubjectId) -> Option<ProfessionalProfile> {
        let state = self.state.lock().expect("ledger mutex poisoned");
        state.profiles.get(subject).cloned()
    }
}

impl VerificationStore for MemoryLedger {
    fn insert(&self, record: VerificationRecord) -> Result<VerificationId, StoreError> {
        if self.inserts_refused.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("database offline".to_string()));
        }
        let mut state = self.state.lock().expect("ledger mutex poisoned");
        if state.records.iter().any(|existing| existing.id == record.id) {
            return Err(StoreError::Duplicate);
        }
        let id = record.id.clone();
        state.records.push(record);
        Ok(id)
    }

    fn fetch(&self, id: &VerificationId) -> Result<Option<VerificationRecord>, StoreError> {
        Ok(self.record(id))
    }

    fn list(&self, filter: &RecordFilter) -> Result<Vec<VerificationRecord>, StoreError> {
        let state = self.state.lock().expect("ledger mutex poisoned");
        let matching = state
            .records
            .iter()
            .rev()
            .filter(|record| filter.matches(record))
            .cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }
}

impl ProfileStore for MemoryLedger {
    fn get_or_create(
        &self,
        subject: &SubjectId,
        default_specialization: &str,
    ) -> Result<ProfessionalProfile, StoreError> {
        let mut state = self.state.lock().expect("ledger mutex poisoned");
        let profile = state
            .profiles
            .entry(subject.clone())
            .or_insert_with(|| ProfessionalProfile::new(subject.clone(), default_specialization));
        Ok(profile.clone())
    }

    fn fetch_profile(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<ProfessionalProfile>, StoreError> {
        Ok(self.profile(subject))
    }
}

impl DecisionLedger for MemoryLedger {
    fn commit(&self, commit: DecisionCommit) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("ledger mutex poisoned");
        let position = state
            .records
            .iter()
            .position(|record| record.id == commit.record.id);

        match (commit.guard, position) {
            (CommitGuard::Absent, None) => state.records.push(commit.record),
            (CommitGuard::Absent, Some(index)) => {
                return Err(StoreError::Conflict {
                    expected: "absent".to_string(),
                    found: state.records[index].status.to_string(),
                })
            }
            (CommitGuard::Status(_), None) => return Err(StoreError::NotFound),
            (CommitGuard::Status(expected), Some(index)) => {
                let found = state.records[index].status;
                if found != expected {
                    return Err(StoreError::Conflict {
                        expected: expected.to_string(),
                        found: found.to_string(),
                    });
                }
                state.records[index] = commit.record;
            }
        }

        if let Some(update) = commit.profile {
            match state.profiles.get_mut(&update.subject) {
                Some(profile) => update.apply(profile),
                None => {
                    state.profiles.insert(update.subject.clone(), update.create());
                }
            }
        }
        Ok(())
    }
}

pub(super) struct UnavailableLedger;

impl VerificationStore for UnavailableLedger {
    fn insert(&self, _record: VerificationRecord) -> Result<VerificationId, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &VerificationId) -> Result<Option<VerificationRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _filter: &RecordFilter) -> Result<Vec<VerificationRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

impl ProfileStore for UnavailableLedger {
    fn get_or_create(
        &self,
        _subject: &SubjectId,
        _default_specialization: &str,
    ) -> Result<ProfessionalProfile, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch_profile(
        &self,
        _subject: &SubjectId,
    ) -> Result<Option<ProfessionalProfile>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

impl DecisionLedger for UnavailableLedger {
    fn commit(&self, _commit: DecisionCommit) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryVault {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryVault {
    pub(super) fn keys(&self) -> Vec<String> {
        let files = self.files.lock().expect("vault mutex poisoned");
        files.keys().cloned().collect()
    }
}

impl DocumentVault for MemoryVault {
    fn store(
        &self,
        storage_key: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<DocumentReference, StoreError> {
        self.files
            .lock()
            .expect("vault mutex poisoned")
            .insert(storage_key.to_string(), bytes.to_vec());
        Ok(DocumentReference {
            storage_key: storage_key.to_string(),
            original_name: storage_key.to_string(),
            content_type: content_type.to_string(),
            size_bytes: bytes.len() as u64,
        })
    }

    fn discard(&self, storage_key: &str) -> Result<(), StoreError> {
        self.files
            .lock()
            .expect("vault mutex poisoned")
            .remove(storage_key);
        Ok(())
    }
}

/// Returns canned text and remembers how often and with which settings it ran.
pub(super) struct ScriptedOcr {
    text: String,
    calls: AtomicUsize,
    last_settings: Mutex<Option<OcrSettings>>,
}

impl ScriptedOcr {
    pub(super) fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
            last_settings: Mutex::new(None),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn last_settings(&self) -> Option<OcrSettings> {
        self.last_settings
            .lock()
            .expect("settings mutex poisoned")
            .clone()
    }
}

impl OcrEngine for ScriptedOcr {
    fn recognize(&self, _image: &RgbImage, settings: &OcrSettings) -> Result<String, OcrEngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_settings.lock().expect("settings mutex poisoned") = Some(settings.clone());
        Ok(self.text.clone())
    }
}

pub(super) struct FailingOcr;

impl OcrEngine for FailingOcr {
    fn recognize(&self, _image: &RgbImage, _settings: &OcrSettings) -> Result<String, OcrEngineError> {
        Err(OcrEngineError::Engine("engine crashed".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
