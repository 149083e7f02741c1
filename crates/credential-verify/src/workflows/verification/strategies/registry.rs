//! Stand-in for a national registry lookup. Nothing leaves the process: the
//! record is synthesized from the caller's seed and approved on the spot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pending_record;
use crate::workflows::verification::domain::{
    ConfidenceTier, ExtractedAttributes, SubjectId, VerificationId, VerificationMethod,
    VerificationRecord, SPECIALIZATION_KEY,
};

pub const FALLBACK_NAME: &str = "Demo Professional";
pub const FALLBACK_REGISTRATION_SEED: &str = "12345";
pub const FALLBACK_SPECIALIZATION: &str = "General Practice";
pub const FALLBACK_JURISDICTION: &str = "Delhi";

const REGISTRATION_DATE: &str = "2020-01-15";
const REGISTRATION_YEAR: u16 = 2023;

pub const AUTO_APPROVAL_COMMENT: &str = "Auto-approved via simulated registry lookup";

/// Caller-supplied hints for the simulated lookup. Missing or blank values fall back to demo defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySeed {
    pub name: Option<String>,
    pub registration_id: Option<String>,
    pub specialization: Option<String>,
    pub jurisdiction: Option<String>,
}

fn or_fallback<'a>(value: &'a Option<String>, fallback: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(fallback)
}

impl RegistrySeed {
    /// Attribute set the registry would have answered with.
    pub fn synthesize(&self) -> ExtractedAttributes {
        let name = or_fallback(&self.name, FALLBACK_NAME);
        let seed = or_fallback(&self.registration_id, FALLBACK_REGISTRATION_SEED);
        let specialization = or_fallback(&self.specialization, FALLBACK_SPECIALIZATION);
        let jurisdiction = or_fallback(&self.jurisdiction, FALLBACK_JURISDICTION);

        let mut attributes = ExtractedAttributes {
            name: Some(name.to_string()),
            registration_id: Some(format!("BAR/{seed}/{REGISTRATION_YEAR}")),
            registration_date: Some(REGISTRATION_DATE.to_string()),
            issuing_authority: Some(format!("{jurisdiction} Bar Council")),
            ..ExtractedAttributes::default()
        };
        attributes
            .supplementary
            .insert(SPECIALIZATION_KEY.to_string(), specialization.to_string());
        attributes
            .supplementary
            .insert("registry_status".to_string(), "Active".to_string());
        attributes
            .supplementary
            .insert("demo_mode".to_string(), "true".to_string());
        attributes
    }
}

/// Pending draft for the lookup; the service approves it before anything is stored.
pub fn draft(
    id: VerificationId,
    subject: &SubjectId,
    seed: &RegistrySeed,
    created_at: DateTime<Utc>,
) -> VerificationRecord {
    pending_record(
        id,
        subject,
        VerificationMethod::SimulatedRegistry,
        seed.synthesize(),
        ConfidenceTier::High,
        created_at,
    )
}
