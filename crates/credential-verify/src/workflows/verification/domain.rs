use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for verification records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VerificationId(pub String);

impl fmt::Display for VerificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The professional a verification record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(pub String);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role of the caller as asserted by the upstream authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Professional,
    Staff,
    Administrator,
}

impl ActorRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "professional" | "lawyer" | "user" => Some(Self::Professional),
            "staff" => Some(Self::Staff),
            "admin" | "administrator" => Some(Self::Administrator),
            _ => None,
        }
    }
}

/// Authenticated caller. Submissions use the actor as the subject; reviews require a reviewer role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn can_review(&self) -> bool {
        matches!(self.role, ActorRole::Staff | ActorRole::Administrator)
    }

    pub fn subject(&self) -> SubjectId {
        SubjectId(self.id.clone())
    }

    pub fn reviewer(&self) -> ReviewerId {
        ReviewerId(self.id.clone())
    }
}

/// Reviewer recorded on a decided verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewerId(pub String);

impl ReviewerId {
    /// Reviewer attributed to auto-approved registry lookups.
    pub fn registry_simulator() -> Self {
        Self("registry-simulator".to_string())
    }
}

/// The fixed set of semantic fields an attribute set can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeField {
    Name,
    RegistrationId,
    RegistrationDate,
    IssuingAuthority,
}

impl AttributeField {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Name,
            Self::RegistrationId,
            Self::RegistrationDate,
            Self::IssuingAuthority,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::RegistrationId => "registration_id",
            Self::RegistrationDate => "registration_date",
            Self::IssuingAuthority => "issuing_authority",
        }
    }
}

impl fmt::Display for AttributeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Structured attributes parsed from a credential or supplied directly.
///
/// Absent fields mean "not found". `supplementary` holds non-semantic details
/// (specialization, jurisdiction, registry flags) that never count toward confidence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuing_authority: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub supplementary: BTreeMap<String, String>,
}

pub const SPECIALIZATION_KEY: &str = "specialization";

impl ExtractedAttributes {
    pub fn get(&self, field: AttributeField) -> Option<&str> {
        let value = match field {
            AttributeField::Name => &self.name,
            AttributeField::RegistrationId => &self.registration_id,
            AttributeField::RegistrationDate => &self.registration_date,
            AttributeField::IssuingAuthority => &self.issuing_authority,
        };
        value.as_deref()
    }

    pub fn set(&mut self, field: AttributeField, value: String) {
        let slot = match field {
            AttributeField::Name => &mut self.name,
            AttributeField::RegistrationId => &mut self.registration_id,
            AttributeField::RegistrationDate => &mut self.registration_date,
            AttributeField::IssuingAuthority => &mut self.issuing_authority,
        };
        *slot = Some(value);
    }

    /// True when the field holds a non-blank value.
    pub fn has(&self, field: AttributeField) -> bool {
        self.get(field)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn populated_count(&self) -> usize {
        AttributeField::ordered()
            .into_iter()
            .filter(|field| self.has(*field))
            .count()
    }

    pub fn specialization(&self) -> Option<&str> {
        self.supplementary
            .get(SPECIALIZATION_KEY)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

/// Coarse quality signal for an attribute set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    /// Tier for `matched` of `total` fields: >= 0.75 high, >= 0.5 medium, otherwise low.
    pub fn from_ratio(matched: usize, total: usize) -> Self {
        if total == 0 {
            return Self::Low;
        }
        // 4 * matched >= 3 * total  <=>  matched / total >= 0.75, without float rounding.
        if matched * 4 >= total * 3 {
            Self::High
        } else if matched * 2 >= total {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// How the evidence for a record was gathered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    Document,
    SimulatedRegistry,
    Manual,
}

impl VerificationMethod {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::SimulatedRegistry => "simulated_registry",
            Self::Manual => "manual",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Document => "Certificate OCR",
            Self::SimulatedRegistry => "Registry lookup (demo)",
            Self::Manual => "Manual verification",
        }
    }
}

/// Lifecycle state of a verification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Audit details captured while parsing OCR output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    pub extracted_at: DateTime<Utc>,
    pub fields_matched: usize,
    pub total_fields: usize,
}

/// Pointer to the stored original of an uploaded certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReference {
    pub storage_key: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// Who decided a record and when. Present exactly when the record is no longer pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStamp {
    pub reviewer: ReviewerId,
    pub reviewed_at: DateTime<Utc>,
}

/// One attempt to substantiate a professional's credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub id: VerificationId,
    pub subject: SubjectId,
    pub method: VerificationMethod,
    pub status: VerificationStatus,
    pub attributes: ExtractedAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentReference>,
    pub confidence: ConfidenceTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExtractionMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewStamp>,
    #[serde(default)]
    pub review_comments: String,
    pub created_at: DateTime<Utc>,
}

impl VerificationRecord {
    pub fn requires_review(&self) -> bool {
        self.status == VerificationStatus::Pending
    }
}

/// The subject whose verified status is driven by approvals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessionalProfile {
    pub subject: SubjectId,
    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub registration_id: Option<String>,
    pub specialization: String,
}

impl ProfessionalProfile {
    pub fn new(subject: SubjectId, specialization: impl Into<String>) -> Self {
        Self {
            subject,
            verified: false,
            verified_at: None,
            registration_id: None,
            specialization: specialization.into(),
        }
    }
}

/// Profile changes carried by an approval. Ledgers apply it to the stored
/// profile inside the commit, so fields the approval does not carry keep
/// whatever a concurrent approval wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub subject: SubjectId,
    pub verified_at: DateTime<Utc>,
    pub registration_id: Option<String>,
    pub specialization: Option<String>,
    /// Used when the subject has no profile yet.
    pub default_specialization: String,
}

impl ProfileUpdate {
    pub fn apply(&self, profile: &mut ProfessionalProfile) {
        profile.verified = true;
        profile.verified_at = Some(self.verified_at);
        if let Some(registration_id) = &self.registration_id {
            profile.registration_id = Some(registration_id.clone());
        }
        if let Some(specialization) = &self.specialization {
            profile.specialization = specialization.clone();
        }
    }

    /// Stored profile for a subject seen for the first time.
    pub fn create(&self) -> ProfessionalProfile {
        let mut profile =
            ProfessionalProfile::new(self.subject.clone(), self.default_specialization.as_str());
        self.apply(&mut profile);
        profile
    }
}
