use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde::Serialize;

use super::domain::{AttributeField, ConfidenceTier, ExtractedAttributes, ExtractionMetadata};
use super::normalizer::normalize_text;
use super::patterns::PatternTable;

/// Parser output: the attribute set, its confidence tier, and audit metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedCertificate {
    pub attributes: ExtractedAttributes,
    pub confidence: ConfidenceTier,
    pub metadata: ExtractionMetadata,
}

/// Turns free-form certificate text into structured attributes.
#[derive(Debug, Clone, Copy)]
pub struct AttributeParser {
    table: &'static PatternTable,
}

impl Default for AttributeParser {
    fn default() -> Self {
        Self::new(PatternTable::certificate())
    }
}

impl AttributeParser {
    pub fn new(table: &'static PatternTable) -> Self {
        Self { table }
    }

    /// Parse `text`. Never fails: unmatched fields stay empty and lower the tier.
    pub fn parse(&self, text: &str) -> ParsedCertificate {
        let text = normalize_text(text);
        let mut attributes = ExtractedAttributes::default();

        for (field, matchers) in self.table.fields() {
            if let Some(value) = matchers.iter().find_map(|matcher| matcher.capture(&text)) {
                attributes.set(field, value);
            }
        }

        let fields_matched = attributes.populated_count();
        let total_fields = self.table.field_count();

        ParsedCertificate {
            confidence: ConfidenceTier::from_ratio(fields_matched, total_fields),
            metadata: ExtractionMetadata {
                extracted_at: Utc::now(),
                fields_matched,
                total_fields,
            },
            attributes,
        }
    }
}

/// Reasons an attribute set fails the advisory pre-check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    #[error("missing required fields: {}", join_fields(.fields))]
    MissingRequiredField { fields: Vec<AttributeField> },
    #[error("invalid {field} format: '{value}'")]
    InvalidFormat { field: AttributeField, value: String },
}

fn join_fields(fields: &[AttributeField]) -> String {
    fields
        .iter()
        .map(|field| field.key())
        .collect::<Vec<_>>()
        .join(", ")
}

pub const REQUIRED_FIELDS: [AttributeField; 2] =
    [AttributeField::Name, AttributeField::RegistrationId];

static REGISTRATION_ID_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9/\-]+$").expect("registration id format compiles"));
static NAME_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s.]+$").expect("name format compiles"));

/// Presence check for the fields every claim must carry.
pub fn require_fields(attributes: &ExtractedAttributes) -> Result<(), AttributeError> {
    let missing: Vec<_> = REQUIRED_FIELDS
        .into_iter()
        .filter(|field| !attributes.has(*field))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AttributeError::MissingRequiredField { fields: missing })
    }
}

/// Stricter advisory validation for review tooling: presence plus character-set checks.
pub fn validate_attributes(attributes: &ExtractedAttributes) -> Result<(), AttributeError> {
    require_fields(attributes)?;

    let registration_id = attributes.registration_id.as_deref().unwrap_or_default();
    if !REGISTRATION_ID_FORMAT.is_match(registration_id) {
        return Err(AttributeError::InvalidFormat {
            field: AttributeField::RegistrationId,
            value: registration_id.to_string(),
        });
    }

    let name = attributes.name.as_deref().unwrap_or_default();
    if !NAME_FORMAT.is_match(name) {
        return Err(AttributeError::InvalidFormat {
            field: AttributeField::Name,
            value: name.to_string(),
        });
    }

    Ok(())
}
