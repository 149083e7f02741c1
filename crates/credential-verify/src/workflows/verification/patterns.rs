//! Ordered matcher tables for certificate text.
//!
//! Each field owns a list of matchers ordered from most to least specific. The
//! parser walks the list and keeps the first accepted capture, so a loose
//! fallback only runs when every stricter layout failed.

use std::sync::LazyLock;

use regex::Regex;

use super::domain::AttributeField;
use super::normalizer::accept_capture;

const DATE: &str = r"(\d{1,2}[\-/]\d{1,2}[\-/]\d{2,4})";

const NAME_PATTERNS: &[(&str, &str)] = &[
    ("labelled_name", r"\bname[ \t]*:?[ \t]*([a-z][a-z. \t]*?)[ \t]*$"),
    ("advocate_prefix", r"\badvocate[ \t]+([a-z][a-z. \t]*?)[ \t]*$"),
    ("mr_prefix", r"\bmr(?:\.[ \t]*|[ \t]+)([a-z][a-z. \t]*?)[ \t]*$"),
    ("ms_prefix", r"\bms(?:\.[ \t]*|[ \t]+)([a-z][a-z. \t]*?)[ \t]*$"),
    ("shri_prefix", r"\bshri[ \t]+([a-z][a-z. \t]*?)[ \t]*$"),
    ("smt_prefix", r"\bsmt(?:\.[ \t]*|[ \t]+)([a-z][a-z. \t]*?)[ \t]*$"),
];

const REGISTRATION_ID_PATTERNS: &[(&str, &str)] = &[
    (
        "bar_council_number",
        r"\bbar[ \t]+(?:council[ \t]+)?(?:registration[ \t]+)?(?:number|no\.?)[ \t]*:?[ \t]*([a-z0-9/\-]+)",
    ),
    (
        "registration_number",
        r"\bregistration[ \t]+(?:number|no\.?)[ \t]*:?[ \t]*([a-z0-9/\-]+)",
    ),
    (
        "enrolment_number",
        r"\benroll?ment[ \t]+(?:number|no\.?)[ \t]*:?[ \t]*([a-z0-9/\-]+)",
    ),
    ("bare_bar_token", r"\b(bar[/\-][a-z0-9/\-]*[0-9][a-z0-9/\-]*)"),
];

const REGISTRATION_DATE_PATTERNS: &[(&str, &str)] = &[
    (
        "date_of_registration",
        r"\bdate[ \t]+of[ \t]+(?:registration|enroll?ment)[ \t]*:?[ \t]*",
    ),
    ("registered_on", r"\bregistered[ \t]+on[ \t]*:?[ \t]*"),
    (
        "registration_date",
        r"\b(?:registration|enroll?ment)[ \t]+date[ \t]*:?[ \t]*",
    ),
];

const ISSUING_AUTHORITY_PATTERNS: &[(&str, &str)] = &[
    (
        "bar_council_of",
        r"\b(bar[ \t]+council[ \t]+of[ \t]+[a-z]+(?:[ \t]+[a-z]+){0,2})",
    ),
    (
        "named_bar_council",
        r"\b([a-z]+(?:[ \t]+[a-z]+){0,2}[ \t]+bar[ \t]+council)\b",
    ),
    ("state_label", r"\bstate[ \t]*:[ \t]*([a-z][a-z \t]*?)[ \t]*$"),
];

/// A single named pattern producing at most one value for a field.
#[derive(Debug)]
pub struct FieldMatcher {
    label: &'static str,
    regex: Regex,
    uppercase: bool,
}

impl FieldMatcher {
    fn compile(label: &'static str, pattern: &str) -> Self {
        let regex = Regex::new(&format!("(?im){pattern}"))
            .unwrap_or_else(|err| panic!("matcher '{label}' has an invalid pattern: {err}"));
        Self {
            label,
            regex,
            uppercase: false,
        }
    }

    /// Labels still match in any case, but the captured value is uppercased.
    fn uppercased(self) -> Self {
        Self {
            uppercase: true,
            ..self
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// First capture in `text`, cleaned, or `None` when absent or too short to accept.
    pub fn capture(&self, text: &str) -> Option<String> {
        self.regex
            .captures(text)
            .and_then(|captures| captures.get(1))
            .and_then(|value| accept_capture(value.as_str()))
            .map(|value| {
                if self.uppercase {
                    value.to_ascii_uppercase()
                } else {
                    value
                }
            })
    }
}

/// Per-field ordered matcher lists.
#[derive(Debug)]
pub struct PatternTable {
    fields: Vec<(AttributeField, Vec<FieldMatcher>)>,
}

static CERTIFICATE_PATTERNS: LazyLock<PatternTable> = LazyLock::new(PatternTable::build);

impl PatternTable {
    /// The table used for certificate scans.
    pub fn certificate() -> &'static PatternTable {
        &CERTIFICATE_PATTERNS
    }

    fn build() -> Self {
        let date_patterns = REGISTRATION_DATE_PATTERNS
            .iter()
            .map(|(label, prefix)| FieldMatcher::compile(label, &format!("{prefix}{DATE}")))
            .collect();

        Self {
            fields: vec![
                (AttributeField::Name, compile_all(NAME_PATTERNS)),
                (
                    AttributeField::RegistrationId,
                    // Registry ids are uppercase; OCR often lowercases them.
                    compile_all(REGISTRATION_ID_PATTERNS)
                        .into_iter()
                        .map(FieldMatcher::uppercased)
                        .collect(),
                ),
                (AttributeField::RegistrationDate, date_patterns),
                (
                    AttributeField::IssuingAuthority,
                    compile_all(ISSUING_AUTHORITY_PATTERNS),
                ),
            ],
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (AttributeField, &[FieldMatcher])> {
        self.fields
            .iter()
            .map(|(field, matchers)| (*field, matchers.as_slice()))
    }

    pub fn matchers(&self, field: AttributeField) -> &[FieldMatcher] {
        self.fields
            .iter()
            .find(|(candidate, _)| *candidate == field)
            .map(|(_, matchers)| matchers.as_slice())
            .unwrap_or(&[])
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

fn compile_all(patterns: &[(&'static str, &str)]) -> Vec<FieldMatcher> {
    patterns
        .iter()
        .map(|(label, pattern)| FieldMatcher::compile(label, pattern))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_hit(field: AttributeField, text: &str) -> Option<(&'static str, String)> {
        PatternTable::certificate()
            .matchers(field)
            .iter()
            .find_map(|matcher| matcher.capture(text).map(|value| (matcher.label(), value)))
    }

    #[test]
    fn every_field_has_matchers() {
        let table = PatternTable::certificate();
        assert_eq!(table.field_count(), AttributeField::ordered().len());
        for field in AttributeField::ordered() {
            assert!(!table.matchers(field).is_empty(), "{field} has no matchers");
        }
    }

    #[test]
    fn specific_registration_pattern_wins_over_bare_token() {
        let text = "Ref BAR-99 issued\nBar Council Registration No: BCI/778/2021";
        assert_eq!(
            first_hit(AttributeField::RegistrationId, text),
            Some(("bar_council_number", "BCI/778/2021".to_string()))
        );
    }

    #[test]
    fn bare_bar_token_is_kept_whole() {
        assert_eq!(
            first_hit(AttributeField::RegistrationId, "Certificate BAR/12345/2023"),
            Some(("bare_bar_token", "BAR/12345/2023".to_string()))
        );
    }

    #[test]
    fn lowercase_registration_ids_are_uppercased() {
        assert_eq!(
            first_hit(
                AttributeField::RegistrationId,
                "bar council registration no: bci/778/2021"
            ),
            Some(("bar_council_number", "BCI/778/2021".to_string()))
        );
        assert_eq!(
            first_hit(AttributeField::RegistrationId, "ref bar-77a"),
            Some(("bare_bar_token", "BAR-77A".to_string()))
        );
    }

    #[test]
    fn number_keyword_is_not_split() {
        assert_eq!(
            first_hit(AttributeField::RegistrationId, "Enrollment Number: D/1234/2019"),
            Some(("enrolment_number", "D/1234/2019".to_string()))
        );
    }

    #[test]
    fn name_prefixes_stop_at_line_end() {
        assert_eq!(
            first_hit(AttributeField::Name, "Shri Anil Verma\nEnrolment No: 42"),
            Some(("shri_prefix", "Anil Verma".to_string()))
        );
        assert_eq!(
            first_hit(AttributeField::Name, "Advocate  Priya   Nair."),
            Some(("advocate_prefix", "Priya Nair".to_string()))
        );
    }

    #[test]
    fn registration_date_formats() {
        assert_eq!(
            first_hit(AttributeField::RegistrationDate, "Registered on 05/07/2019"),
            Some(("registered_on", "05/07/2019".to_string()))
        );
        assert_eq!(
            first_hit(AttributeField::RegistrationDate, "Enrolment Date: 1-2-21"),
            Some(("registration_date", "1-2-21".to_string()))
        );
    }

    #[test]
    fn issuing_authority_layouts() {
        assert_eq!(
            first_hit(AttributeField::IssuingAuthority, "BAR COUNCIL OF DELHI"),
            Some(("bar_council_of", "BAR COUNCIL OF DELHI".to_string()))
        );
        assert_eq!(
            first_hit(AttributeField::IssuingAuthority, "Issued by\nKerala Bar Council"),
            Some(("named_bar_council", "Kerala Bar Council".to_string()))
        );
        assert_eq!(
            first_hit(AttributeField::IssuingAuthority, "State: Tamil Nadu"),
            Some(("state_label", "Tamil Nadu".to_string()))
        );
    }
}
