use super::common::CERTIFICATE_TEXT;
use crate::workflows::verification::domain::{AttributeField, ConfidenceTier, ExtractedAttributes};
use crate::workflows::verification::parser::{
    require_fields, validate_attributes, AttributeError, AttributeParser,
};

#[test]
fn full_certificate_yields_every_field_with_high_confidence() {
    let parsed = AttributeParser::default().parse(CERTIFICATE_TEXT);

    assert_eq!(parsed.attributes.name.as_deref(), Some("Rajesh Kumar"));
    assert_eq!(
        parsed.attributes.registration_id.as_deref(),
        Some("BCI/778/2021")
    );
    assert_eq!(
        parsed.attributes.registration_date.as_deref(),
        Some("12/03/2021")
    );
    assert_eq!(
        parsed.attributes.issuing_authority.as_deref(),
        Some("BAR COUNCIL OF DELHI")
    );
    assert_eq!(parsed.confidence, ConfidenceTier::High);
    assert_eq!(parsed.metadata.fields_matched, 4);
    assert_eq!(parsed.metadata.total_fields, 4);
}

#[test]
fn confidence_tracks_matched_field_ratio() {
    let parser = AttributeParser::default();
    let cases = [
        (
            "Name: Rajesh Kumar\nBar Council Registration No: BCI/778/2021\nDate of Registration: 12/03/2021",
            3,
            ConfidenceTier::High,
        ),
        (
            "Name: Rajesh Kumar\nEnrolment No: 42",
            2,
            ConfidenceTier::Medium,
        ),
        ("Registered on 05/07/2019", 1, ConfidenceTier::Low),
        ("@@@ ### ~~~\n%%", 0, ConfidenceTier::Low),
        ("", 0, ConfidenceTier::Low),
    ];

    for (text, matched, tier) in cases {
        let parsed = parser.parse(text);
        assert_eq!(parsed.metadata.fields_matched, matched, "matched for {text:?}");
        assert_eq!(parsed.confidence, tier, "tier for {text:?}");
    }
}

#[test]
fn parsing_is_repeatable() {
    let parser = AttributeParser::default();
    let first = parser.parse(CERTIFICATE_TEXT);
    let second = parser.parse(CERTIFICATE_TEXT);

    assert_eq!(first.attributes, second.attributes);
    assert_eq!(first.confidence, second.confidence);
}

#[test]
fn crlf_scans_parse_like_unix_text() {
    let parser = AttributeParser::default();
    let windows = CERTIFICATE_TEXT.replace('\n', "\r\n");

    assert_eq!(
        parser.parse(&windows).attributes,
        parser.parse(CERTIFICATE_TEXT).attributes
    );
}

#[test]
fn single_character_captures_are_discarded() {
    let parsed = AttributeParser::default().parse("Name: A\nRegistration No: 7");

    assert_eq!(parsed.attributes.name, None);
    assert_eq!(parsed.attributes.registration_id, None);
    assert_eq!(parsed.confidence, ConfidenceTier::Low);
}

fn claim(name: Option<&str>, registration_id: Option<&str>) -> ExtractedAttributes {
    ExtractedAttributes {
        name: name.map(str::to_string),
        registration_id: registration_id.map(str::to_string),
        ..ExtractedAttributes::default()
    }
}

#[test]
fn validation_accepts_well_formed_claims() {
    assert_eq!(
        validate_attributes(&claim(Some("Rajesh Kumar"), Some("BCI/778/2021"))),
        Ok(())
    );
    assert_eq!(
        validate_attributes(&claim(Some("A. Sharma"), Some("D-1234-19"))),
        Ok(())
    );
}

#[test]
fn validation_reports_all_missing_fields() {
    assert_eq!(
        validate_attributes(&claim(None, None)),
        Err(AttributeError::MissingRequiredField {
            fields: vec![AttributeField::Name, AttributeField::RegistrationId],
        })
    );
    assert_eq!(
        require_fields(&claim(None, Some("M1"))),
        Err(AttributeError::MissingRequiredField {
            fields: vec![AttributeField::Name],
        })
    );
}

#[test]
fn validation_rejects_out_of_set_characters() {
    assert_eq!(
        validate_attributes(&claim(Some("Rajesh Kumar"), Some("bci/778"))),
        Err(AttributeError::InvalidFormat {
            field: AttributeField::RegistrationId,
            value: "bci/778".to_string(),
        })
    );
    assert_eq!(
        validate_attributes(&claim(Some("R2-D2"), Some("BCI/778"))),
        Err(AttributeError::InvalidFormat {
            field: AttributeField::Name,
            value: "R2-D2".to_string(),
        })
    );
}

#[test]
fn presence_check_ignores_format() {
    assert_eq!(require_fields(&claim(Some("r2 d2!"), Some("lower/case"))), Ok(()));
}

#[test]
fn lowercase_ocr_ids_pass_format_validation() {
    let parsed = AttributeParser::default()
        .parse("Name: Rajesh Kumar\nbar council registration no: bci/778/2021");

    assert_eq!(
        parsed.attributes.registration_id.as_deref(),
        Some("BCI/778/2021")
    );
    assert_eq!(validate_attributes(&parsed.attributes), Ok(()));
}
