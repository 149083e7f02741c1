use crate::infra::{FixtureOcrEngine, InMemoryLedger, InMemoryVault, SAMPLE_CERTIFICATE};
use clap::Args;
use credential_verify::error::AppError;
use credential_verify::workflows::verification::{
    validate_attributes, Actor, ActorRole, AttributeParser, ExtractedAttributes, RegistrySeed,
    SubmissionReceipt, UploadedDocument, VerificationError, VerificationRequest,
    VerificationService, VerificationSettings,
};
use image::{ImageFormat, Rgb, RgbImage};
use serde::Serialize;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ParseArgs {
    /// Plain-text certificate transcript to run through the attribute parser
    #[arg(long)]
    pub(crate) file: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Professional the demo submissions are filed for
    #[arg(long, default_value = "pro-demo")]
    pub(crate) subject: String,
    /// Administrator who reviews the uploaded certificate
    #[arg(long, default_value = "admin-demo")]
    pub(crate) reviewer: String,
    /// Reject the uploaded certificate instead of approving it
    #[arg(long)]
    pub(crate) reject: bool,
}

pub(crate) fn run_parse(args: ParseArgs) -> Result<(), AppError> {
    let text = std::fs::read_to_string(&args.file)?;
    let parsed = AttributeParser::default().parse(&text);

    println!("Parsed {}", args.file.display());
    print_json("Attributes", &parsed);

    match validate_attributes(&parsed.attributes) {
        Ok(()) => println!("Validation: all required fields present and well formed"),
        Err(err) => println!("Validation: {err}"),
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        subject,
        reviewer,
        reject,
    } = args;

    let professional = Actor::new(subject, ActorRole::Professional);
    let administrator = Actor::new(reviewer, ActorRole::Administrator);
    let vault = Arc::new(InMemoryVault::default());
    let service = VerificationService::new(
        Arc::new(InMemoryLedger::default()),
        Arc::new(FixtureOcrEngine::new(SAMPLE_CERTIFICATE)),
        vault.clone(),
        VerificationSettings::default(),
    );
    let subject = professional.subject();

    println!("Credential verification demo for {subject}");

    println!("\n1. Certificate upload");
    let upload = UploadedDocument::new(blank_scan()?, "image/png", "enrolment.png");
    let uploaded = service.submit(&subject, VerificationRequest::Document(upload))?;
    print_receipt(&uploaded);

    let record = service.get(&uploaded.verification_id)?;
    if let Some(document) = &record.document {
        if let Some((content_type, size)) = vault.describe(&document.storage_key) {
            println!(
                "   filed as {} ({content_type}, {size} bytes); vault holds {} document(s)",
                document.storage_key,
                vault.len()
            );
        }
    }

    println!("\n2. Review by {}", administrator.id);
    let action = if reject { "reject" } else { "approve" };
    let decision = service.review(
        &administrator,
        &uploaded.verification_id,
        action,
        "Enrolment certificate matches the roll",
    )?;
    println!("   {} -> {}", decision.verification_id, decision.message);

    match service.review(&administrator, &uploaded.verification_id, "approve", "") {
        Ok(_) => println!("   second decision unexpectedly accepted"),
        Err(err) => println!("   second decision refused: {err}"),
    }

    println!("\n3. Simulated registry lookup");
    let seed = RegistrySeed {
        name: Some("Anita Sharma".to_string()),
        specialization: Some("Corporate Law".to_string()),
        ..RegistrySeed::default()
    };
    let registry = service.submit(&subject, VerificationRequest::SimulatedRegistry(seed))?;
    print_receipt(&registry);

    println!("\n4. Manual claims");
    let incomplete = ExtractedAttributes {
        registration_id: Some("BCI/901/2019".to_string()),
        ..ExtractedAttributes::default()
    };
    match service.submit(&subject, VerificationRequest::Manual(incomplete)) {
        Ok(receipt) => print_receipt(&receipt),
        Err(err) => print_refusal(&err),
    }

    let complete = ExtractedAttributes {
        name: Some("Anita Sharma".to_string()),
        registration_id: Some("BCI/901/2019".to_string()),
        registration_date: Some("04/07/2019".to_string()),
        issuing_authority: Some("Bar Council of Maharashtra".to_string()),
        ..ExtractedAttributes::default()
    };
    let manual = service.submit(&subject, VerificationRequest::Manual(complete))?;
    print_receipt(&manual);

    println!("\n5. Review queue");
    for summary in service.pending(&administrator)? {
        println!(
            "   - {} | {} | {} | {}",
            summary.verification_id,
            summary.method_label,
            summary.subject,
            summary.confidence.label()
        );
    }

    println!("\n6. Status");
    let status = service.status(&subject, None)?;
    print_json("Status payload", &status);

    Ok(())
}

fn print_receipt(receipt: &SubmissionReceipt) {
    println!(
        "   {} [{}] status {} | confidence {} | review required: {}",
        receipt.verification_id,
        receipt.method.label(),
        receipt.status,
        receipt.confidence.label(),
        receipt.requires_review
    );
    println!("   {}", receipt.message);
}

fn print_refusal(err: &VerificationError) {
    println!("   refused ({}): {err}", err.kind());
}

fn print_json<T: Serialize>(label: &str, value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{label}:\n{json}"),
        Err(err) => println!("{label} unavailable: {err}"),
    }
}

// The fixture engine ignores pixels; the upload still has to decode as a PNG.
fn blank_scan() -> Result<Vec<u8>, AppError> {
    let scan = RgbImage::from_pixel(120, 40, Rgb([255, 255, 255]));
    let mut bytes = Vec::new();
    scan.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_scan_is_a_png() {
        let bytes = blank_scan().expect("scan");
        assert_eq!(image::guess_format(&bytes).expect("format"), ImageFormat::Png);
    }

    #[test]
    fn demo_runs_end_to_end() {
        let args = DemoArgs {
            subject: "pro-demo".to_string(),
            reviewer: "admin-demo".to_string(),
            reject: false,
        };
        run_demo(args).expect("demo");
    }

    #[test]
    fn parse_reports_missing_files() {
        let error = run_parse(ParseArgs {
            file: PathBuf::from("/nonexistent/certificate.txt"),
        })
        .unwrap_err();
        assert!(matches!(error, AppError::Io(_)));
    }
}
