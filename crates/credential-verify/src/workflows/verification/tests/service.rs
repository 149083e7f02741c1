use super::common::*;
use crate::workflows::verification::domain::{ExtractedAttributes, VerificationId, VerificationStatus};
use crate::workflows::verification::lifecycle::TransitionError;
use crate::workflows::verification::service::VerificationError;
use crate::workflows::verification::strategies::{RegistrySeed, VerificationRequest};

fn manual_claim(registration_id: &str) -> VerificationRequest {
    VerificationRequest::Manual(ExtractedAttributes {
        name: Some("Priya Nair".to_string()),
        registration_id: Some(registration_id.to_string()),
        ..ExtractedAttributes::default()
    })
}

#[test]
fn professionals_cannot_review() {
    let (service, ledger, _) = build_service("");
    let owner = professional("pro-1");
    let receipt = service
        .submit(&owner.subject(), manual_claim("K/1"))
        .expect("manual claim");

    let error = service
        .review(&owner, &receipt.verification_id, "approve", "")
        .unwrap_err();

    assert!(matches!(error, VerificationError::Authorization { .. }));
    assert_eq!(error.kind(), "authorization_error");
    assert_eq!(
        ledger.record(&receipt.verification_id).map(|r| r.status),
        Some(VerificationStatus::Pending)
    );
}

#[test]
fn unknown_action_is_an_invalid_transition() {
    let (service, ledger, _) = build_service("");
    let receipt = service
        .submit(&subject("pro-2"), manual_claim("K/2"))
        .expect("manual claim");

    let error = service
        .review(&admin(), &receipt.verification_id, "archive", "")
        .unwrap_err();

    assert!(matches!(
        error,
        VerificationError::InvalidTransition(TransitionError::UnknownAction(_))
    ));
    assert_eq!(
        ledger.record(&receipt.verification_id).map(|r| r.review),
        Some(None)
    );
}

#[test]
fn unknown_record_is_not_found() {
    let (service, _, _) = build_service("");

    let error = service
        .review(&admin(), &VerificationId("ver-missing".to_string()), "approve", "")
        .unwrap_err();

    assert_eq!(error.kind(), "not_found");
    assert!(matches!(service.get(&VerificationId("ver-missing".to_string())), Err(VerificationError::NotFound(_))));
}

#[test]
fn rejection_is_reported_and_keeps_profile_unverified() {
    let (service, _, _) = build_service("");
    let owner = subject("pro-3");
    let receipt = service
        .submit(&owner, manual_claim("K/3"))
        .expect("manual claim");

    let review = service
        .review(&admin(), &receipt.verification_id, "reject", "illegible")
        .expect("reject");
    assert_eq!(review.status, VerificationStatus::Rejected);
    assert_eq!(review.verification_id, receipt.verification_id);

    let status = service.status(&owner, None).expect("status");
    assert!(!status.verified);
    assert_eq!(status.registration_id, None);
    assert_eq!(status.recent_verifications[0].status, VerificationStatus::Rejected);
    assert_eq!(status.recent_verifications[0].review_comments, "illegible");
}

#[test]
fn status_lists_newest_first_and_honours_limit() {
    let (service, _, _) = build_service("");
    let owner = subject("pro-4");
    let ids: Vec<_> = ["K/1", "K/2", "K/3"]
        .into_iter()
        .map(|registration| {
            service
                .submit(&owner, manual_claim(registration))
                .expect("manual claim")
                .verification_id
        })
        .collect();
    service
        .submit(&subject("someone-else"), manual_claim("K/9"))
        .expect("other subject");

    let status = service.status(&owner, Some(2)).expect("status");
    let listed: Vec<_> = status
        .recent_verifications
        .iter()
        .map(|summary| summary.verification_id.clone())
        .collect();
    assert_eq!(listed, vec![ids[2].clone(), ids[1].clone()]);

    let default_window = service.status(&owner, None).expect("status");
    assert_eq!(default_window.recent_verifications.len(), 3);
}

#[test]
fn pending_queue_is_for_reviewers_only() {
    let (service, _, _) = build_service("");
    let owner = professional("pro-5");
    let manual = service
        .submit(&owner.subject(), manual_claim("K/5"))
        .expect("manual claim");
    service
        .submit(
            &owner.subject(),
            VerificationRequest::SimulatedRegistry(RegistrySeed::default()),
        )
        .expect("registry lookup");

    assert_eq!(
        service.pending(&owner).unwrap_err().kind(),
        "authorization_error"
    );

    let queue = service.pending(&admin()).expect("queue");
    assert!(queue
        .iter()
        .any(|summary| summary.verification_id == manual.verification_id));
    assert!(queue
        .iter()
        .all(|summary| summary.status == VerificationStatus::Pending));
}

#[test]
fn latest_approval_wins() {
    let (service, _, _) = build_service("");
    let owner = subject("pro-6");
    let first = service
        .submit(&owner, manual_claim("FIRST/1"))
        .expect("first claim");
    let second = service
        .submit(&owner, manual_claim("SECOND/2"))
        .expect("second claim");

    service
        .review(&admin(), &second.verification_id, "approve", "")
        .expect("approve second");
    service
        .review(&admin(), &first.verification_id, "approve", "")
        .expect("approve first");

    let status = service.status(&owner, None).expect("status");
    assert!(status.verified);
    assert_eq!(status.registration_id.as_deref(), Some("FIRST/1"));
}

#[test]
fn validation_is_advisory_and_stores_nothing() {
    let (service, ledger, _) = build_service("");

    let well_formed = ExtractedAttributes {
        name: Some("Priya Nair".to_string()),
        registration_id: Some("K/1024/2015".to_string()),
        ..ExtractedAttributes::default()
    };
    assert!(service.validate(&well_formed).is_ok());

    let lowercase = ExtractedAttributes {
        registration_id: Some("k/1024".to_string()),
        ..well_formed
    };
    assert_eq!(service.validate(&lowercase).unwrap_err().kind(), "invalid_format");
    assert_eq!(ledger.record_count(), 0);
}
