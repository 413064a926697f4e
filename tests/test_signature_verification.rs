//! Signature verification against generated certificates and signed PDFs.

mod common;

use common::*;
use pdf_sigcheck::certificate::TrustAnchors;
use pdf_sigcheck::revision::RevisionLocator;
use pdf_sigcheck::signatures::{
    CertificationLevel, DigestAlgorithm, RevokedSerials, SignatureSubFilter, SignatureVerifier, ValidationCode,
    VerifierOptions, UNPARSEABLE_SIGNATURE,
};
use std::sync::Arc;

fn verify(data: &[u8], name: &str, anchors: TrustAnchors) -> pdf_sigcheck::SignatureVerification {
    let field = RevisionLocator::locate(data, name).unwrap();
    SignatureVerifier::new(anchors).verify(data, &field)
}

#[test]
fn test_valid_signature_with_trusted_root() {
    let root = root_ca();
    let signer = signer(&root);
    let data = signed_pdf(&signer, "Signature1");

    let result = verify(&data, "Signature1", root.anchors());
    assert!(!result.modified, "{:?}", result.chain_failures);
    assert!(result.chain_failures.is_empty(), "{:?}", result.chain_failures);
    assert!(result.passed());
    assert_eq!(result.validation_code(), ValidationCode::Valid);
    assert!(result.subject.as_deref().unwrap().contains("Test Signer"));
    assert_eq!(result.revision_index, 2);
    assert_eq!(result.total_revisions, 2);
    assert!(result.is_last_signature);
    assert!(result.covers_whole_document);
    assert!(result.timestamp_token_present);
    assert_eq!(result.digest_algorithm, Some(DigestAlgorithm::Sha256));
    assert_eq!(result.sub_filter, Some(SignatureSubFilter::Pkcs7Detached));
    assert_eq!(result.reason.as_deref(), Some("Approval"));
    assert_eq!(result.location.as_deref(), Some("Lab Signature1"));
}

#[test]
fn test_untrusted_chain_is_not_modified() {
    let root = root_ca();
    let signer = signer(&root);
    let data = signed_pdf(&signer, "Signature1");

    let result = verify(&data, "Signature1", TrustAnchors::new());
    assert!(!result.modified);
    assert_eq!(result.chain_failures.len(), 1);
    assert!(result.chain_failures[0].starts_with("can't be verified"));
    assert_eq!(result.validation_code(), ValidationCode::CertificateCantBeVerified);
}

#[test]
fn test_self_signed_signer() {
    let lone = self_signed_signer();
    let data = signed_pdf(&lone, "Signature1");

    let untrusted = verify(&data, "Signature1", TrustAnchors::new());
    assert!(!untrusted.modified);
    assert!(untrusted.chain_failures[0].contains("self-signed"));

    let trusted = verify(&data, "Signature1", lone.anchors());
    assert!(trusted.passed(), "{:?}", trusted.chain_failures);
}

#[test]
fn test_chain_completed_from_anchors() {
    let root = root_ca();
    let signer = signer(&root);
    let mut spec = SignatureSpec::new("Signature1", &signer);
    spec.cms.embed_chain = false;
    let data = PdfBuilder::new().sign(&spec).build();

    let result = verify(&data, "Signature1", root.anchors());
    assert!(result.passed(), "{:?}", result.chain_failures);
}

#[test]
fn test_tampered_document_is_modified() {
    let root = root_ca();
    let signer = signer(&root);
    let mut data = signed_pdf(&signer, "Signature1");
    tamper_first_revision(&mut data);

    let result = verify(&data, "Signature1", root.anchors());
    assert!(result.modified);
    assert!(result.chain_failures.is_empty());
    assert_eq!(result.validation_code(), ValidationCode::RevisionModified);
    assert!(result.validation_code().is_error());
}

#[test]
fn test_garbage_contents_is_unparseable() {
    let root = root_ca();
    let signer = signer(&root);
    let mut spec = SignatureSpec::new("Signature1", &signer);
    spec.garbage_contents = true;
    let data = PdfBuilder::new().sign(&spec).build();

    let result = verify(&data, "Signature1", root.anchors());
    assert!(result.modified);
    assert_eq!(result.chain_failures, vec![UNPARSEABLE_SIGNATURE.to_string()]);
    assert!(result.subject.is_none());
}

#[test]
fn test_expired_signer_checked_now() {
    let root = root_ca();
    let expired = issue_signer(
        &root,
        &CertBuilder::new("CN=Old Signer").validity(at(2015, 1, 1), at(2016, 1, 1)),
    );
    let spec = SignatureSpec::new("Signature1", &expired).without_signing_time();
    let data = PdfBuilder::new().sign(&spec).build();

    let result = verify(&data, "Signature1", root.anchors());
    assert!(!result.modified);
    assert!(result.signing_time.is_none());
    assert!(result.chain_failures[0].starts_with("expired"));
    assert_eq!(result.validation_code(), ValidationCode::CertificateExpired);
    assert!(result.validation_code().is_warning());
}

#[test]
fn test_validity_checked_at_signing_time() {
    let root = root_ca();
    let expired = issue_signer(
        &root,
        &CertBuilder::new("CN=Old Signer").validity(at(2015, 1, 1), at(2016, 1, 1)),
    );
    let signed_at = at(2015, 6, 1);
    let mut spec = SignatureSpec::new("Signature1", &expired);
    spec.cms.signing_time = Some(signed_at);
    spec.modification_date = Some(signed_at);
    let data = PdfBuilder::new().sign(&spec).build();

    let at_signing = verify(&data, "Signature1", root.anchors());
    assert!(at_signing.passed(), "{:?}", at_signing.chain_failures);
    assert_eq!(at_signing.signing_time, Some(signed_at));

    let field = RevisionLocator::locate(&data, "Signature1").unwrap();
    let options = VerifierOptions {
        check_at_signing_time: false,
        ..Default::default()
    };
    let now = SignatureVerifier::new(root.anchors()).with_options(options).verify(&data, &field);
    assert_eq!(now.validation_code(), ValidationCode::CertificateExpired);
}

#[test]
fn test_not_yet_valid_signer() {
    let root = root_ca();
    let future = chrono::Utc::now() + chrono::Duration::days(10);
    let early = issue_signer(
        &root,
        &CertBuilder::new("CN=Early Signer").validity(future, future + chrono::Duration::days(365)),
    );
    let data = signed_pdf(&early, "Signature1");

    let result = verify(&data, "Signature1", root.anchors());
    assert!(!result.modified);
    assert_eq!(result.validation_code(), ValidationCode::CertificateNotYetValid);
}

#[test]
fn test_unsupported_critical_extension() {
    let root = root_ca();
    let odd = issue_signer(&root, &CertBuilder::new("CN=Odd Signer").private_critical_extension());
    let data = signed_pdf(&odd, "Signature1");

    let result = verify(&data, "Signature1", root.anchors());
    assert!(!result.modified);
    assert!(result.chain_failures[0].contains(PRIVATE_CRITICAL_OID));
    assert_eq!(result.validation_code(), ValidationCode::CertificateUnsupportedCriticalExtension);

    let field = RevisionLocator::locate(&data, "Signature1").unwrap();
    let options = VerifierOptions {
        policy: pdf_sigcheck::AcceptancePolicy::default().with_supported_extension(PRIVATE_CRITICAL_OID),
        ..Default::default()
    };
    let accepted = SignatureVerifier::new(root.anchors()).with_options(options).verify(&data, &field);
    assert!(accepted.passed(), "{:?}", accepted.chain_failures);
}

#[test]
fn test_revoked_signer() {
    let root = root_ca();
    let signer = signer(&root);
    let data = signed_pdf(&signer, "Signature1");
    let field = RevisionLocator::locate(&data, "Signature1").unwrap();

    let options = VerifierOptions {
        revocation: Some(Arc::new(RevokedSerials::new(vec![signer.certificate().serial().to_vec()]))),
        ..Default::default()
    };
    let result = SignatureVerifier::new(root.anchors()).with_options(options).verify(&data, &field);
    assert!(!result.modified);
    assert_eq!(result.validation_code(), ValidationCode::CertificateRevoked);
}

#[test]
fn test_missing_timestamp_is_a_warning() {
    let root = root_ca();
    let signer = signer(&root);
    let mut spec = SignatureSpec::new("Signature1", &signer);
    spec.cms.timestamp = false;
    let data = PdfBuilder::new().sign(&spec).build();

    let result = verify(&data, "Signature1", root.anchors());
    assert!(result.passed());
    assert!(!result.timestamp_token_present);
    assert_eq!(result.validation_code(), ValidationCode::NoTimestampToken);
    assert_eq!(result.validation_code().code(), 40);
}

#[test]
fn test_modification_date_used_without_signing_time_attribute() {
    let root = root_ca();
    let signer = signer(&root);
    let declared = at(2024, 3, 1);
    let mut spec = SignatureSpec::new("Signature1", &signer);
    spec.cms.signing_time = None;
    spec.modification_date = Some(declared);
    let data = PdfBuilder::new().sign(&spec).build();

    let result = verify(&data, "Signature1", root.anchors());
    assert_eq!(result.signing_time, Some(declared));
}

#[test]
fn test_sha1_sub_filter() {
    let root = root_ca();
    let signer = signer(&root);
    let mut spec = SignatureSpec::new("Signature1", &signer);
    spec.sub_filter = "adbe.pkcs7.sha1";
    spec.cms.sha1_content = true;
    let mut data = PdfBuilder::new().sign(&spec).build();

    let result = verify(&data, "Signature1", root.anchors());
    assert_eq!(result.sub_filter, Some(SignatureSubFilter::Pkcs7Sha1));
    assert!(result.passed(), "{:?}", result.chain_failures);

    tamper_first_revision(&mut data);
    assert!(verify(&data, "Signature1", root.anchors()).modified);
}

#[test]
fn test_encapsulated_digest_in_detached_signature() {
    let root = root_ca();
    let signer = signer(&root);
    let mut spec = SignatureSpec::new("Signature1", &signer);
    spec.cms.sha1_content = true;
    let mut data = PdfBuilder::new().sign(&spec).build();
    assert_eq!(verify(&data, "Signature1", root.anchors()).sub_filter, Some(SignatureSubFilter::Pkcs7Detached));
    assert!(verify(&data, "Signature1", root.anchors()).modified);

    tamper_first_revision(&mut data);
    let result = verify(&data, "Signature1", root.anchors());
    assert!(result.modified);
    assert_eq!(result.validation_code(), ValidationCode::RevisionModified);
}

#[test]
fn test_attached_content_checked_against_byte_range() {
    let root = root_ca();
    let signer = signer(&root);
    let mut spec = SignatureSpec::new("Signature1", &signer);
    spec.cms.attached_content = true;
    let mut data = PdfBuilder::new().sign(&spec).build();

    let intact = verify(&data, "Signature1", root.anchors());
    assert!(intact.passed(), "{:?}", intact.chain_failures);

    tamper_first_revision(&mut data);
    assert!(verify(&data, "Signature1", root.anchors()).modified);
}

#[test]
fn test_revocation_material_flags() {
    let root = root_ca();
    let signer = signer(&root);
    let plain = verify(&signed_pdf(&signer, "Signature1"), "Signature1", root.anchors());
    assert!(!plain.crl_present);
    assert!(!plain.ocsp_present);
    assert!(!plain.signer_directly_trusted);

    let mut spec = SignatureSpec::new("Signature1", &signer);
    spec.cms.crl = true;
    spec.cms.ocsp = true;
    let data = PdfBuilder::new().sign(&spec).build();
    let result = verify(&data, "Signature1", root.anchors());
    assert!(result.passed(), "{:?}", result.chain_failures);
    assert!(result.crl_present);
    assert!(result.ocsp_present);

    let mut spec = SignatureSpec::new("Signature1", &signer);
    spec.cms.crl = true;
    let data = PdfBuilder::new().sign(&spec).build();
    let result = verify(&data, "Signature1", root.anchors());
    assert!(result.crl_present);
    assert!(!result.ocsp_present);
}

#[test]
fn test_signer_directly_trusted() {
    let lone = self_signed_signer();
    let data = signed_pdf(&lone, "Signature1");
    assert!(verify(&data, "Signature1", lone.anchors()).signer_directly_trusted);
    assert!(!verify(&data, "Signature1", TrustAnchors::new()).signer_directly_trusted);

    let root = root_ca();
    let expired = issue_signer(
        &root,
        &CertBuilder::new("CN=Old Signer").validity(at(2015, 1, 1), at(2016, 1, 1)),
    );
    let spec = SignatureSpec::new("Signature1", &expired).without_signing_time();
    let data = PdfBuilder::new().sign(&spec).build();
    let mut anchors = root.anchors();
    anchors.add(expired.certificate());
    assert!(!verify(&data, "Signature1", anchors).signer_directly_trusted);
}

#[test]
fn test_certification_level_reported() {
    let root = root_ca();
    let signer = signer(&root);
    let mut spec = SignatureSpec::new("Signature1", &signer);
    spec.docmdp = Some(1);
    let data = PdfBuilder::new().sign(&spec).build();

    let result = verify(&data, "Signature1", root.anchors());
    assert_eq!(result.certification_level, CertificationLevel::NoChangesAllowed);
    assert_eq!(result.validation_code(), ValidationCode::Valid);
}
