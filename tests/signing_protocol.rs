//! Two-phase signing: data to sign, external signature, assembly.

mod common;

use base64::Engine;
use common::{
    agenda_xml, asic_e, certificate, fake_sign, fake_services, gateway, pdf, text,
    timestamp_source, GatewayFixture, RecordingSignatureService, FORM_IDENTIFIER,
};
use proptest::prelude::*;
use signing_gateway::domain::eform::XDC_NAMESPACE;
use signing_gateway::domain::level::ContainerKind;
use signing_gateway::domain::mime::MimeKind;
use signing_gateway::services::classifier::MimeClassifier;
use signing_gateway::services::signature::ServiceKind;
use signing_gateway::{
    CallerParameters, DataToSignStructure, Document, ResolutionPolicy, SigningError,
    SigningGateway, SigningRequest,
};
use std::sync::Arc;

fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// Sign the echoed data to sign the way an external signer would.
fn external_signature(structure: &DataToSignStructure) -> Vec<u8> {
    fake_sign(&b64().decode(&structure.data_to_sign).unwrap())
}

fn sign_round_trip(
    gateway: &SigningGateway,
    document: Document,
    parameters: CallerParameters,
) -> Result<signing_gateway::SignedDocumentResult, SigningError> {
    let request = SigningRequest::new(document, parameters);
    let structure = gateway.data_to_sign(&request, &certificate())?;
    let signature = external_signature(&structure);
    gateway.sign(&request, structure, &signature)
}

#[test]
fn test_pades_round_trip() {
    let signed = sign_round_trip(
        &gateway(),
        pdf("contract.pdf"),
        CallerParameters::with_level("PAdES_BASELINE_B"),
    )
    .unwrap();

    assert_eq!(signed.document.filename(), Some("contract_signed.pdf"));
    assert_eq!(signed.document.declared_kind(), MimeKind::Pdf);
    assert!(signed.signed_by().contains("CN=Test Signer"));
    assert!(signed.issued_by().contains("CN=Test Signer"));
}

#[test]
fn test_structure_echoes_certificate_and_millisecond_time() {
    let gateway = gateway();
    let request = SigningRequest::new(
        pdf("a.pdf"),
        CallerParameters::with_level("PAdES_BASELINE_B"),
    );
    let before = chrono::Utc::now().timestamp_millis();
    let structure = gateway.data_to_sign(&request, &certificate()).unwrap();
    let after = chrono::Utc::now().timestamp_millis();

    assert_eq!(structure.signing_certificate, certificate().to_base64());
    assert!(structure.signing_time >= before && structure.signing_time <= after);
    assert_eq!(b64().decode(&structure.data_to_sign).unwrap().len(), 32);
}

#[test]
fn test_phase_two_uses_echoed_time() {
    let gateway = gateway();
    let request = SigningRequest::new(
        pdf("a.pdf"),
        CallerParameters::with_level("PAdES_BASELINE_B"),
    );
    let structure = gateway.data_to_sign(&request, &certificate()).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));

    let signature = external_signature(&structure);
    assert!(gateway.sign(&request, structure, &signature).is_ok());
}

#[test]
fn test_shifted_signing_time_is_mismatch() {
    let gateway = gateway();
    let request = SigningRequest::new(
        pdf("a.pdf"),
        CallerParameters::with_level("PAdES_BASELINE_B"),
    );
    let mut structure = gateway.data_to_sign(&request, &certificate()).unwrap();
    let signature = external_signature(&structure);
    structure.signing_time += 1;

    let err = gateway.sign(&request, structure, &signature).unwrap_err();
    assert!(matches!(err, SigningError::DataToSignMismatch));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_changed_document_is_mismatch() {
    let gateway = gateway();
    let parameters = CallerParameters::with_level("PAdES_BASELINE_B");
    let original = SigningRequest::new(pdf("a.pdf"), parameters.clone());
    let structure = gateway.data_to_sign(&original, &certificate()).unwrap();
    let signature = external_signature(&structure);

    let mut content = pdf("a.pdf").into_content();
    content.extend_from_slice(b"% appended\n");
    let tampered = SigningRequest::new(
        Document::new(content, Some("a.pdf".into()), pdf("a.pdf").mime().clone()),
        parameters,
    );
    let err = gateway.sign(&tampered, structure, &signature).unwrap_err();
    assert_eq!(err.error_code(), "DATATOSIGN_MISMATCH");
}

#[test]
fn test_wrong_signature_value_fails_verification() {
    let gateway = gateway();
    let request = SigningRequest::new(
        pdf("a.pdf"),
        CallerParameters::with_level("PAdES_BASELINE_B"),
    );
    let structure = gateway.data_to_sign(&request, &certificate()).unwrap();

    let err = gateway.sign(&request, structure, b"not a signature").unwrap_err();
    assert!(matches!(err, SigningError::CryptographicVerification(_)));
    assert_eq!(err.error_code(), "SIGNATURE_NOT_IN_TACT");
}

#[test]
fn test_signing_time_outside_certificate_validity() {
    let gateway = gateway();
    let request = SigningRequest::new(
        pdf("a.pdf"),
        CallerParameters::with_level("PAdES_BASELINE_B"),
    );
    let mut structure = gateway.data_to_sign(&request, &certificate()).unwrap();
    let signature = external_signature(&structure);
    // 2020-01-01, before the certificate's notBefore
    structure.signing_time = 1_577_836_800_000;

    let err = gateway.sign(&request, structure, &signature).unwrap_err();
    assert!(matches!(err, SigningError::Certificate(_)));
    assert_eq!(err.error_code(), "INVALID_CERTIFICATE");
}

#[test]
fn test_fixture_certificate_is_valid_well_around_now() {
    let certificate = certificate();
    let now = chrono::Utc::now();
    assert!(certificate.not_before() < now - chrono::Duration::days(365));
    assert!(certificate.not_after() > now + chrono::Duration::days(365));
}

#[test]
fn test_timestamp_source_reaches_service_only_above_baseline_b() {
    let recorder = Arc::new(RecordingSignatureService::new(ServiceKind::PAdES));
    let gateway = GatewayFixture {
        services: fake_services().with_service(ServiceKind::PAdES, recorder.clone()),
        ..GatewayFixture::default()
    }
    .build();

    sign_round_trip(
        &gateway,
        pdf("a.pdf"),
        CallerParameters::with_level("PAdES_BASELINE_T"),
    )
    .unwrap();
    sign_round_trip(
        &gateway,
        pdf("b.pdf"),
        CallerParameters::with_level("PAdES_BASELINE_B"),
    )
    .unwrap();

    // Each round trip: phase one, phase two recomputation, assembly.
    let seen = recorder.timestamp_sources();
    assert_eq!(seen.len(), 6);
    assert!(seen[..3].iter().all(|s| s.as_ref() == Some(&timestamp_source())));
    assert!(seen[3..].iter().all(Option::is_none));
}

#[test]
fn test_t_level_without_timestamp_server_is_rejected() {
    let gateway = GatewayFixture {
        policy: ResolutionPolicy::default(),
        ..GatewayFixture::default()
    }
    .build();
    let request = SigningRequest::new(
        pdf("a.pdf"),
        CallerParameters::with_level("PAdES_BASELINE_T"),
    );

    let err = gateway.data_to_sign(&request, &certificate()).unwrap_err();
    assert!(matches!(err, SigningError::TsaMisconfigured(_)));
    assert_eq!(err.error_code(), "TSA_SERVER_MISCONFIGURED");

    let structure = DataToSignStructure {
        data_to_sign: String::new(),
        signing_time: chrono::Utc::now().timestamp_millis(),
        signing_certificate: certificate().to_base64(),
    };
    let err = gateway.sign(&request, structure, b"sig").unwrap_err();
    assert!(matches!(err, SigningError::TsaMisconfigured(_)));

    let b_level = SigningRequest::new(
        pdf("a.pdf"),
        CallerParameters::with_level("PAdES_BASELINE_B"),
    );
    assert!(gateway.data_to_sign(&b_level, &certificate()).is_ok());
}

#[test]
fn test_garbage_certificate_in_structure() {
    let gateway = gateway();
    let request = SigningRequest::new(
        pdf("a.pdf"),
        CallerParameters::with_level("PAdES_BASELINE_B"),
    );
    let mut structure = gateway.data_to_sign(&request, &certificate()).unwrap();
    structure.signing_certificate = "bm90IGEgY2VydGlmaWNhdGU=".into();

    let err = gateway.sign(&request, structure, b"sig").unwrap_err();
    assert!(matches!(err, SigningError::Certificate(_)));
}

#[test]
fn test_asice_result_is_renamed() {
    let caller = CallerParameters {
        container: Some(ContainerKind::AsicE),
        ..CallerParameters::with_level("XAdES_BASELINE_B")
    };
    let signed = sign_round_trip(&gateway(), text("notes.txt", "hello"), caller).unwrap();
    assert_eq!(signed.document.filename(), Some("notes_signed.asice"));

    let caller = CallerParameters {
        container: Some(ContainerKind::AsicS),
        ..CallerParameters::with_level("CAdES_BASELINE_B")
    };
    let signed = sign_round_trip(&gateway(), text("notes.txt", "hello"), caller).unwrap();
    assert_eq!(signed.document.filename(), Some("notes_signed.asics"));
}

#[test]
fn test_xdc_is_signed_as_xdcf() {
    let caller = CallerParameters {
        container_xmlns: Some(XDC_NAMESPACE.to_string()),
        identifier: Some(FORM_IDENTIFIER.to_string()),
        auto_load_eform: Some(true),
        ..CallerParameters::with_level("XAdES_BASELINE_B")
    };
    let signed = sign_round_trip(&gateway(), agenda_xml("agenda.xml"), caller).unwrap();

    assert_eq!(signed.document.filename(), Some("agenda_signed.xdcf"));
    assert_eq!(MimeClassifier::classify(&signed.document), MimeKind::Xdc);
}

#[test]
fn test_countersigning_asic_keeps_container() {
    let container = asic_e("bundle.asice", &[("report.pdf", b"%PDF-1.4\n")]);
    let caller = CallerParameters {
        container: Some(ContainerKind::AsicE),
        ..CallerParameters::with_level("XAdES_BASELINE_T")
    };
    let signed = sign_round_trip(&gateway(), container, caller).unwrap();
    assert_eq!(signed.document.filename(), Some("bundle_signed.asice"));
}

#[test]
fn test_resolution_failure_stops_phase_one() {
    let err = gateway()
        .data_to_sign(
            &SigningRequest::new(pdf("a.pdf"), CallerParameters::default()),
            &certificate(),
        )
        .unwrap_err();
    assert!(matches!(err, SigningError::RequestValidation { .. }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_any_tampered_byte_is_rejected(index in 0usize..32, flip in 1u8..=255) {
        let gateway = gateway();
        let request = SigningRequest::new(
            pdf("a.pdf"),
            CallerParameters::with_level("PAdES_BASELINE_B"),
        );
        let mut structure = gateway.data_to_sign(&request, &certificate()).unwrap();
        let signature = external_signature(&structure);

        let mut bytes = b64().decode(&structure.data_to_sign).unwrap();
        bytes[index] ^= flip;
        structure.data_to_sign = b64().encode(&bytes);

        let err = gateway.sign(&request, structure, &signature).unwrap_err();
        prop_assert!(matches!(err, SigningError::DataToSignMismatch));
    }
}
