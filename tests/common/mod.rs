//! Shared fixtures for integration tests.
//!
//! The fake signature services derive the data to sign from every input
//! that influences it (document, level, signing time, certificate), so a
//! change to any echoed value changes the bytes. A "signature" is valid when
//! it equals [`fake_sign`] of the data to sign.

#![allow(dead_code)]

use sha2::{Digest, Sha256};
use signing_gateway::domain::crypto::SignatureValue;
use signing_gateway::domain::eform::EFormAttributes;
use signing_gateway::domain::level::ContainerKind;
use signing_gateway::domain::mime::{self, MimeType};
use signing_gateway::domain::validation::{ExistingSignature, ValidationReport};
use signing_gateway::services::eform::InMemoryFormRegistry;
use signing_gateway::services::signature::{
    ServiceError, ServiceKind, ServiceRegistry, SignatureParameters, SignatureService,
};
use signing_gateway::services::xml_engine::XmlValidationRequest;
use signing_gateway::{
    CertificateToken, Collaborators, Document, FormRegistry, ResolutionPolicy, SignatureValidator,
    SigningError, SigningGateway, SigningResult, TimestampSource, ValidationFacade, XmlEngine,
};
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Self-signed RSA 2048 certificate, `CN=Test Signer, O=Example Org, C=SK`,
/// valid 2021-01-01 to 2046-01-01.
pub const TEST_CERTIFICATE_B64: &str = "\
    MIIDUzCCAjugAwIBAgIUV+zvwUEXqxIESWv99Bb9azdGYmkwDQYJKoZIhvcNAQELBQAwOTELMAkG\
    A1UEBhMCU0sxFDASBgNVBAoMC0V4YW1wbGUgT3JnMRQwEgYDVQQDDAtUZXN0IFNpZ25lcjAeFw0y\
    MTAxMDEwMDAwMDBaFw00NjAxMDEwMDAwMDBaMDkxCzAJBgNVBAYTAlNLMRQwEgYDVQQKDAtFeGFt\
    cGxlIE9yZzEUMBIGA1UEAwwLVGVzdCBTaWduZXIwggEiMA0GCSqGSIb3DQEBAQUAA4IBDwAwggEK\
    AoIBAQDHxsS+gJ3eflmAQg8eFmqh/dAY8Qz4qUXE5mrJIE5DNYWCN6+5jSdktlpXb9EMUpPN+d0v\
    RGmKkxDees2XCpVTHboe6z2d9XxA9+IwbwdWtbZs7RrYfUO0xbZ4wHg/L27HAuj0MPaeU9emlCWk\
    wqUfCAug6DKfRRlVwxGm6AqO369xJkt0zKIsw5FeCfMMqllyiqqZi8lYcfGB3EJ/6YI3NJEPj4NL\
    FwsQiBDFRJxF1IKvlrYwr4VP3J9yyIAO5MDgsjxkFIRfMKc92r6LtFfQYIOttdU+8m/CZSwCdtpV\
    WxaNUZ0ApvRCw8O4/Bf0HIrVe6nXdDMZFcjedq/vCp67AgMBAAGjUzBRMB0GA1UdDgQWBBRxLtg6\
    gO2S4Hji8/RaCvYzSVw+dDAfBgNVHSMEGDAWgBRxLtg6gO2S4Hji8/RaCvYzSVw+dDAPBgNVHRMB\
    Af8EBTADAQH/MA0GCSqGSIb3DQEBCwUAA4IBAQDB7HX8DEwLpTcJh7V+gsOJF3539jzEmqmXQ/Ae\
    qekLfaHYAd1dpJsi9J5axJKeOMKgSXDgIFdd+Cbt84R0B0guJ8wm9QvfzjlXsGCBsVKQQKs9oW+8\
    QD1zaJcWsehKB4Y+W/rdDXLcg+MTKN5NK5HQLOg5FasOp3eZrEUhL6iyeJo9mCaOPUnroZjsMaY4\
    OC7bfMALlZylKThrCmZAAPo2VQjrAPlbfD0Xr0gh43uIZxTNQjUAnKu1V9N8KwR6aFYLE8b3MrG6\
    zOm83WzD+FIKaqVaVy4LyqZKxVKE0xH2ID3FhSdCdkrBbs8Eu9KvRBmnR7yrzZNpBj4FdWdaEWB+";

pub const FORM_NAMESPACE: &str = "http://schemas.gov.sk/form/App.GeneralAgenda/1.9";
pub const FORM_IDENTIFIER: &str = "http://data.gov.sk/doc/eform/App.GeneralAgenda/1.9";
pub const HTML_TRANSFORMATION: &str = r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform"><xsl:output method="html"/><xsl:template match="/"><p>agenda</p></xsl:template></xsl:stylesheet>"#;
pub const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#;

pub const TSA_URL: &str = "http://tsa.example.org/tsr";

pub fn timestamp_source() -> TimestampSource {
    TimestampSource::from_urls(&[TSA_URL]).expect("test TSA URL is valid")
}

pub fn certificate() -> CertificateToken {
    CertificateToken::from_base64(TEST_CERTIFICATE_B64).expect("test certificate parses")
}

/// Signature value the fake services accept for `data_to_sign`.
pub fn fake_sign(data_to_sign: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(b"fake-signature");
    hasher.update(data_to_sign);
    hasher.finalize().to_vec()
}

/// Deterministic stand-in for one signature service.
pub struct FakeSignatureService {
    kind: ServiceKind,
}

impl FakeSignatureService {
    pub fn new(kind: ServiceKind) -> Self {
        Self { kind }
    }

    fn compute(&self, document: &Document, parameters: &SignatureParameters) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.as_str());
        hasher.update(document.content());
        hasher.update(parameters.level.to_string());
        hasher.update(parameters.signing_time.timestamp_millis().to_be_bytes());
        hasher.update(parameters.signing_certificate.as_der());
        hasher.update(parameters.digest_algorithm.as_str());
        hasher.finalize().to_vec()
    }
}

impl SignatureService for FakeSignatureService {
    fn data_to_sign(
        &self,
        document: &Document,
        parameters: &SignatureParameters,
    ) -> Result<Vec<u8>, ServiceError> {
        Ok(self.compute(document, parameters))
    }

    fn sign_document(
        &self,
        document: &Document,
        parameters: &SignatureParameters,
        signature: &SignatureValue,
    ) -> Result<Document, ServiceError> {
        let expected = fake_sign(&self.compute(document, parameters));
        if signature.as_slice() != expected.as_slice() {
            return Err(ServiceError::CryptographicVerification(
                "signature value does not match the signing certificate".into(),
            ));
        }

        let mut content = document.content().to_vec();
        content.extend_from_slice(b"\n<!-- signed -->");
        let signed = match parameters.container {
            Some(ContainerKind::AsicE) => Document::new(
                content,
                Some("container.sce".into()),
                MimeType::parse(mime::ASIC_E),
            ),
            Some(ContainerKind::AsicS) => Document::new(
                content,
                Some("container.scs".into()),
                MimeType::parse(mime::ASIC_S),
            ),
            None => Document::new(
                content,
                document.filename().map(str::to_string),
                document.mime().clone(),
            ),
        };
        Ok(signed)
    }
}

/// Registry with a fake service for every kind.
pub fn fake_services() -> ServiceRegistry {
    ServiceKind::ALL
        .into_iter()
        .fold(ServiceRegistry::new(), |registry, kind| {
            registry.with_service(kind, Arc::new(FakeSignatureService::new(kind)))
        })
}

/// Fake service that remembers the timestamp source of every call.
pub struct RecordingSignatureService {
    inner: FakeSignatureService,
    timestamp_sources: Mutex<Vec<Option<TimestampSource>>>,
}

impl RecordingSignatureService {
    pub fn new(kind: ServiceKind) -> Self {
        Self {
            inner: FakeSignatureService::new(kind),
            timestamp_sources: Mutex::new(Vec::new()),
        }
    }

    pub fn timestamp_sources(&self) -> Vec<Option<TimestampSource>> {
        self.timestamp_sources.lock().unwrap().clone()
    }

    fn record(&self, parameters: &SignatureParameters) {
        self.timestamp_sources
            .lock()
            .unwrap()
            .push(parameters.timestamp_source.clone());
    }
}

impl SignatureService for RecordingSignatureService {
    fn data_to_sign(
        &self,
        document: &Document,
        parameters: &SignatureParameters,
    ) -> Result<Vec<u8>, ServiceError> {
        self.record(parameters);
        self.inner.data_to_sign(document, parameters)
    }

    fn sign_document(
        &self,
        document: &Document,
        parameters: &SignatureParameters,
        signature: &SignatureValue,
    ) -> Result<Document, ServiceError> {
        self.record(parameters);
        self.inner.sign_document(document, parameters, signature)
    }
}

/// Validator reporting a fixed existing signature.
#[derive(Default)]
pub struct FakeValidator {
    pub existing: Option<ExistingSignature>,
}

impl FakeValidator {
    pub fn signed_with(form: &str, container: Option<ContainerKind>) -> Self {
        Self {
            existing: Some(ExistingSignature {
                form: form.to_string(),
                container,
            }),
        }
    }
}

impl SignatureValidator for FakeValidator {
    fn refresh(&self) -> SigningResult<()> {
        Ok(())
    }

    fn classify_existing_signature(
        &self,
        _document: &Document,
    ) -> SigningResult<Option<ExistingSignature>> {
        Ok(self.existing.clone())
    }

    fn validate_report(&self, _document: &Document) -> SigningResult<Option<ValidationReport>> {
        Ok(self.existing.as_ref().map(|existing| {
            ValidationReport(serde_json::json!({
                "signatures": [{ "form": existing.form, "indication": "TOTAL_PASSED" }]
            }))
        }))
    }
}

/// XML engine that accepts everything (unless told otherwise) and renders
/// documents as `<html>` wrappers.
#[derive(Default)]
pub struct FakeXmlEngine {
    pub reject_documents: bool,
}

impl XmlEngine for FakeXmlEngine {
    fn validate(&self, _request: &XmlValidationRequest<'_>) -> SigningResult<()> {
        if self.reject_documents {
            return Err(SigningError::eform_with(
                "XML document is not valid against its schema",
                "cvc-elt.1: element not declared",
            ));
        }
        Ok(())
    }

    fn transform(&self, document: &[u8], _transformation: &str) -> SigningResult<Vec<u8>> {
        let mut out = b"<html>".to_vec();
        out.extend_from_slice(document);
        out.extend_from_slice(b"</html>");
        Ok(out)
    }
}

/// Registry knowing the general agenda form.
pub fn agenda_registry() -> Arc<dyn FormRegistry> {
    Arc::new(InMemoryFormRegistry::new().with_form(
        FORM_NAMESPACE,
        EFormAttributes {
            identifier: FORM_IDENTIFIER.to_string(),
            schema: Some(SCHEMA.to_string()),
            transformation: Some(HTML_TRANSFORMATION.to_string()),
            ..EFormAttributes::default()
        },
    ))
}

/// Builder for a gateway wired to fakes.
pub struct GatewayFixture {
    pub policy: ResolutionPolicy,
    pub validator: FakeValidator,
    pub xml_engine: FakeXmlEngine,
    pub form_registry: Option<Arc<dyn FormRegistry>>,
    pub services: ServiceRegistry,
}

impl Default for GatewayFixture {
    fn default() -> Self {
        Self {
            policy: ResolutionPolicy {
                timestamp_source: Some(timestamp_source()),
                ..ResolutionPolicy::default()
            },
            validator: FakeValidator::default(),
            xml_engine: FakeXmlEngine::default(),
            form_registry: Some(agenda_registry()),
            services: fake_services(),
        }
    }
}

impl GatewayFixture {
    pub fn build(self) -> SigningGateway {
        let validation = Arc::new(ValidationFacade::new(
            Arc::new(self.validator),
            Duration::from_millis(200),
        ));
        validation.refresh().expect("fake refresh succeeds");
        SigningGateway::new(
            self.policy,
            Collaborators {
                signature_services: Arc::new(self.services),
                validation,
                xml_engine: Arc::new(self.xml_engine),
                form_registry: self.form_registry,
            },
        )
    }
}

pub fn gateway() -> SigningGateway {
    GatewayFixture::default().build()
}

pub fn pdf(name: &str) -> Document {
    Document::new(
        b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n%%EOF\n".to_vec(),
        Some(name.to_string()),
        MimeType::parse(mime::PDF),
    )
}

pub fn text(name: &str, content: &str) -> Document {
    Document::new(
        content.as_bytes().to_vec(),
        Some(name.to_string()),
        MimeType::parse(mime::TEXT),
    )
}

/// General agenda eForm instance.
pub fn agenda_xml(name: &str) -> Document {
    Document::new(
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<GeneralAgenda xmlns=\"{FORM_NAMESPACE}\"><subject>Request</subject><text>Hello</text></GeneralAgenda>"
        )
        .into_bytes(),
        Some(name.to_string()),
        MimeType::parse(mime::XML),
    )
}

/// XML that no registry knows.
pub fn plain_xml(name: &str) -> Document {
    Document::new(
        br#"<note xmlns="urn:example:note"><to>Alice</to></note>"#.to_vec(),
        Some(name.to_string()),
        MimeType::parse(mime::XML),
    )
}

/// ASiC-E container with the given entries next to a `mimetype` entry.
pub fn asic_e(name: &str, entries: &[(&str, &[u8])]) -> Document {
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    writer.start_file("mimetype", stored).unwrap();
    writer.write_all(mime::ASIC_E.as_bytes()).unwrap();
    for (entry, content) in entries {
        writer.start_file(*entry, SimpleFileOptions::default()).unwrap();
        writer.write_all(content).unwrap();
    }
    let bytes = writer.finish().unwrap().into_inner();
    Document::new(bytes, Some(name.to_string()), MimeType::parse(mime::ASIC_E))
}
