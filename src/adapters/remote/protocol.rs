//! Protocol definitions for the remote signature backend.
//!
//! Defines the JSON messages exchanged with the backend hosting the
//! signature services, the signature validator and the XML engine.

use crate::domain::document::Document;
use crate::domain::mime::MimeType;
use crate::domain::validation::ExistingSignature;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::signature::SignatureParameters;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// API version for protocol compatibility checks.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Document carried in a backend message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPayload {
    /// Base64-encoded document bytes.
    pub content_b64: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl DocumentPayload {
    #[must_use]
    pub fn new(document: &Document) -> Self {
        Self {
            content_b64: base64::engine::general_purpose::STANDARD.encode(document.content()),
            mime_type: document.mime().to_string(),
            filename: document.filename().map(str::to_string),
        }
    }

    /// Decode back into a document.
    ///
    /// # Errors
    /// `Network` when the backend sent invalid base64.
    pub fn into_document(self) -> SigningResult<Document> {
        let content = decode_b64(&self.content_b64, "document")?;
        Ok(Document::new(
            content,
            self.filename,
            MimeType::parse(&self.mime_type),
        ))
    }
}

/// Canonicalization URIs for XML signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalizationPayload {
    pub signed_info: String,
    pub signed_properties: String,
    pub key_info: String,
}

/// Signature parameters as the backend expects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureParametersPayload {
    /// e.g. `XAdES_BASELINE_B`.
    pub level: String,
    pub digest_algorithm: String,
    pub en319132: bool,
    /// Base64 DER of the signing certificate.
    pub signing_certificate_b64: String,
    /// Milliseconds since the Unix epoch.
    pub signing_time_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packaging: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonicalization: Option<CanonicalizationPayload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timestamp_servers: Vec<String>,
}

impl From<&SignatureParameters> for SignatureParametersPayload {
    fn from(params: &SignatureParameters) -> Self {
        Self {
            level: params.level.to_string(),
            digest_algorithm: params.digest_algorithm.as_str().to_string(),
            en319132: params.en319132,
            signing_certificate_b64: params.signing_certificate.to_base64(),
            signing_time_ms: params.signing_time.timestamp_millis(),
            packaging: params.packaging.map(|p| p.as_str().to_string()),
            container: params.container.map(|c| c.as_str().to_string()),
            canonicalization: params.canonicalization.map(|c| CanonicalizationPayload {
                signed_info: c.signed_info.uri().to_string(),
                signed_properties: c.signed_properties.uri().to_string(),
                key_info: c.key_info.uri().to_string(),
            }),
            timestamp_servers: params
                .timestamp_source
                .as_ref()
                .map(|source| source.servers().iter().map(ToString::to_string).collect())
                .unwrap_or_default(),
        }
    }
}

/// Request to compute the data to sign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataToSignRequest {
    pub version: String,
    pub request_id: String,
    pub document: DocumentPayload,
    pub parameters: SignatureParametersPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataToSignResponse {
    pub version: String,
    /// Base64-encoded bytes to be signed.
    pub data_to_sign_b64: String,
}

/// Request to assemble a signed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignDocumentRequest {
    pub version: String,
    pub request_id: String,
    pub document: DocumentPayload,
    pub parameters: SignatureParametersPayload,
    /// e.g. `RSA_SHA256`.
    pub signature_algorithm: String,
    /// Base64-encoded signature value.
    pub signature_value_b64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignDocumentResponse {
    pub version: String,
    pub document: DocumentPayload,
}

/// Request carrying only a document (classify, report).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub version: String,
    pub request_id: String,
    pub document: DocumentPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub version: String,
    #[serde(default)]
    pub signature: Option<ExistingSignature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub version: String,
    #[serde(default)]
    pub report: Option<serde_json::Value>,
}

/// Request without payload (trusted list refresh).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmptyRequest {
    pub version: String,
    pub request_id: String,
}

/// Acknowledgement without payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub version: String,
}

/// Request to validate XML against a schema and transformation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XmlValidateRequest {
    pub version: String,
    pub request_id: String,
    pub document_b64: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformation: Option<String>,
}

/// Request to run a transformation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XmlTransformRequest {
    pub version: String,
    pub request_id: String,
    pub document_b64: String,
    pub transformation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XmlTransformResponse {
    pub version: String,
    pub output_b64: String,
}

/// Error response from the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Protocol version.
    pub version: String,
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Known error codes returned by the backend.
pub mod error_codes {
    /// Authentication failed (bad token).
    pub const AUTH_FAILED: &str = "AUTH_FAILED";
    /// Signature value does not verify against the certificate.
    pub const CRYPTO_VERIFICATION_FAILED: &str = "CRYPTO_VERIFICATION_FAILED";
    /// Timestamp authority unreachable or misconfigured.
    pub const TSA_FAILURE: &str = "TSA_FAILURE";
    /// Signing certificate outside its validity period.
    pub const CERTIFICATE_EXPIRED: &str = "CERTIFICATE_EXPIRED";
    /// Document does not conform to its schema.
    pub const XML_INVALID: &str = "XML_INVALID";
    /// Transformation could not be compiled or executed.
    pub const TRANSFORMATION_FAILED: &str = "TRANSFORMATION_FAILED";
    /// Protocol version mismatch.
    pub const VERSION_MISMATCH: &str = "VERSION_MISMATCH";
    /// Malformed request.
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    /// Unexpected backend failure.
    pub const INTERNAL: &str = "INTERNAL";
}

impl ErrorResponse {
    /// Create a new error response.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            error_code: code.into(),
            message: message.into(),
        }
    }
}

/// Random correlation id for backend logs.
#[must_use]
pub fn new_request_id() -> String {
    let mut bytes = [0u8; 8];
    rand::fill(&mut bytes);
    hex::encode(bytes)
}

/// Decode a base64 field of a backend response.
///
/// # Errors
/// `Network` for invalid base64.
pub fn decode_b64(encoded: &str, field: &str) -> SigningResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| SigningError::Network(format!("Backend sent invalid {field}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mime;

    #[test]
    fn test_document_payload_keeps_metadata() {
        let document = Document::new(
            b"%PDF-1.7".to_vec(),
            Some("a.pdf".into()),
            MimeType::parse(mime::PDF),
        );
        let payload = DocumentPayload::new(&document);
        assert_eq!(payload.content_b64, "JVBERi0xLjc=");
        assert_eq!(payload.into_document().unwrap(), document);
    }

    #[test]
    fn test_error_response_wire_format() {
        let json = serde_json::to_value(ErrorResponse::new(
            error_codes::TSA_FAILURE,
            "tsa.example unreachable",
        ))
        .unwrap();
        assert_eq!(json["version"], PROTOCOL_VERSION);
        assert_eq!(json["error_code"], "TSA_FAILURE");
    }

    #[test]
    fn test_request_ids_differ() {
        let a = new_request_id();
        assert_eq!(a.len(), 16);
        assert_ne!(a, new_request_id());
    }
}
