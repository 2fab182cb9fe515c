//! JSON bodies of the gateway HTTP API.

use crate::domain::document::Document;
use crate::domain::mime::MimeType;
use crate::domain::params::CallerParameters;
use crate::domain::protocol::{DataToSignStructure, SignedDocumentResult};
use crate::infra::error::{SigningError, SigningResult};
use crate::pipelines::gateway::SigningRequest;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Document as sent by a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Document, parameters and payload type; shared by every signing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequestBody {
    #[serde(default)]
    pub document: Option<DocumentBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<CallerParameters>,
    #[serde(default)]
    pub payload_mime_type: Option<String>,
}

impl SignRequestBody {
    /// Whether document, schema and transformation are base64 encoded.
    #[must_use]
    pub fn is_base64(&self) -> bool {
        self.payload_mime_type
            .as_deref()
            .is_some_and(|m| m.contains("base64"))
    }

    /// Decode into a gateway request.
    ///
    /// # Errors
    /// `RequestValidation` for missing fields, `MalformedBody` for content
    /// that is not valid base64.
    pub fn into_request(self) -> SigningResult<SigningRequest> {
        let base64 = self.is_base64();
        let payload_mime_type = self
            .payload_mime_type
            .ok_or_else(|| SigningError::request_validation("PayloadMimeType is required"))?;
        let document = self
            .document
            .ok_or_else(|| SigningError::request_validation("Document is required"))?;
        let content = document
            .content
            .ok_or_else(|| SigningError::request_validation("Document.Content is required"))?;

        let content = if base64 {
            decode(&content, "Invalid document content")?
        } else {
            content.into_bytes()
        };
        let essence = payload_mime_type.split(';').next().unwrap_or_default();

        let mut parameters = self.parameters.unwrap_or_default();
        if base64 {
            parameters.schema = parameters
                .schema
                .map(|s| decode_text(&s, "Invalid schema"))
                .transpose()?;
            parameters.transformation = parameters
                .transformation
                .map(|t| decode_text(&t, "Invalid transformation"))
                .transpose()?;
        }

        Ok(SigningRequest::new(
            Document::new(content, document.filename, MimeType::parse(essence)),
            parameters,
        ))
    }
}

fn decode(encoded: &str, details: &str) -> SigningResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| SigningError::MalformedBody(format!("Base64 decoding failed: {details}: {e}")))
}

fn decode_text(encoded: &str, details: &str) -> SigningResult<String> {
    String::from_utf8(decode(encoded, details)?)
        .map_err(|_| SigningError::MalformedBody(format!("{details}: not UTF-8")))
}

/// `POST /datatosign` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataToSignRequestBody {
    pub original_sign_request_body: SignRequestBody,
    /// Base64 DER of the signing certificate.
    pub signing_certificate: String,
}

/// `POST /sign` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSignatureRequestBody {
    pub original_sign_request_body: SignRequestBody,
    pub data_to_sign_structure: DataToSignStructure,
    /// Base64 signature value over the data to sign.
    pub signed_data: String,
}

impl BuildSignatureRequestBody {
    /// # Errors
    /// `MalformedBody` for invalid base64.
    pub fn signature_value(&self) -> SigningResult<Vec<u8>> {
        decode(&self.signed_data, "Invalid signed data")
    }
}

/// `POST /validation` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRequestBody {
    /// Base64 of the signed document.
    pub content: String,
    #[serde(default)]
    pub filename: Option<String>,
}

impl ValidationRequestBody {
    /// # Errors
    /// `MalformedBody` for invalid base64.
    pub fn into_document(self) -> SigningResult<Document> {
        let content = decode(&self.content, "Invalid document content")?;
        let mime = self
            .filename
            .as_deref()
            .map_or_else(|| MimeType::parse(crate::domain::mime::OCTET_STREAM), MimeType::from_filename);
        Ok(Document::new(content, self.filename, mime))
    }
}

/// Document returned to a caller; content is always base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub content: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl From<&Document> for DocumentResponse {
    fn from(document: &Document) -> Self {
        Self {
            content: base64::engine::general_purpose::STANDARD.encode(document.content()),
            mime_type: document.mime().to_string(),
            filename: document.filename().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signer {
    pub signed_by: String,
    pub issued_by: String,
}

/// `POST /sign` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignResponse {
    pub document: DocumentResponse,
    pub signer: Signer,
}

impl From<&SignedDocumentResult> for SignResponse {
    fn from(result: &SignedDocumentResult) -> Self {
        let mut document = DocumentResponse::from(&result.document);
        document.mime_type.push_str(";base64");
        Self {
            document,
            signer: Signer {
                signed_by: result.signed_by(),
                issued_by: result.issued_by(),
            },
        }
    }
}

/// Server status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub trust_list_ready: bool,
}

/// Error body; `code` is one of `crate::infra::error::codes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }
}

impl From<&SigningError> for ErrorResponse {
    fn from(error: &SigningError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
            details: error.details().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mime::MimeKind;

    #[test]
    fn test_plain_request_body() {
        let body: SignRequestBody = serde_json::from_str(
            r#"{
                "document": {"filename": "hello.txt", "content": "hello"},
                "parameters": {"level": "CAdES_BASELINE_B"},
                "payloadMimeType": "text/plain"
            }"#,
        )
        .unwrap();
        let request = body.into_request().unwrap();
        assert_eq!(request.document.content(), b"hello");
        assert_eq!(request.document.declared_kind(), MimeKind::Text);
        assert_eq!(request.parameters.level.as_deref(), Some("CAdES_BASELINE_B"));
    }

    #[test]
    fn test_base64_request_decodes_schema_and_transformation() {
        let b64 = |s: &str| base64::engine::general_purpose::STANDARD.encode(s);
        let json = serde_json::json!({
            "document": {"content": b64("<a/>")},
            "parameters": {
                "level": "XAdES_BASELINE_B",
                "schema": b64("<xs:schema/>"),
                "transformation": b64("<xsl:stylesheet/>")
            },
            "payloadMimeType": "application/xml;base64"
        });
        let body: SignRequestBody = serde_json::from_value(json).unwrap();
        let request = body.into_request().unwrap();
        assert_eq!(request.document.content(), b"<a/>");
        assert_eq!(request.document.declared_kind(), MimeKind::Xml);
        assert_eq!(request.parameters.schema.as_deref(), Some("<xs:schema/>"));
        assert_eq!(
            request.parameters.transformation.as_deref(),
            Some("<xsl:stylesheet/>")
        );
    }

    #[test]
    fn test_missing_fields() {
        let err = SignRequestBody::default().into_request().unwrap_err();
        assert_eq!(err.to_string(), "PayloadMimeType is required");

        let body = SignRequestBody {
            payload_mime_type: Some("application/pdf;base64".into()),
            document: Some(DocumentBody {
                filename: None,
                content: Some("%%%".into()),
            }),
            parameters: None,
        };
        assert!(matches!(
            body.into_request().unwrap_err(),
            SigningError::MalformedBody(_)
        ));
    }

    #[test]
    fn test_error_response_from_error() {
        let error = SigningError::request_validation_with("Invalid eForm", "missing identifier");
        let response = ErrorResponse::from(&error);
        assert_eq!(response.code, "UNPROCESSABLE_INPUT");
        assert_eq!(response.details.as_deref(), Some("missing identifier"));
    }
}
