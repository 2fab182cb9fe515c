//! Remote signature backend client.
//!
//! [`RemoteBackend`] implements the signature service provider, the
//! signature validator and the XML engine against one HTTP backend. The
//! collaborator traits are synchronous; every call blocks the current thread
//! on the runtime handle the client was created with, so it must only be
//! called from blocking worker threads (`tokio::task::spawn_blocking`) or
//! from outside the runtime.

use super::protocol::{
    decode_b64, error_codes, new_request_id, AckResponse, ClassifyResponse, DataToSignRequest,
    DataToSignResponse, DocumentPayload, DocumentRequest, EmptyRequest, ErrorResponse,
    ReportResponse, SignDocumentRequest, SignDocumentResponse, SignatureParametersPayload,
    XmlTransformRequest, XmlTransformResponse, XmlValidateRequest, PROTOCOL_VERSION,
};
use crate::domain::crypto::SignatureValue;
use crate::domain::document::Document;
use crate::domain::validation::{ExistingSignature, ValidationReport};
use crate::infra::config::BackendConfig;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::signature::{
    ServiceError, ServiceKind, SignatureParameters, SignatureService, SignatureServiceProvider,
};
use crate::services::validation::SignatureValidator;
use crate::services::xml_engine::{XmlEngine, XmlValidationRequest};
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Configuration for connecting to the remote backend.
#[derive(Debug, Clone)]
pub struct RemoteBackendConfig {
    /// Base URL of the backend (e.g., `https://dss.example.com`).
    pub base_url: String,
    /// Bearer token for authentication.
    pub auth_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Whether to verify TLS certificates (should be true in production).
    pub verify_tls: bool,
}

impl RemoteBackendConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            timeout_secs: 30,
            verify_tls: true,
        }
    }

    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Disable TLS verification (for testing only!).
    #[must_use]
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }
}

impl From<&BackendConfig> for RemoteBackendConfig {
    fn from(config: &BackendConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            timeout_secs: config.timeout_secs,
            verify_tls: config.verify_tls,
        }
    }
}

/// HTTP client for the signature backend.
#[derive(Clone)]
pub struct RemoteBackend {
    config: RemoteBackendConfig,
    client: reqwest::Client,
    runtime: Handle,
}

impl RemoteBackend {
    /// Create a new backend client driven by `runtime`.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(config: RemoteBackendConfig, runtime: Handle) -> SigningResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| SigningError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            runtime,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RemoteBackendConfig {
        &self.config
    }

    fn post<Req, Resp>(&self, path: &str, request: &Req) -> SigningResult<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{path}", self.config.base_url);
        log::debug!("POST {url}");
        self.runtime.block_on(async {
            let mut builder = self
                .client
                .post(&url)
                .header("Content-Type", "application/json")
                .json(request);
            if let Some(token) = &self.config.auth_token {
                builder = builder.header("Authorization", format!("Bearer {token}"));
            }
            let response = builder.send().await.map_err(|e| {
                SigningError::Network(format!("Failed to connect to backend: {e}"))
            })?;
            Self::handle_response(response).await
        })
    }

    /// Handle HTTP response and parse JSON body.
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> SigningResult<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| SigningError::Network(format!("Failed to parse response: {e}")))
        } else {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_text) {
                Err(Self::map_error_code(&error_response))
            } else {
                Err(SigningError::Network(format!(
                    "Backend error {status}: {error_text}"
                )))
            }
        }
    }

    /// Map error codes to appropriate `SigningError` variants.
    fn map_error_code(error: &ErrorResponse) -> SigningError {
        match error.error_code.as_str() {
            error_codes::AUTH_FAILED => SigningError::Configuration(format!(
                "Backend authentication failed: {}",
                error.message
            )),
            error_codes::CRYPTO_VERIFICATION_FAILED => {
                SigningError::CryptographicVerification(error.message.clone())
            }
            error_codes::TSA_FAILURE => SigningError::TsaMisconfigured(error.message.clone()),
            error_codes::CERTIFICATE_EXPIRED => SigningError::Certificate(error.message.clone()),
            error_codes::XML_INVALID => {
                SigningError::eform_with("Document does not conform to its schema", &error.message)
            }
            error_codes::TRANSFORMATION_FAILED => {
                SigningError::Transformation(error.message.clone())
            }
            error_codes::BAD_REQUEST | error_codes::VERSION_MISMATCH => {
                SigningError::request_validation_with("Backend rejected the request", &error.message)
            }
            _ => SigningError::Unrecognized(format!(
                "Backend error [{}]: {}",
                error.error_code, error.message
            )),
        }
    }
}

/// Failures of signature endpoints as reported to the signing protocol.
fn to_service_error(error: SigningError) -> ServiceError {
    match error {
        SigningError::CryptographicVerification(msg) => ServiceError::CryptographicVerification(msg),
        SigningError::TsaMisconfigured(msg) => ServiceError::TimestampAuthority(msg),
        SigningError::Certificate(msg) => ServiceError::CertificateExpired(msg),
        other => ServiceError::Other(other.to_string()),
    }
}

/// One remote signature service.
pub struct RemoteSignatureService {
    backend: RemoteBackend,
    kind: ServiceKind,
}

impl RemoteSignatureService {
    fn path(&self, operation: &str) -> String {
        format!("/api/v1/signature/{}/{operation}", self.kind)
    }
}

impl SignatureService for RemoteSignatureService {
    fn data_to_sign(
        &self,
        document: &Document,
        parameters: &SignatureParameters,
    ) -> Result<Vec<u8>, ServiceError> {
        let request = DataToSignRequest {
            version: PROTOCOL_VERSION.to_string(),
            request_id: new_request_id(),
            document: DocumentPayload::new(document),
            parameters: SignatureParametersPayload::from(parameters),
        };
        let response: DataToSignResponse = self
            .backend
            .post(&self.path("datatosign"), &request)
            .map_err(to_service_error)?;
        decode_b64(&response.data_to_sign_b64, "data to sign").map_err(to_service_error)
    }

    fn sign_document(
        &self,
        document: &Document,
        parameters: &SignatureParameters,
        signature: &SignatureValue,
    ) -> Result<Document, ServiceError> {
        let request = SignDocumentRequest {
            version: PROTOCOL_VERSION.to_string(),
            request_id: new_request_id(),
            document: DocumentPayload::new(document),
            parameters: SignatureParametersPayload::from(parameters),
            signature_algorithm: signature.algorithm().name(),
            signature_value_b64: base64::engine::general_purpose::STANDARD
                .encode(signature.as_slice()),
        };
        let response: SignDocumentResponse = self
            .backend
            .post(&self.path("sign"), &request)
            .map_err(to_service_error)?;
        response.document.into_document().map_err(to_service_error)
    }
}

impl SignatureServiceProvider for RemoteBackend {
    fn service(&self, kind: ServiceKind) -> Option<Arc<dyn SignatureService>> {
        Some(Arc::new(RemoteSignatureService {
            backend: self.clone(),
            kind,
        }))
    }
}

impl SignatureValidator for RemoteBackend {
    fn refresh(&self) -> SigningResult<()> {
        let request = EmptyRequest {
            version: PROTOCOL_VERSION.to_string(),
            request_id: new_request_id(),
        };
        let _: AckResponse = self.post("/api/v1/validation/refresh", &request)?;
        Ok(())
    }

    fn classify_existing_signature(
        &self,
        document: &Document,
    ) -> SigningResult<Option<ExistingSignature>> {
        let request = DocumentRequest {
            version: PROTOCOL_VERSION.to_string(),
            request_id: new_request_id(),
            document: DocumentPayload::new(document),
        };
        let response: ClassifyResponse = self.post("/api/v1/validation/classify", &request)?;
        Ok(response.signature)
    }

    fn validate_report(&self, document: &Document) -> SigningResult<Option<ValidationReport>> {
        let request = DocumentRequest {
            version: PROTOCOL_VERSION.to_string(),
            request_id: new_request_id(),
            document: DocumentPayload::new(document),
        };
        let response: ReportResponse = self.post("/api/v1/validation/report", &request)?;
        Ok(response.report.map(ValidationReport))
    }
}

impl XmlEngine for RemoteBackend {
    fn validate(&self, request: &XmlValidationRequest<'_>) -> SigningResult<()> {
        let body = XmlValidateRequest {
            version: PROTOCOL_VERSION.to_string(),
            request_id: new_request_id(),
            document_b64: base64::engine::general_purpose::STANDARD.encode(request.document),
            schema: request.schema.map(str::to_string),
            transformation: request.transformation.map(str::to_string),
        };
        let _: AckResponse = self.post("/api/v1/xml/validate", &body)?;
        Ok(())
    }

    fn transform(&self, document: &[u8], transformation: &str) -> SigningResult<Vec<u8>> {
        let body = XmlTransformRequest {
            version: PROTOCOL_VERSION.to_string(),
            request_id: new_request_id(),
            document_b64: base64::engine::general_purpose::STANDARD.encode(document),
            transformation: transformation.to_string(),
        };
        let response: XmlTransformResponse = self.post("/api/v1/xml/transform", &body)?;
        decode_b64(&response.output_b64, "transformation output")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = RemoteBackendConfig::new("https://dss.example.com")
            .with_auth_token("secret-token")
            .with_timeout(60)
            .with_insecure_tls();

        assert_eq!(config.base_url, "https://dss.example.com");
        assert_eq!(config.auth_token.as_deref(), Some("secret-token"));
        assert_eq!(config.timeout_secs, 60);
        assert!(!config.verify_tls);
    }

    #[test]
    fn test_config_from_file_settings_trims_slash() {
        let file = BackendConfig {
            base_url: "http://localhost:8090/".into(),
            ..BackendConfig::default()
        };
        assert_eq!(RemoteBackendConfig::from(&file).base_url, "http://localhost:8090");
    }

    #[test]
    fn test_error_code_mapping() {
        let cases = [
            (error_codes::CRYPTO_VERIFICATION_FAILED, "SIGNATURE_NOT_IN_TACT"),
            (error_codes::TSA_FAILURE, "TSA_SERVER_MISCONFIGURED"),
            (error_codes::CERTIFICATE_EXPIRED, "INVALID_CERTIFICATE"),
            (error_codes::XML_INVALID, "UNPROCESSABLE_INPUT"),
            (error_codes::TRANSFORMATION_FAILED, "UNPROCESSABLE_INPUT"),
            (error_codes::BAD_REQUEST, "UNPROCESSABLE_INPUT"),
            (error_codes::AUTH_FAILED, "INTERNAL_ERROR"),
            ("SOMETHING_NEW", "UNRECOGNIZED_DSS_ERROR"),
        ];
        for (backend_code, gateway_code) in cases {
            let error = RemoteBackend::map_error_code(&ErrorResponse::new(backend_code, "x"));
            assert_eq!(error.error_code(), gateway_code, "{backend_code}");
        }
    }

    #[test]
    fn test_service_error_translation() {
        assert!(matches!(
            to_service_error(SigningError::TsaMisconfigured("x".into())),
            ServiceError::TimestampAuthority(_)
        ));
        assert!(matches!(
            to_service_error(SigningError::Network("down".into())),
            ServiceError::Other(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unreachable_backend_is_network_error() {
        let backend = RemoteBackend::new(
            RemoteBackendConfig::new("http://127.0.0.1:9").with_timeout(2),
            Handle::current(),
        )
        .unwrap();
        let result = tokio::task::spawn_blocking(move || backend.refresh())
            .await
            .unwrap();
        assert!(matches!(result, Err(SigningError::Network(_))));
    }
}
