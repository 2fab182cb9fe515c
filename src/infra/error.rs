//! Error types for signing gateway operations.
//!
//! Every failure the gateway can report is a variant of [`SigningError`].
//! Each variant carries a stable machine-readable code and an HTTP status,
//! and both are derived by exhaustive matching so a new variant cannot be
//! added without deciding how it is reported.

use thiserror::Error;

/// Result type for signing operations
pub type SigningResult<T> = Result<T, SigningError>;

/// Stable error codes exposed in error bodies.
pub mod codes {
    pub const UNPROCESSABLE_INPUT: &str = "UNPROCESSABLE_INPUT";
    pub const UNSUPPORTED_SIGNATURE_LEVEL: &str = "UNSUPPORTED_SIGNATURE_LEVEL";
    pub const UNKNOWN_EFORM: &str = "UNKNOWN_EFORM";
    pub const ORIGINAL_DOCUMENT_NOT_FOUND: &str = "ORIGINAL_DOCUMENT_NOT_FOUND";
    pub const MULTIPLE_ORIGINAL_DOCUMENTS: &str = "MULTIPLE_ORIGINAL_DOCUMENTS";
    pub const DOCUMENT_NOT_SIGNED: &str = "DOCUMENT_NOT_SIGNED";
    pub const DATATOSIGN_MISMATCH: &str = "DATATOSIGN_MISMATCH";
    pub const SIGNATURE_NOT_IN_TACT: &str = "SIGNATURE_NOT_IN_TACT";
    pub const INVALID_CERTIFICATE: &str = "INVALID_CERTIFICATE";
    pub const MALFORMED_INPUT: &str = "MALFORMED_INPUT";
    pub const EMPTY_BODY: &str = "EMPTY_BODY";
    pub const TSA_SERVER_MISCONFIGURED: &str = "TSA_SERVER_MISCONFIGURED";
    pub const UNRECOGNIZED_DSS_ERROR: &str = "UNRECOGNIZED_DSS_ERROR";
    pub const VALIDATOR_NOT_READY: &str = "VALIDATOR_NOT_READY";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Comprehensive error types for signing operations
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SigningError {
    #[error("{message}")]
    RequestValidation {
        message: String,
        details: Option<String>,
    },

    #[error("Unsupported signature level: {0}")]
    UnsupportedSignatureLevel(String),

    #[error("{message}")]
    EForm {
        message: String,
        details: Option<String>,
    },

    #[error("Unknown eForm: {0}")]
    UnknownEForm(String),

    #[error("Transformation error: {0}")]
    Transformation(String),

    #[error("Original document not found in container")]
    OriginalDocumentNotFound,

    #[error("Container holds more than one original document")]
    MultipleOriginalDocuments,

    #[error("Document is not signed yet")]
    DocumentNotSignedYet,

    #[error("Data to sign does not match the supplied signing structure")]
    DataToSignMismatch,

    #[error("Cryptographic signature verification has failed: {0}")]
    CryptographicVerification(String),

    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Request body is empty")]
    EmptyBody,

    #[error("Timestamp authority failure: {0}")]
    TsaMisconfigured(String),

    #[error("Unrecognized signature service error: {0}")]
    Unrecognized(String),

    #[error("Signature validator is not ready: {0}")]
    ValidatorNotReady(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl SigningError {
    /// Request validation failure without details.
    pub fn request_validation(message: impl Into<String>) -> Self {
        SigningError::RequestValidation {
            message: message.into(),
            details: None,
        }
    }

    /// Request validation failure with a details line.
    pub fn request_validation_with(message: impl Into<String>, details: impl Into<String>) -> Self {
        SigningError::RequestValidation {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// eForm resolution or validation failure.
    pub fn eform(message: impl Into<String>) -> Self {
        SigningError::EForm {
            message: message.into(),
            details: None,
        }
    }

    /// eForm failure with a details line.
    pub fn eform_with(message: impl Into<String>, details: impl Into<String>) -> Self {
        SigningError::EForm {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// HTTP status used when this error is reported to a caller.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            SigningError::RequestValidation { .. }
            | SigningError::UnsupportedSignatureLevel(_)
            | SigningError::EForm { .. }
            | SigningError::UnknownEForm(_)
            | SigningError::Transformation(_)
            | SigningError::OriginalDocumentNotFound
            | SigningError::MultipleOriginalDocuments
            | SigningError::DocumentNotSignedYet
            | SigningError::Certificate(_) => 422,
            SigningError::DataToSignMismatch
            | SigningError::CryptographicVerification(_)
            | SigningError::MalformedBody(_)
            | SigningError::EmptyBody => 400,
            SigningError::TsaMisconfigured(_) | SigningError::Unrecognized(_) => 502,
            SigningError::ValidatorNotReady(_) => 503,
            SigningError::Configuration(_) | SigningError::Io(_) | SigningError::Network(_) => 500,
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            SigningError::RequestValidation { .. }
            | SigningError::EForm { .. }
            | SigningError::Transformation(_) => codes::UNPROCESSABLE_INPUT,
            SigningError::UnsupportedSignatureLevel(_) => codes::UNSUPPORTED_SIGNATURE_LEVEL,
            SigningError::UnknownEForm(_) => codes::UNKNOWN_EFORM,
            SigningError::OriginalDocumentNotFound => codes::ORIGINAL_DOCUMENT_NOT_FOUND,
            SigningError::MultipleOriginalDocuments => codes::MULTIPLE_ORIGINAL_DOCUMENTS,
            SigningError::DocumentNotSignedYet => codes::DOCUMENT_NOT_SIGNED,
            SigningError::DataToSignMismatch => codes::DATATOSIGN_MISMATCH,
            SigningError::CryptographicVerification(_) => codes::SIGNATURE_NOT_IN_TACT,
            SigningError::Certificate(_) => codes::INVALID_CERTIFICATE,
            SigningError::MalformedBody(_) => codes::MALFORMED_INPUT,
            SigningError::EmptyBody => codes::EMPTY_BODY,
            SigningError::TsaMisconfigured(_) => codes::TSA_SERVER_MISCONFIGURED,
            SigningError::Unrecognized(_) => codes::UNRECOGNIZED_DSS_ERROR,
            SigningError::ValidatorNotReady(_) => codes::VALIDATOR_NOT_READY,
            SigningError::Configuration(_) | SigningError::Io(_) | SigningError::Network(_) => {
                codes::INTERNAL_ERROR
            }
        }
    }

    /// Optional details line for the error body.
    #[must_use]
    pub fn details(&self) -> Option<&str> {
        match self {
            SigningError::RequestValidation { details, .. } | SigningError::EForm { details, .. } => {
                details.as_deref()
            }
            _ => None,
        }
    }
}

impl From<der::Error> for SigningError {
    fn from(error: der::Error) -> Self {
        SigningError::Certificate(format!("Unable to decode certificate: {error}"))
    }
}

impl From<reqwest::Error> for SigningError {
    fn from(error: reqwest::Error) -> Self {
        SigningError::Network(error.to_string())
    }
}

impl From<base64::DecodeError> for SigningError {
    fn from(error: base64::DecodeError) -> Self {
        SigningError::MalformedBody(format!("Invalid base64 content: {error}"))
    }
}

impl From<serde_json::Error> for SigningError {
    fn from(error: serde_json::Error) -> Self {
        SigningError::MalformedBody(error.to_string())
    }
}

impl From<std::io::Error> for SigningError {
    fn from(error: std::io::Error) -> Self {
        SigningError::Io(error.to_string())
    }
}
