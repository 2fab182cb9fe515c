//! Signature service boundary.
//!
//! The gateway never encodes signatures. It selects a [`ServiceKind`] for
//! the resolved level and container, builds format-specific
//! [`SignatureParameters`] and delegates to a [`SignatureService`].

use crate::domain::crypto::{CertificateToken, DigestAlgorithm, SignatureValue};
use crate::domain::document::Document;
use crate::domain::level::{
    CanonicalizationMethod, ContainerKind, Packaging, SignatureForm, SignatureLevel,
};
use crate::domain::params::ResolvedSigningParameters;
use crate::domain::types::TimestampSource;
use crate::infra::error::{SigningError, SigningResult};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Signature service implementations, one per format and container shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    XAdES,
    AsicXAdES,
    CAdES,
    AsicCAdES,
    PAdES,
    JAdES,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 6] = [
        ServiceKind::XAdES,
        ServiceKind::AsicXAdES,
        ServiceKind::CAdES,
        ServiceKind::AsicCAdES,
        ServiceKind::PAdES,
        ServiceKind::JAdES,
    ];

    /// Service for a signature form and optional container.
    ///
    /// # Errors
    /// `RequestValidation` for PAdES or JAdES inside a container.
    pub fn select(form: SignatureForm, container: Option<ContainerKind>) -> SigningResult<Self> {
        match (form, container) {
            (SignatureForm::XAdES, None) => Ok(ServiceKind::XAdES),
            (SignatureForm::XAdES, Some(_)) => Ok(ServiceKind::AsicXAdES),
            (SignatureForm::CAdES, None) => Ok(ServiceKind::CAdES),
            (SignatureForm::CAdES, Some(_)) => Ok(ServiceKind::AsicCAdES),
            (SignatureForm::PAdES, None) => Ok(ServiceKind::PAdES),
            (SignatureForm::JAdES, None) => Ok(ServiceKind::JAdES),
            (form, Some(container)) => Err(SigningError::request_validation(format!(
                "{form} signature cannot be placed in a {container} container"
            ))),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::XAdES => "xades",
            ServiceKind::AsicXAdES => "asic-xades",
            ServiceKind::CAdES => "cades",
            ServiceKind::AsicCAdES => "asic-cades",
            ServiceKind::PAdES => "pades",
            ServiceKind::JAdES => "jades",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonicalization methods used by XML signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlCanonicalization {
    pub signed_info: CanonicalizationMethod,
    pub signed_properties: CanonicalizationMethod,
    pub key_info: CanonicalizationMethod,
}

/// Format-specific parameters handed to a signature service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParameters {
    pub kind: ServiceKind,
    pub level: SignatureLevel,
    pub digest_algorithm: DigestAlgorithm,
    pub en319132: bool,
    pub signing_certificate: CertificateToken,
    pub signing_time: DateTime<Utc>,
    /// Set only for XAdES and CAdES.
    pub packaging: Option<Packaging>,
    /// Set only for ASiC services.
    pub container: Option<ContainerKind>,
    /// Set only for XAdES.
    pub canonicalization: Option<XmlCanonicalization>,
    /// Set only above baseline B.
    pub timestamp_source: Option<TimestampSource>,
}

impl SignatureParameters {
    /// Build parameters for `kind` from resolved parameters.
    #[must_use]
    pub fn for_kind(
        kind: ServiceKind,
        params: &ResolvedSigningParameters,
        signing_certificate: CertificateToken,
        signing_time: DateTime<Utc>,
    ) -> Self {
        let (packaging, container, canonicalization) = match kind {
            ServiceKind::XAdES => (
                Some(params.packaging),
                None,
                Some(XmlCanonicalization {
                    signed_info: params.info_canonicalization,
                    signed_properties: params.properties_canonicalization,
                    key_info: params.key_info_canonicalization,
                }),
            ),
            ServiceKind::CAdES => (Some(Packaging::Enveloping), None, None),
            ServiceKind::AsicXAdES | ServiceKind::AsicCAdES => (None, params.container, None),
            ServiceKind::PAdES | ServiceKind::JAdES => (None, None, None),
        };

        let timestamp_source = if params.level.tier.requires_timestamp() {
            params.timestamp_source.clone()
        } else {
            None
        };

        Self {
            kind,
            level: params.level,
            digest_algorithm: params.digest_algorithm,
            en319132: params.en319132,
            signing_certificate,
            signing_time,
            packaging,
            container,
            canonicalization,
            timestamp_source,
        }
    }
}

/// Failures reported by a signature service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Cryptographic signature verification has failed: {0}")]
    CryptographicVerification(String),
    #[error("Timestamp authority failure: {0}")]
    TimestampAuthority(String),
    #[error("Signing certificate is expired or not yet valid: {0}")]
    CertificateExpired(String),
    #[error("{0}")]
    Other(String),
}

impl From<ServiceError> for SigningError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::CryptographicVerification(msg) => {
                SigningError::CryptographicVerification(msg)
            }
            ServiceError::TimestampAuthority(msg) => SigningError::TsaMisconfigured(msg),
            ServiceError::CertificateExpired(msg) => SigningError::Certificate(msg),
            ServiceError::Other(msg) => SigningError::Unrecognized(msg),
        }
    }
}

/// Computes data to sign and assembles signed documents for one format.
pub trait SignatureService: Send + Sync {
    /// Bytes the caller has to sign. Must be deterministic for equal inputs.
    ///
    /// # Errors
    /// Service failures.
    fn data_to_sign(
        &self,
        document: &Document,
        parameters: &SignatureParameters,
    ) -> Result<Vec<u8>, ServiceError>;

    /// Embed `signature` and return the signed document.
    ///
    /// # Errors
    /// `CryptographicVerification` when the value does not verify against the
    /// signing certificate; other service failures.
    fn sign_document(
        &self,
        document: &Document,
        parameters: &SignatureParameters,
        signature: &SignatureValue,
    ) -> Result<Document, ServiceError>;
}

/// Lookup of signature services by kind.
pub trait SignatureServiceProvider: Send + Sync {
    fn service(&self, kind: ServiceKind) -> Option<Arc<dyn SignatureService>>;
}

/// Provider backed by an explicit map of services.
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    services: HashMap<ServiceKind, Arc<dyn SignatureService>>,
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_service(mut self, kind: ServiceKind, service: Arc<dyn SignatureService>) -> Self {
        self.services.insert(kind, service);
        self
    }
}

impl SignatureServiceProvider for ServiceRegistry {
    fn service(&self, kind: ServiceKind) -> Option<Arc<dyn SignatureService>> {
        self.services.get(&kind).cloned()
    }
}
