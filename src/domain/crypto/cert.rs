use std::fmt;

use base64::Engine;
use chrono::{DateTime, Utc};
use der::Decode;
use x509_cert::Certificate;

use super::signature::{KeyAlgorithm, SignatureAlgorithm};
use crate::infra::error::{SigningError, SigningResult};

/// Parsed X.509 signing certificate together with its DER encoding.
#[derive(Clone)]
pub struct CertificateToken {
    der: Box<[u8]>,
    cert: Certificate,
}

impl CertificateToken {
    /// Parse a DER-encoded certificate.
    ///
    /// # Errors
    /// Returns `SigningError::Certificate` if the bytes are not a certificate.
    pub fn from_der(der: &[u8]) -> SigningResult<Self> {
        let cert = Certificate::from_der(der)?;
        Ok(Self {
            der: der.to_vec().into_boxed_slice(),
            cert,
        })
    }

    /// Parse a base64-encoded DER certificate.
    ///
    /// # Errors
    /// Returns `SigningError::Certificate` for bad base64 or DER.
    pub fn from_base64(encoded: &str) -> SigningResult<Self> {
        let der = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| SigningError::Certificate(format!("Invalid certificate encoding: {e}")))?;
        Self::from_der(&der)
    }

    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    #[must_use]
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.der)
    }

    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        &self.cert
    }

    /// Subject distinguished name (RFC 4514).
    #[must_use]
    pub fn subject(&self) -> String {
        self.cert.tbs_certificate.subject.to_string()
    }

    /// Issuer distinguished name (RFC 4514).
    #[must_use]
    pub fn issuer(&self) -> String {
        self.cert.tbs_certificate.issuer.to_string()
    }

    /// Serial number as lowercase hex.
    #[must_use]
    pub fn serial_number(&self) -> String {
        hex::encode(self.cert.tbs_certificate.serial_number.as_bytes())
    }

    #[must_use]
    pub fn not_before(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.cert.tbs_certificate.validity.not_before.to_system_time())
    }

    #[must_use]
    pub fn not_after(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.cert.tbs_certificate.validity.not_after.to_system_time())
    }

    /// Whether `at` falls inside the validity window.
    #[must_use]
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.not_before() <= at && at <= self.not_after()
    }

    #[must_use]
    pub fn is_self_signed(&self) -> bool {
        self.cert.tbs_certificate.subject == self.cert.tbs_certificate.issuer
    }

    /// Public key algorithm of the subject key.
    ///
    /// # Errors
    /// Returns `SigningError::Certificate` for key types that cannot sign.
    pub fn key_algorithm(&self) -> SigningResult<KeyAlgorithm> {
        let oid = self
            .cert
            .tbs_certificate
            .subject_public_key_info
            .algorithm
            .oid
            .to_string();
        KeyAlgorithm::from_oid(&oid)
            .ok_or_else(|| SigningError::Certificate(format!("Unsupported public key algorithm {oid}")))
    }

    /// Algorithm the issuer used to sign this certificate, when recognised.
    #[must_use]
    pub fn signature_algorithm(&self) -> Option<SignatureAlgorithm> {
        SignatureAlgorithm::from_oid(&self.cert.signature_algorithm.oid.to_string())
    }
}

impl PartialEq for CertificateToken {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for CertificateToken {}

impl fmt::Debug for CertificateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CertificateToken(subject={}, serial={}, len={})",
            self.subject(),
            self.serial_number(),
            self.der.len()
        )
    }
}
