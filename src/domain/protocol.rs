//! Values exchanged between the two signing phases.

use super::crypto::CertificateToken;
use super::document::Document;
use serde::{Deserialize, Serialize};

/// Phase-one output, echoed back verbatim by the caller in phase two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataToSignStructure {
    /// Base64 of the bytes the caller must sign.
    pub data_to_sign: String,
    /// Signing time, milliseconds since the Unix epoch.
    pub signing_time: i64,
    /// Base64 DER of the signing certificate.
    pub signing_certificate: String,
}

/// Phase-two output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedDocumentResult {
    pub document: Document,
    pub certificate: CertificateToken,
}

impl SignedDocumentResult {
    /// Subject of the signing certificate.
    #[must_use]
    pub fn signed_by(&self) -> String {
        self.certificate.subject()
    }

    /// Issuer of the signing certificate.
    #[must_use]
    pub fn issued_by(&self) -> String {
        self.certificate.issuer()
    }
}
