//! Signing certificate checks.
//!
//! Path and trust validation belong to the external validator; this module
//! only rejects certificates that cannot produce a valid signature at the
//! signing time and reports usage warnings.

use crate::domain::crypto::CertificateToken;
use crate::infra::error::{SigningError, SigningResult};
use chrono::{DateTime, Utc};
use der::Decode;
use x509_cert::ext::pkix::KeyUsage;

const KEY_USAGE_OID: &str = "2.5.29.15";
const EXPIRY_WARNING_DAYS: i64 = 30;

#[derive(Debug, Clone)]
pub struct CertificateAnalysis {
    pub days_until_expiry: i64,
    pub valid_at_signing_time: bool,
    pub can_sign: bool,
    pub is_self_signed: bool,
    pub warnings: Vec<String>,
    pub subject: String,
    pub issuer: String,
    pub serial_number: String,
}

pub struct CertificateValidator;

impl CertificateValidator {
    /// Inspect a signing certificate as of `at`.
    #[must_use]
    pub fn analyze(certificate: &CertificateToken, at: DateTime<Utc>) -> CertificateAnalysis {
        let mut analysis = CertificateAnalysis {
            days_until_expiry: (certificate.not_after() - at).num_days(),
            valid_at_signing_time: certificate.is_valid_at(at),
            can_sign: Self::allows_signing(certificate),
            is_self_signed: certificate.is_self_signed(),
            warnings: Vec::new(),
            subject: certificate.subject(),
            issuer: certificate.issuer(),
            serial_number: certificate.serial_number(),
        };

        log::debug!("Certificate subject: {}", analysis.subject);
        log::debug!("Certificate issuer: {}", analysis.issuer);

        if !analysis.valid_at_signing_time {
            analysis.warnings.push(format!(
                "Certificate is not valid at {at} (valid {} to {})",
                certificate.not_before(),
                certificate.not_after()
            ));
        } else if analysis.days_until_expiry < EXPIRY_WARNING_DAYS {
            analysis.warnings.push(format!(
                "Certificate expires in {} days",
                analysis.days_until_expiry
            ));
        }
        if !analysis.can_sign {
            analysis
                .warnings
                .push("Certificate key usage allows neither digitalSignature nor nonRepudiation".to_string());
        }
        if analysis.is_self_signed {
            analysis
                .warnings
                .push("Certificate is self-signed".to_string());
        }

        analysis
    }

    /// Reject certificates whose validity window excludes the signing time.
    ///
    /// # Errors
    /// `SigningError::Certificate`.
    pub fn ensure_valid_at(
        certificate: &CertificateToken,
        at: DateTime<Utc>,
    ) -> SigningResult<CertificateAnalysis> {
        let analysis = Self::analyze(certificate, at);
        for warning in &analysis.warnings {
            log::warn!("  - {warning}");
        }
        if !analysis.valid_at_signing_time {
            return Err(SigningError::Certificate(format!(
                "Signing certificate {} is not valid at signing time {at}",
                analysis.subject
            )));
        }
        Ok(analysis)
    }

    /// Key usage permits signatures. Certificates without the extension are
    /// unrestricted.
    fn allows_signing(certificate: &CertificateToken) -> bool {
        let extensions = certificate
            .certificate()
            .tbs_certificate
            .extensions
            .as_deref()
            .unwrap_or_default();
        let Some(ext) = extensions
            .iter()
            .find(|ext| ext.extn_id.to_string() == KEY_USAGE_OID)
        else {
            return true;
        };
        match KeyUsage::from_der(ext.extn_value.as_bytes()) {
            Ok(usage) => usage.digital_signature() || usage.non_repudiation(),
            Err(e) => {
                log::warn!("Unreadable key usage extension: {e}");
                false
            }
        }
    }
}
