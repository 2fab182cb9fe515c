//! Two-phase signing protocol.
//!
//! Phase one computes the bytes an external signer must sign and returns
//! them with the signing time and certificate in a [`DataToSignStructure`].
//! Phase two receives that structure back with the signature value,
//! recomputes the data to sign from the echoed time and certificate, and only
//! if it matches asks the signature service to assemble the signed document.
//!
//! No state is kept between phases; each phase may run on a fresh
//! [`SigningJob`] built from the same request.

use crate::domain::crypto::{CertificateToken, SignatureAlgorithm, SignatureValue};
use crate::domain::document::Document;
use crate::domain::params::ResolvedSigningParameters;
use crate::domain::protocol::{DataToSignStructure, SignedDocumentResult};
use crate::infra::error::{SigningError, SigningResult};
use crate::services::cert_validator::CertificateValidator;
use crate::services::container::ContainerTransformer;
use crate::services::signature::{
    ServiceKind, SignatureParameters, SignatureService, SignatureServiceProvider,
};
use base64::Engine;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Lifecycle of a signing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Built,
    DataToSignComputed,
    Signed,
    Failed,
}

impl JobState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Signed | JobState::Failed)
    }
}

pub struct SigningJob {
    document: Document,
    parameters: ResolvedSigningParameters,
    state: JobState,
}

impl SigningJob {
    /// Build a job, wrapping the document into a container when required.
    ///
    /// # Errors
    /// `TsaMisconfigured` when the level needs a timestamp and no timestamp
    /// source is bound; container construction failures.
    pub fn build(document: &Document, parameters: ResolvedSigningParameters) -> SigningResult<Self> {
        if parameters.level.tier.requires_timestamp() && parameters.timestamp_source.is_none() {
            return Err(SigningError::TsaMisconfigured(format!(
                "{} requires a timestamp server but none is configured",
                parameters.level
            )));
        }
        let document = ContainerTransformer::wrap(document, &parameters)?;
        Ok(Self {
            document,
            parameters,
            state: JobState::Built,
        })
    }

    #[must_use]
    pub fn state(&self) -> JobState {
        self.state
    }

    /// The document that is signed (after wrapping).
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn parameters(&self) -> &ResolvedSigningParameters {
        &self.parameters
    }

    /// Phase one. The signing time is the current time truncated to
    /// milliseconds.
    ///
    /// # Errors
    /// Invalid certificate, missing service or service failures.
    pub fn compute_data_to_sign(
        &mut self,
        services: &dyn SignatureServiceProvider,
        certificate: &CertificateToken,
    ) -> SigningResult<DataToSignStructure> {
        let now = Utc::now();
        let signing_time = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
        self.compute_data_to_sign_at(services, certificate, signing_time)
    }

    fn compute_data_to_sign_at(
        &mut self,
        services: &dyn SignatureServiceProvider,
        certificate: &CertificateToken,
        signing_time: DateTime<Utc>,
    ) -> SigningResult<DataToSignStructure> {
        self.ensure_active()?;
        let result = self.data_to_sign_inner(services, certificate, signing_time);
        self.state = match &result {
            Ok(_) => JobState::DataToSignComputed,
            Err(_) => JobState::Failed,
        };
        result
    }

    fn data_to_sign_inner(
        &self,
        services: &dyn SignatureServiceProvider,
        certificate: &CertificateToken,
        signing_time: DateTime<Utc>,
    ) -> SigningResult<DataToSignStructure> {
        CertificateValidator::ensure_valid_at(certificate, signing_time)?;
        let (service, parameters) =
            self.service_parameters(services, certificate.clone(), signing_time)?;

        log::info!(
            "Computing data to sign: service={}, level={}, document={:?}",
            parameters.kind,
            parameters.level,
            self.document.filename()
        );
        let data_to_sign = service.data_to_sign(&self.document, &parameters)?;

        Ok(DataToSignStructure {
            data_to_sign: base64::engine::general_purpose::STANDARD.encode(&data_to_sign),
            signing_time: signing_time.timestamp_millis(),
            signing_certificate: certificate.to_base64(),
        })
    }

    /// Phase two. Uses the signing time and certificate echoed in
    /// `structure`, never the current time.
    ///
    /// # Errors
    /// `DataToSignMismatch` when the recomputed data differs from the echoed
    /// data, `CryptographicVerification` when the signature value does not
    /// verify, and certificate or service failures.
    pub fn finalize(
        &mut self,
        services: &dyn SignatureServiceProvider,
        structure: DataToSignStructure,
        signature: &[u8],
    ) -> SigningResult<SignedDocumentResult> {
        self.ensure_active()?;
        let result = self.finalize_inner(services, structure, signature);
        self.state = match &result {
            Ok(_) => JobState::Signed,
            Err(_) => JobState::Failed,
        };
        result
    }

    fn finalize_inner(
        &self,
        services: &dyn SignatureServiceProvider,
        structure: DataToSignStructure,
        signature: &[u8],
    ) -> SigningResult<SignedDocumentResult> {
        let certificate = CertificateToken::from_base64(&structure.signing_certificate)?;
        let signing_time = DateTime::from_timestamp_millis(structure.signing_time).ok_or_else(|| {
            SigningError::request_validation_with(
                "Invalid signing time",
                structure.signing_time.to_string(),
            )
        })?;
        CertificateValidator::ensure_valid_at(&certificate, signing_time)?;

        let (service, parameters) =
            self.service_parameters(services, certificate.clone(), signing_time)?;
        let expected = service.data_to_sign(&self.document, &parameters)?;
        let expected = base64::engine::general_purpose::STANDARD.encode(&expected);
        if expected != structure.data_to_sign {
            log::warn!(
                "Data to sign mismatch for {:?} (signing time {})",
                self.document.filename(),
                structure.signing_time
            );
            return Err(SigningError::DataToSignMismatch);
        }

        let algorithm =
            SignatureAlgorithm::new(certificate.key_algorithm()?, self.parameters.digest_algorithm);
        let value = SignatureValue::new(algorithm, signature.to_vec());
        let signed = service.sign_document(&self.document, &parameters, &value)?;

        let filename = self.pretty_name(&signed);
        log::info!(
            "Signed {:?} as {filename} with {algorithm}",
            self.document.filename()
        );
        Ok(SignedDocumentResult {
            document: signed.renamed(filename),
            certificate,
        })
    }

    fn ensure_active(&self) -> SigningResult<()> {
        if self.state.is_terminal() {
            return Err(SigningError::request_validation(format!(
                "Signing job is already {:?}",
                self.state
            )));
        }
        Ok(())
    }

    fn service_parameters(
        &self,
        services: &dyn SignatureServiceProvider,
        certificate: CertificateToken,
        signing_time: DateTime<Utc>,
    ) -> SigningResult<(Arc<dyn SignatureService>, SignatureParameters)> {
        let kind = ServiceKind::select(self.parameters.level.form, self.parameters.container)?;
        let service = services.service(kind).ok_or_else(|| {
            SigningError::Unrecognized(format!("No signature service configured for {kind}"))
        })?;
        let parameters =
            SignatureParameters::for_kind(kind, &self.parameters, certificate, signing_time);
        Ok((service, parameters))
    }

    /// `<stem>_signed.<ext>`, with the extension taken from the signed
    /// document and short ASiC extensions expanded.
    fn pretty_name(&self, signed: &Document) -> String {
        let stem = self.document.stem().unwrap_or("document");
        let extension = signed
            .extension()
            .or_else(|| self.document.extension())
            .map(|ext| match ext.to_ascii_lowercase().as_str() {
                "scs" => "asics".to_string(),
                "sce" => "asice".to_string(),
                other => other.to_string(),
            });
        match extension {
            Some(ext) => format!("{stem}_signed.{ext}"),
            None => format!("{stem}_signed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::level::{SignatureForm, SignatureLevel, SignatureTier};
    use crate::domain::mime::MimeType;
    use crate::domain::types::TimestampSource;
    use crate::services::signature::ServiceRegistry;

    fn job(name: &str) -> SigningJob {
        let params = ResolvedSigningParameters::defaults(SignatureLevel::new(
            SignatureForm::CAdES,
            SignatureTier::B,
        ));
        let doc = Document::new(b"data".to_vec(), Some(name.into()), MimeType::parse("application/octet-stream"));
        SigningJob::build(&doc, params).unwrap()
    }

    #[test]
    fn test_pretty_name_expands_asic_extensions() {
        let job = job("contract.pdf");
        let signed = |name: &str| {
            Document::new(Vec::new(), Some(name.into()), MimeType::parse("application/octet-stream"))
        };
        assert_eq!(job.pretty_name(&signed("x.scs")), "contract_signed.asics");
        assert_eq!(job.pretty_name(&signed("x.sce")), "contract_signed.asice");
        assert_eq!(job.pretty_name(&signed("x.pdf")), "contract_signed.pdf");
    }

    #[test]
    fn test_timestamped_level_needs_timestamp_source() {
        let mut params = ResolvedSigningParameters::defaults(SignatureLevel::new(
            SignatureForm::XAdES,
            SignatureTier::T,
        ));
        let doc = Document::new(b"<a/>".to_vec(), Some("a.xml".into()), MimeType::parse("application/xml"));
        let err = SigningJob::build(&doc, params.clone()).err().unwrap();
        assert!(matches!(err, SigningError::TsaMisconfigured(_)));

        params.timestamp_source =
            Some(TimestampSource::from_urls(&["http://tsa.example.org/tsr"]).unwrap());
        assert!(SigningJob::build(&doc, params).is_ok());
    }

    #[test]
    fn test_failed_job_rejects_further_calls() {
        let mut job = job("a.bin");
        let structure = DataToSignStructure {
            data_to_sign: String::new(),
            signing_time: 0,
            signing_certificate: "bm90IGEgY2VydA==".into(),
        };
        let err = job
            .finalize(&ServiceRegistry::new(), structure, b"sig")
            .unwrap_err();
        assert!(matches!(err, SigningError::Certificate(_)));
        assert_eq!(job.state(), JobState::Failed);

        let err = job
            .finalize(
                &ServiceRegistry::new(),
                DataToSignStructure {
                    data_to_sign: String::new(),
                    signing_time: 0,
                    signing_certificate: String::new(),
                },
                b"sig",
            )
            .unwrap_err();
        assert!(matches!(err, SigningError::RequestValidation { .. }));
    }
}
