//! Request-level facade tying resolution, signing, visualization and
//! validation together for transport adapters.

use crate::domain::crypto::CertificateToken;
use crate::domain::document::Document;
use crate::domain::params::{CallerParameters, ResolutionPolicy, ResolvedSigningParameters};
use crate::domain::protocol::{DataToSignStructure, SignedDocumentResult};
use crate::domain::validation::ValidationReport;
use crate::infra::error::{SigningError, SigningResult};
use crate::pipelines::sign::SigningJob;
use crate::pipelines::visualize::VisualizationPipeline;
use crate::services::eform::{EFormResolver, FormRegistry};
use crate::services::resolver::ParameterResolver;
use crate::services::signature::SignatureServiceProvider;
use crate::services::validation::{SignatureValidator, ValidationFacade};
use crate::services::xml_engine::XmlEngine;
use std::sync::Arc;

/// A document together with the caller's loosely specified parameters.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    pub document: Document,
    pub parameters: CallerParameters,
}

impl SigningRequest {
    #[must_use]
    pub fn new(document: Document, parameters: CallerParameters) -> Self {
        Self {
            document,
            parameters,
        }
    }
}

/// External collaborators the gateway delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub signature_services: Arc<dyn SignatureServiceProvider>,
    pub validation: Arc<ValidationFacade>,
    pub xml_engine: Arc<dyn XmlEngine>,
    pub form_registry: Option<Arc<dyn FormRegistry>>,
}

pub struct SigningGateway {
    resolver: ParameterResolver,
    visualization: VisualizationPipeline,
    signature_services: Arc<dyn SignatureServiceProvider>,
    validation: Arc<ValidationFacade>,
}

impl SigningGateway {
    #[must_use]
    pub fn new(policy: ResolutionPolicy, collaborators: Collaborators) -> Self {
        let eforms = EFormResolver::new(collaborators.form_registry);
        Self {
            resolver: ParameterResolver::new(
                policy,
                eforms,
                Arc::clone(&collaborators.xml_engine),
            ),
            visualization: VisualizationPipeline::new(collaborators.xml_engine),
            signature_services: collaborators.signature_services,
            validation: collaborators.validation,
        }
    }

    #[must_use]
    pub fn validation(&self) -> &Arc<ValidationFacade> {
        &self.validation
    }

    /// Complete the level from an existing signature if needed, then resolve
    /// the full parameter set.
    ///
    /// # Errors
    /// Any resolution failure.
    pub fn prepare(&self, request: &SigningRequest) -> SigningResult<ResolvedSigningParameters> {
        let caller = ParameterResolver::resolve_signing_level(
            self.validation.as_ref(),
            &request.document,
            &request.parameters,
        )?;
        self.resolver.resolve(&request.document, &caller)
    }

    /// Phase one of the signing protocol.
    ///
    /// # Errors
    /// Resolution, certificate and signature service failures.
    pub fn data_to_sign(
        &self,
        request: &SigningRequest,
        certificate: &CertificateToken,
    ) -> SigningResult<DataToSignStructure> {
        let mut job = self.job(request)?;
        job.compute_data_to_sign(self.signature_services.as_ref(), certificate)
    }

    /// Phase two of the signing protocol.
    ///
    /// # Errors
    /// Resolution failures, `DataToSignMismatch` and signature service
    /// failures.
    pub fn sign(
        &self,
        request: &SigningRequest,
        structure: DataToSignStructure,
        signature: &[u8],
    ) -> SigningResult<SignedDocumentResult> {
        let mut job = self.job(request)?;
        job.finalize(self.signature_services.as_ref(), structure, signature)
    }

    /// Preview of the document, `None` when no visualization is available.
    ///
    /// # Errors
    /// Resolution failures only; rendering failures yield `None`.
    pub fn visualize(&self, request: &SigningRequest) -> SigningResult<Option<Document>> {
        let params = self.prepare(request)?;
        Ok(self.visualization.visualize(&request.document, &params))
    }

    /// Check that the request would resolve without signing anything.
    ///
    /// # Errors
    /// Any resolution failure.
    pub fn validate_parameters(&self, request: &SigningRequest) -> SigningResult<()> {
        self.prepare(request).map(|_| ())
    }

    /// Validation report for the signatures on `document`.
    ///
    /// # Errors
    /// `DocumentNotSignedYet` when the document carries no signature;
    /// validator failures.
    pub fn validate_signatures(&self, document: &Document) -> SigningResult<ValidationReport> {
        self.validation
            .validate_report(document)?
            .ok_or(SigningError::DocumentNotSignedYet)
    }

    fn job(&self, request: &SigningRequest) -> SigningResult<SigningJob> {
        let params = self.prepare(request)?;
        SigningJob::build(&request.document, params)
    }
}
