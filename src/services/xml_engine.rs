//! Boundary to the external XML schema validation and XSLT engine.

use crate::infra::error::SigningResult;

/// What an XML document is validated against before it is wrapped.
#[derive(Debug, Clone, Copy)]
pub struct XmlValidationRequest<'a> {
    pub document: &'a [u8],
    pub schema: Option<&'a str>,
    pub transformation: Option<&'a str>,
}

/// XSD validation and XSLT execution.
pub trait XmlEngine: Send + Sync {
    /// Validate a document against its schema and check that the
    /// transformation compiles.
    ///
    /// # Errors
    /// `SigningError::EForm` for documents that do not conform.
    fn validate(&self, request: &XmlValidationRequest<'_>) -> SigningResult<()>;

    /// Apply a transformation to a document.
    ///
    /// # Errors
    /// `SigningError::Transformation` when the engine fails.
    fn transform(&self, document: &[u8], transformation: &str) -> SigningResult<Vec<u8>>;
}
