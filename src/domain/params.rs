//! Caller-supplied and resolved signing parameters.

use super::crypto::DigestAlgorithm;
use super::eform::{is_xdc_namespace, DestinationType, XsltParams};
use super::level::{CanonicalizationMethod, ContainerKind, Packaging, SignatureLevel};
use super::types::TimestampSource;
use serde::{Deserialize, Serialize};

/// Loosely specified parameters as sent by a caller. Every field is
/// optional; the resolver decides what is missing or inconsistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerParameters {
    pub level: Option<String>,
    pub container: Option<ContainerKind>,
    pub container_xmlns: Option<String>,
    pub packaging: Option<Packaging>,
    pub digest_algorithm: Option<DigestAlgorithm>,
    pub en319132: Option<bool>,
    pub info_canonicalization: Option<CanonicalizationMethod>,
    pub properties_canonicalization: Option<CanonicalizationMethod>,
    pub key_info_canonicalization: Option<CanonicalizationMethod>,
    pub schema: Option<String>,
    pub transformation: Option<String>,
    pub identifier: Option<String>,
    #[serde(rename = "checkPDFACompliance")]
    pub check_pdfa_compliance: Option<bool>,
    pub auto_load_eform: Option<bool>,
    pub embed_used_schemas: Option<bool>,
    pub schema_identifier: Option<String>,
    pub transformation_identifier: Option<String>,
    pub transformation_language: Option<String>,
    pub transformation_media_destination_type_description: Option<String>,
    pub transformation_target_environment: Option<String>,
}

impl CallerParameters {
    /// Parameters requesting only a level.
    #[must_use]
    pub fn with_level(level: impl Into<String>) -> Self {
        Self {
            level: Some(level.into()),
            ..Self::default()
        }
    }

    /// XSLT metadata given explicitly by the caller.
    #[must_use]
    pub fn xslt_params(&self) -> XsltParams {
        XsltParams {
            identifier: self.transformation_identifier.clone(),
            language: self.transformation_language.clone(),
            destination_type: self
                .transformation_media_destination_type_description
                .as_deref()
                .and_then(|d| d.parse::<DestinationType>().ok()),
            target_environment: self.transformation_target_environment.clone(),
            media_destination_type_description: self
                .transformation_media_destination_type_description
                .clone(),
        }
    }

    #[must_use]
    pub fn auto_load_eform(&self) -> bool {
        self.auto_load_eform.unwrap_or(false)
    }

    #[must_use]
    pub fn embed_used_schemas(&self) -> bool {
        self.embed_used_schemas.unwrap_or(false)
    }

    /// Whether the caller asks for an XML data container.
    #[must_use]
    pub fn wants_xdc(&self) -> bool {
        is_xdc_namespace(self.container_xmlns.as_deref())
    }
}

/// Deployment-level knobs of parameter resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionPolicy {
    /// Allow signing XML that is not a recognised eForm.
    pub plain_xml_enabled: bool,
    /// Timestamp authorities for levels above baseline B.
    pub timestamp_source: Option<TimestampSource>,
}

/// Complete, internally consistent signing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSigningParameters {
    pub level: SignatureLevel,
    pub container: Option<ContainerKind>,
    pub container_xmlns: Option<String>,
    pub packaging: Packaging,
    pub digest_algorithm: DigestAlgorithm,
    pub en319132: bool,
    pub info_canonicalization: CanonicalizationMethod,
    pub properties_canonicalization: CanonicalizationMethod,
    pub key_info_canonicalization: CanonicalizationMethod,
    pub identifier: Option<String>,
    pub schema: Option<String>,
    pub transformation: Option<String>,
    pub xsd_identifier: Option<String>,
    pub xslt_params: Option<XsltParams>,
    pub embed_used_schemas: bool,
    pub check_pdfa_compliance: bool,
    /// Bound only above baseline B.
    pub timestamp_source: Option<TimestampSource>,
}

impl ResolvedSigningParameters {
    /// Defaults for a level: enveloped, SHA-256, inclusive C14N.
    #[must_use]
    pub fn defaults(level: SignatureLevel) -> Self {
        Self {
            level,
            container: None,
            container_xmlns: None,
            packaging: Packaging::default(),
            digest_algorithm: DigestAlgorithm::default(),
            en319132: false,
            info_canonicalization: CanonicalizationMethod::default(),
            properties_canonicalization: CanonicalizationMethod::default(),
            key_info_canonicalization: CanonicalizationMethod::default(),
            identifier: None,
            schema: None,
            transformation: None,
            xsd_identifier: None,
            xslt_params: None,
            embed_used_schemas: false,
            check_pdfa_compliance: false,
            timestamp_source: None,
        }
    }

    /// Whether the document is to be wrapped in an XML data container.
    #[must_use]
    pub fn should_create_xdc(&self) -> bool {
        is_xdc_namespace(self.container_xmlns.as_deref())
    }

    #[must_use]
    pub fn destination_type(&self) -> Option<DestinationType> {
        self.xslt_params.as_ref().and_then(|p| p.destination_type)
    }
}
