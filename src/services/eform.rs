//! eForm discovery.
//!
//! An XML document is recognised as an eForm either from the schemas embedded
//! in its XML data container or by looking its fingerprint up in a
//! [`FormRegistry`].

use crate::domain::document::Document;
use crate::domain::eform::{EFormAttributes, FormFingerprint, XsltParams};
use crate::domain::mime::MimeKind;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::xdc;
use std::collections::HashMap;
use std::sync::Arc;

/// Source of eForm attributes keyed by form identifier or namespace.
pub trait FormRegistry: Send + Sync {
    /// Attributes of the form matching `fingerprint`, if known.
    ///
    /// # Errors
    /// Registry I/O failures.
    fn lookup(&self, fingerprint: &FormFingerprint) -> SigningResult<Option<EFormAttributes>>;
}

/// Registry backed by a map, keyed by identifier and namespace.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFormRegistry {
    forms: HashMap<String, EFormAttributes>,
}

impl InMemoryFormRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a form under `key` (identifier or root namespace).
    #[must_use]
    pub fn with_form(mut self, key: impl Into<String>, attributes: EFormAttributes) -> Self {
        self.forms.insert(key.into(), attributes);
        self
    }
}

impl FormRegistry for InMemoryFormRegistry {
    fn lookup(&self, fingerprint: &FormFingerprint) -> SigningResult<Option<EFormAttributes>> {
        Ok(fingerprint.keys().find_map(|key| self.forms.get(key).cloned()))
    }
}

/// Discovers eForm attributes of XML documents.
#[derive(Clone, Default)]
pub struct EFormResolver {
    registry: Option<Arc<dyn FormRegistry>>,
}

impl EFormResolver {
    #[must_use]
    pub fn new(registry: Option<Arc<dyn FormRegistry>>) -> Self {
        Self { registry }
    }

    /// Fingerprint of an XML or XDC document.
    #[must_use]
    pub fn fingerprint(document: &Document, kind: MimeKind) -> FormFingerprint {
        match kind {
            MimeKind::Xdc => {
                let identifier = xdc::parse_xdc(document.content())
                    .ok()
                    .and_then(|info| info.identifier);
                let namespace = xdc::extract_payload(document.content())
                    .ok()
                    .and_then(|payload| xdc::root_element(&payload))
                    .and_then(|root| root.namespace);
                FormFingerprint {
                    namespace,
                    identifier,
                }
            }
            MimeKind::Xml => FormFingerprint {
                namespace: xdc::root_element(document.content()).and_then(|root| root.namespace),
                identifier: None,
            },
            _ => FormFingerprint::default(),
        }
    }

    /// Discover attributes for `document` of effective kind `kind`.
    ///
    /// Schemas embedded in an XDC are always used; the registry is consulted
    /// only when `auto_load` is set.
    ///
    /// # Errors
    /// Malformed containers and registry failures.
    pub fn discover(
        &self,
        document: &Document,
        kind: MimeKind,
        auto_load: bool,
    ) -> SigningResult<Option<EFormAttributes>> {
        if kind == MimeKind::Xdc {
            if let Some(attributes) = Self::embedded_attributes(document)? {
                log::debug!("Using eForm schemas embedded in {:?}", document.filename());
                return Ok(Some(attributes));
            }
        }

        if !auto_load || !kind.is_xml_like() {
            return Ok(None);
        }
        let Some(registry) = &self.registry else {
            return Ok(None);
        };

        let fingerprint = Self::fingerprint(document, kind);
        if fingerprint.is_empty() {
            return Ok(None);
        }
        let found = registry.lookup(&fingerprint)?;
        match &found {
            Some(attributes) => log::info!("Recognised eForm {}", attributes.identifier),
            None => log::debug!("No registered eForm matches {fingerprint:?}"),
        }
        Ok(found)
    }

    fn embedded_attributes(document: &Document) -> SigningResult<Option<EFormAttributes>> {
        let info = xdc::parse_xdc(document.content())?;
        let (Some(identifier), Some(schema), Some(transformation)) = (
            info.identifier,
            info.embedded_schema,
            info.embedded_transformation,
        ) else {
            return Ok(None);
        };

        Ok(Some(EFormAttributes {
            identifier,
            schema: Some(schema),
            transformation: Some(transformation),
            container_xmlns: info.namespace,
            container: None,
            packaging: None,
            xsd_identifier: info.xsd_reference,
            xslt_params: (!info.xslt_params.is_empty()).then_some(info.xslt_params),
            embed_used_schemas: true,
        }))
    }
}

/// Complete the XSLT metadata for a transformation.
///
/// The destination type comes from `params` when set, otherwise from the
/// transformation's `xsl:output@method`. A missing identifier defaults to
/// `<identifier>/form.xslt`.
///
/// # Errors
/// `EForm` when no destination type can be determined.
pub fn fill_xslt_params(
    params: XsltParams,
    transformation: &str,
    identifier: Option<&str>,
) -> SigningResult<XsltParams> {
    let mut params = params;
    if params.destination_type.is_none() {
        params.destination_type = xdc::output_method(transformation);
    }
    let destination = params.destination_type.ok_or_else(|| {
        SigningError::eform_with(
            "Unable to determine transformation output type",
            "set transformationMediaDestinationTypeDescription or xsl:output method",
        )
    })?;
    if params.media_destination_type_description.is_none() {
        params.media_destination_type_description = Some(destination.as_str().to_string());
    }
    if params.identifier.is_none() {
        params.identifier = identifier.map(|id| format!("{id}/form.xslt"));
    }
    Ok(params)
}
