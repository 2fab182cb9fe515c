//! Signing parameter resolution.
//!
//! Turns a document plus loosely specified [`CallerParameters`] into a
//! complete [`ResolvedSigningParameters`]. Resolution is deterministic over
//! the policy, the caller parameters and the discovered eForm attributes; the
//! only outward call is schema validation of documents about to be wrapped in
//! an XML data container.

use crate::domain::document::Document;
use crate::domain::eform::EFormAttributes;
use crate::domain::level::{Packaging, RequestedLevel, SignatureForm, SignatureLevel};
use crate::domain::mime::MimeKind;
use crate::domain::params::{CallerParameters, ResolutionPolicy, ResolvedSigningParameters};
use crate::infra::error::{SigningError, SigningResult};
use crate::services::asic;
use crate::services::classifier::MimeClassifier;
use crate::services::eform::{fill_xslt_params, EFormResolver};
use crate::services::validation::SignatureValidator;
use crate::services::xml_engine::{XmlEngine, XmlValidationRequest};
use std::sync::Arc;

pub struct ParameterResolver {
    policy: ResolutionPolicy,
    eforms: EFormResolver,
    xml_engine: Arc<dyn XmlEngine>,
}

impl ParameterResolver {
    #[must_use]
    pub fn new(
        policy: ResolutionPolicy,
        eforms: EFormResolver,
        xml_engine: Arc<dyn XmlEngine>,
    ) -> Self {
        Self {
            policy,
            eforms,
            xml_engine,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &ResolutionPolicy {
        &self.policy
    }

    /// Complete a missing or tier-only level from the signature already on
    /// the document. Fully specified levels are returned untouched without
    /// consulting the validator.
    ///
    /// # Errors
    /// `RequestValidation` when the document carries no signature or one of
    /// an unsupported form; validator failures are propagated.
    pub fn resolve_signing_level(
        validator: &dyn SignatureValidator,
        document: &Document,
        caller: &CallerParameters,
    ) -> SigningResult<CallerParameters> {
        let tier = match RequestedLevel::parse(caller.level.as_deref())? {
            RequestedLevel::Full(_) => return Ok(caller.clone()),
            RequestedLevel::Partial(tier) => tier.unwrap_or_default(),
        };

        let existing = validator
            .classify_existing_signature(document)?
            .ok_or_else(|| {
                SigningError::request_validation(
                    "Parameters.Level can't be empty if document is not signed yet",
                )
            })?;

        let form = match existing.form.parse::<SignatureForm>() {
            Ok(form @ (SignatureForm::PAdES | SignatureForm::XAdES | SignatureForm::CAdES)) => form,
            _ => {
                return Err(SigningError::request_validation_with(
                    "Signed document has unsupported SignatureLevel",
                    existing.form,
                ))
            }
        };

        let level = SignatureLevel::new(form, tier);
        log::info!("Resolved signature level {level} from existing signature");
        Ok(CallerParameters {
            level: Some(level.to_string()),
            container: existing.container,
            ..caller.clone()
        })
    }

    /// Check caller parameters against the document before resolution.
    ///
    /// # Errors
    /// `UnsupportedSignatureLevel` or `RequestValidation`.
    pub fn validate_request(
        document: &Document,
        caller: &CallerParameters,
    ) -> SigningResult<SignatureLevel> {
        let level = match RequestedLevel::parse(caller.level.as_deref())? {
            RequestedLevel::Full(level) => level,
            RequestedLevel::Partial(None) => {
                return Err(SigningError::request_validation("Parameters.Level is required"))
            }
            RequestedLevel::Partial(Some(_)) => {
                return Err(SigningError::request_validation(
                    "Parameters.Level must name a signature form",
                ))
            }
        };

        let kind = MimeClassifier::classify(document);
        match level.form {
            SignatureForm::PAdES => {
                if kind != MimeKind::Pdf {
                    return Err(SigningError::request_validation_with(
                        "PAdES signature requires a PDF document",
                        format!("document is {}", document.mime()),
                    ));
                }
                if caller.container.is_some() {
                    return Err(SigningError::request_validation(
                        "PAdES signature cannot be placed in an ASiC container",
                    ));
                }
            }
            SignatureForm::XAdES => {
                let enveloping = caller.packaging == Some(Packaging::Enveloping);
                if caller.container.is_none()
                    && !enveloping
                    && !(kind.is_xml_like() || kind.is_asic())
                {
                    return Err(SigningError::request_validation_with(
                        "XAdES signature without container requires an XML document",
                        "use an ASiC container or ENVELOPING packaging",
                    ));
                }
            }
            SignatureForm::JAdES => {
                if caller.container.is_some() {
                    return Err(SigningError::request_validation(
                        "JAdES signature cannot be placed in an ASiC container",
                    ));
                }
            }
            SignatureForm::CAdES => {}
        }

        if caller.wants_xdc() && kind != MimeKind::Xdc {
            if !caller.auto_load_eform() {
                if caller.transformation.is_none() {
                    return Err(SigningError::request_validation(
                        "Parameters.Transformation is required to create an XML data container",
                    ));
                }
                if caller.schema.is_none() {
                    return Err(SigningError::request_validation(
                        "Parameters.Schema is required to create an XML data container",
                    ));
                }
            }
            if caller.identifier.is_none() {
                return Err(SigningError::request_validation(
                    "Parameters.Identifier is required to create an XML data container",
                ));
            }
            if kind != MimeKind::Xml {
                return Err(SigningError::request_validation_with(
                    "Document must be XML to create an XML data container",
                    format!("document is {}", document.mime()),
                ));
            }
        }

        Ok(level)
    }

    /// Resolve the complete signing parameters for `document`.
    ///
    /// # Errors
    /// Validation failures, container extraction failures, eForm failures and
    /// schema validation failures from the XML engine.
    pub fn resolve(
        &self,
        document: &Document,
        caller: &CallerParameters,
    ) -> SigningResult<ResolvedSigningParameters> {
        let level = Self::validate_request(document, caller)?;

        let inner = if MimeClassifier::classify(document).is_asic() {
            asic::extract_original(document)?
        } else {
            document.clone()
        };
        let kind = MimeClassifier::classify(&inner);

        let mut params = ResolvedSigningParameters {
            container: caller.container,
            container_xmlns: caller.container_xmlns.clone(),
            packaging: caller.packaging.unwrap_or_default(),
            digest_algorithm: caller.digest_algorithm.unwrap_or_default(),
            en319132: caller.en319132.unwrap_or(false),
            info_canonicalization: caller.info_canonicalization.unwrap_or_default(),
            properties_canonicalization: caller.properties_canonicalization.unwrap_or_default(),
            key_info_canonicalization: caller.key_info_canonicalization.unwrap_or_default(),
            identifier: caller.identifier.clone(),
            schema: caller.schema.clone(),
            transformation: caller.transformation.clone(),
            xsd_identifier: caller.schema_identifier.clone(),
            embed_used_schemas: caller.embed_used_schemas(),
            check_pdfa_compliance: caller.check_pdfa_compliance.unwrap_or(false),
            timestamp_source: if level.tier.requires_timestamp() {
                self.policy.timestamp_source.clone()
            } else {
                None
            },
            ..ResolvedSigningParameters::defaults(level)
        };
        let mut xslt_params = caller.xslt_params();

        if kind.is_xml_like() {
            let explicit_transformation = params.transformation.is_some();
            let auto_load = caller.auto_load_eform() || !explicit_transformation;
            if let Some(attributes) = self.eforms.discover(&inner, kind, auto_load)? {
                match &attributes.xslt_params {
                    Some(discovered) if !explicit_transformation => {
                        xslt_params = discovered.clone().or(&xslt_params);
                    }
                    _ => {}
                }
                apply_discovered(&mut params, attributes);
            }
        }

        if let Some(transformation) = params.transformation.as_deref() {
            params.xslt_params = Some(fill_xslt_params(
                xslt_params,
                transformation,
                params.identifier.as_deref(),
            )?);
        }

        if params.should_create_xdc() && kind != MimeKind::Xdc {
            self.check_container_inputs(&mut params, &inner, kind)?;
        }

        if !self.policy.plain_xml_enabled && kind.is_xml_like() && params.transformation.is_none() {
            let fingerprint = EFormResolver::fingerprint(&inner, kind);
            let name = fingerprint
                .keys()
                .next()
                .map_or_else(|| "unrecognised XML document".to_string(), str::to_string);
            return Err(SigningError::UnknownEForm(name));
        }

        log::debug!(
            "Resolved parameters: level={}, container={:?}, xdc={}, digest={}",
            params.level,
            params.container,
            params.should_create_xdc(),
            params.digest_algorithm
        );
        Ok(params)
    }

    fn check_container_inputs(
        &self,
        params: &mut ResolvedSigningParameters,
        inner: &Document,
        kind: MimeKind,
    ) -> SigningResult<()> {
        if !params.embed_used_schemas {
            if params.schema.is_none() {
                return Err(SigningError::request_validation(
                    "Schema is required to create an XML data container",
                ));
            }
            if params.transformation.is_none() {
                return Err(SigningError::request_validation(
                    "Transformation is required to create an XML data container",
                ));
            }
        }
        let Some(identifier) = params.identifier.clone() else {
            return Err(SigningError::request_validation(
                "Identifier is required to create an XML data container",
            ));
        };
        if !kind.is_xml_like() {
            return Err(SigningError::request_validation(
                "Wrong document type for an XML data container",
            ));
        }
        if !params.embed_used_schemas && params.xsd_identifier.is_none() {
            params.xsd_identifier = Some(format!("{identifier}/form.xsd"));
        }

        self.xml_engine.validate(&XmlValidationRequest {
            document: inner.content(),
            schema: params.schema.as_deref(),
            transformation: params.transformation.as_deref(),
        })
    }
}

/// Discovered values win over caller values where present. A transformation
/// the caller supplied is never replaced.
fn apply_discovered(params: &mut ResolvedSigningParameters, attributes: EFormAttributes) {
    params.identifier = Some(attributes.identifier);
    params.schema = attributes.schema.or(params.schema.take());
    params.transformation = params.transformation.take().or(attributes.transformation);
    params.container_xmlns = attributes.container_xmlns.or(params.container_xmlns.take());
    params.container = attributes.container.or(params.container);
    params.packaging = attributes.packaging.unwrap_or(params.packaging);
    params.xsd_identifier = attributes.xsd_identifier.or(params.xsd_identifier.take());
    params.embed_used_schemas |= attributes.embed_used_schemas;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mime::MimeType;

    fn doc(content: &[u8], mime: &str) -> Document {
        Document::new(content.to_vec(), Some("doc".into()), MimeType::parse(mime))
    }

    #[test]
    fn test_missing_level_rejected() {
        let err = ParameterResolver::validate_request(
            &doc(b"%PDF-", "application/pdf"),
            &CallerParameters::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SigningError::RequestValidation { .. }));
    }

    #[test]
    fn test_pades_requires_pdf_and_no_container() {
        let caller = CallerParameters::with_level("PAdES_BASELINE_B");
        assert!(ParameterResolver::validate_request(&doc(b"x", "text/plain"), &caller).is_err());

        let caller = CallerParameters {
            container: Some(crate::domain::level::ContainerKind::AsicE),
            ..CallerParameters::with_level("PAdES_BASELINE_B")
        };
        assert!(
            ParameterResolver::validate_request(&doc(b"%PDF-", "application/pdf"), &caller)
                .is_err()
        );
    }

    #[test]
    fn test_xades_on_text_needs_container_or_enveloping() {
        let text = doc(b"hello", "text/plain");
        let caller = CallerParameters::with_level("XAdES_BASELINE_B");
        assert!(ParameterResolver::validate_request(&text, &caller).is_err());

        let caller = CallerParameters {
            packaging: Some(Packaging::Enveloping),
            ..CallerParameters::with_level("XAdES_BASELINE_B")
        };
        assert!(ParameterResolver::validate_request(&text, &caller).is_ok());
    }

    #[test]
    fn test_apply_discovered_keeps_caller_values_for_missing_fields() {
        let level = SignatureLevel::new(SignatureForm::XAdES, crate::domain::level::SignatureTier::B);
        let mut params = ResolvedSigningParameters::defaults(level);
        params.schema = Some("caller.xsd".into());
        params.container = Some(crate::domain::level::ContainerKind::AsicE);
        apply_discovered(
            &mut params,
            EFormAttributes {
                identifier: "urn:form".into(),
                transformation: Some("form.xslt".into()),
                embed_used_schemas: true,
                ..EFormAttributes::default()
            },
        );
        assert_eq!(params.identifier.as_deref(), Some("urn:form"));
        assert_eq!(params.schema.as_deref(), Some("caller.xsd"));
        assert_eq!(params.transformation.as_deref(), Some("form.xslt"));
        assert_eq!(params.container, Some(crate::domain::level::ContainerKind::AsicE));
        assert!(params.embed_used_schemas);
    }

    #[test]
    fn test_apply_discovered_never_replaces_caller_transformation() {
        let level = SignatureLevel::new(SignatureForm::XAdES, crate::domain::level::SignatureTier::B);
        let mut params = ResolvedSigningParameters::defaults(level);
        params.transformation = Some("caller.xslt".into());
        apply_discovered(
            &mut params,
            EFormAttributes {
                identifier: "urn:form".into(),
                schema: Some("form.xsd".into()),
                transformation: Some("form.xslt".into()),
                ..EFormAttributes::default()
            },
        );
        assert_eq!(params.transformation.as_deref(), Some("caller.xslt"));
        assert_eq!(params.schema.as_deref(), Some("form.xsd"));
    }
}
