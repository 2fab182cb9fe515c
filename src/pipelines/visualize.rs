//! Human-reviewable rendering of a document before it is signed.
//!
//! Visualization never blocks signing: every failure degrades to `None` and
//! the caller falls back to a generic warning.

use crate::domain::document::Document;
use crate::domain::eform::DestinationType;
use crate::domain::mime::{self, MimeKind, MimeType};
use crate::domain::params::ResolvedSigningParameters;
use crate::infra::error::SigningResult;
use crate::services::asic;
use crate::services::classifier::MimeClassifier;
use crate::services::xdc;
use crate::services::xml_engine::XmlEngine;
use base64::Engine;
use std::sync::Arc;

pub struct VisualizationPipeline {
    xml_engine: Arc<dyn XmlEngine>,
}

impl VisualizationPipeline {
    #[must_use]
    pub fn new(xml_engine: Arc<dyn XmlEngine>) -> Self {
        Self { xml_engine }
    }

    /// Render `document` for review, or `None` when no preview is available.
    #[must_use]
    pub fn visualize(
        &self,
        document: &Document,
        params: &ResolvedSigningParameters,
    ) -> Option<Document> {
        let kind = MimeClassifier::classify(document);
        let (document, kind) = if kind.is_asic() {
            match asic::extract_original(document) {
                Ok(inner) => {
                    let inner_kind = MimeClassifier::classify(&inner);
                    (inner, inner_kind)
                }
                Err(e) => {
                    log::debug!("No visualization for container: {e}");
                    return None;
                }
            }
        } else {
            (document.clone(), kind)
        };

        if kind.is_xml_like() {
            if let Some(transformation) = params.transformation.as_deref() {
                return match self.transform(&document, kind, transformation, params) {
                    Ok(result) => result,
                    Err(e) => {
                        log::warn!(
                            "Visualization of {:?} failed: {e}",
                            document.filename()
                        );
                        None
                    }
                };
            }
        }

        match kind {
            MimeKind::Html | MimeKind::Text | MimeKind::Pdf => Some(document),
            kind if kind.is_image() => Some(image_page(&document, kind)),
            _ => None,
        }
    }

    fn transform(
        &self,
        document: &Document,
        kind: MimeKind,
        transformation: &str,
        params: &ResolvedSigningParameters,
    ) -> SigningResult<Option<Document>> {
        let mime = match params.destination_type() {
            Some(DestinationType::Html | DestinationType::Xhtml) => MimeType::parse(mime::HTML),
            Some(DestinationType::Txt) => MimeType::parse(mime::TEXT_UTF8),
            None => {
                log::debug!("Transformation output type is unknown, skipping visualization");
                return Ok(None);
            }
        };

        let payload = if kind == MimeKind::Xdc {
            xdc::extract_payload(document.content())?
        } else {
            document.content().to_vec()
        };
        let output = self.xml_engine.transform(&payload, transformation)?;
        Ok(Some(Document::new(
            output,
            document.filename().map(str::to_string),
            mime,
        )))
    }
}

/// Minimal HTML page showing an image inline. The data URI carries the
/// declared media type; sniffed documents fall back to the canonical one.
fn image_page(document: &Document, kind: MimeKind) -> Document {
    let media_type = if document.declared_kind() == kind {
        document.mime().essence()
    } else {
        kind.canonical()
    };
    let payload = base64::engine::general_purpose::STANDARD.encode(document.content());
    let html = format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n<title>Image visualization</title>\n</head>\n<body>\n<img src=\"data:{media_type};base64,{payload}\" alt=\"{}\">\n</body>\n</html>\n",
        document.filename().unwrap_or("image"),
    );
    Document::new(
        html.into_bytes(),
        document.filename().map(str::to_string),
        MimeType::parse(mime::HTML),
    )
}
