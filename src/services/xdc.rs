//! XML sniffing and the XML data container (XDC) codec.
//!
//! An XDC wraps an XML payload together with references to (or embedded
//! copies of) the schema and presentation transformation it was filled in
//! against. The container is produced natively; only the signature over it is
//! delegated to the signature service.

use crate::domain::eform::{DestinationType, XsltParams, XDC_NAMESPACE};
use crate::domain::params::ResolvedSigningParameters;
use crate::infra::error::{SigningError, SigningResult};
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::ops::Range;

const XDC_ROOT: &str = "XMLDataContainer";
const XML_DATA: &str = "XMLData";

/// Name and namespace of a document's root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootElement {
    pub local_name: String,
    pub namespace: Option<String>,
}

/// Contents of an existing XDC relevant to eForm discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XdcInfo {
    pub namespace: Option<String>,
    pub identifier: Option<String>,
    pub version: Option<String>,
    pub xsd_reference: Option<String>,
    pub xslt_params: XsltParams,
    pub embedded_schema: Option<String>,
    pub embedded_transformation: Option<String>,
}

/// Root element of an XML document, or `None` if the bytes are not XML.
#[must_use]
pub fn root_element(content: &[u8]) -> Option<RootElement> {
    let text = std::str::from_utf8(content).ok()?;
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(RootElement {
                    local_name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                    namespace: element_namespace(&e),
                });
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Whether the content is an XML data container.
#[must_use]
pub fn is_xdc(content: &[u8]) -> bool {
    root_element(content).is_some_and(|root| root.local_name == XDC_ROOT)
}

/// Inner XML of the `XMLData` element.
///
/// # Errors
/// Fails for malformed XML or a container without payload.
pub fn extract_payload(content: &[u8]) -> SigningResult<Vec<u8>> {
    let text = as_utf8(content)?;
    let range = inner_range(text, XML_DATA)?
        .ok_or_else(|| SigningError::eform("XML data container has no XMLData element"))?;
    Ok(text[range].trim().as_bytes().to_vec())
}

/// Read identifiers, references and embedded schemas from an XDC.
///
/// # Errors
/// Fails for malformed XML.
pub fn parse_xdc(content: &[u8]) -> SigningResult<XdcInfo> {
    let text = as_utf8(content)?;
    let mut info = XdcInfo {
        namespace: root_element(content).and_then(|root| root.namespace),
        ..XdcInfo::default()
    };

    let mut reader = Reader::from_str(text);
    let mut current: Option<String> = None;
    loop {
        let (e, is_start) = match reader.read_event().map_err(malformed)? {
            Event::Start(e) => (e, true),
            Event::Empty(e) => (e, false),
            Event::Text(t) => {
                let target = match current.as_deref() {
                    Some("UsedXSDReference") => &mut info.xsd_reference,
                    Some("UsedPresentationSchemaReference") => &mut info.xslt_params.identifier,
                    _ => continue,
                };
                let value = t.unescape().map_err(malformed)?.trim().to_string();
                if !value.is_empty() {
                    *target = Some(value);
                }
                continue;
            }
            Event::End(_) => {
                current = None;
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        match name.as_str() {
            XML_DATA => {
                info.identifier = attribute(&e, "Identifier");
                info.version = attribute(&e, "Version");
            }
            "UsedPresentationSchemaReference" | "UsedPresentationSchema" => {
                let destination = attribute(&e, "MediaDestinationTypeDescription");
                info.xslt_params = XsltParams {
                    identifier: info.xslt_params.identifier.take(),
                    language: attribute(&e, "Language"),
                    destination_type: destination
                        .as_deref()
                        .and_then(|d| d.parse::<DestinationType>().ok()),
                    target_environment: attribute(&e, "TargetEnvironment"),
                    media_destination_type_description: destination,
                };
            }
            _ => {}
        }
        current = is_start.then_some(name);
    }

    info.embedded_schema = inner_range(text, "UsedXMLSchema")?
        .map(|range| embedded_source(&text[range]))
        .transpose()?
        .filter(|s| !s.is_empty());
    info.embedded_transformation = inner_range(text, "UsedPresentationSchema")?
        .map(|range| embedded_source(&text[range]))
        .transpose()?
        .filter(|s| !s.is_empty());

    Ok(info)
}

/// Destination type declared by `xsl:output@method` of a transformation.
#[must_use]
pub fn output_method(transformation: &str) -> Option<DestinationType> {
    let mut reader = Reader::from_str(transformation);
    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if depth == 1 && e.local_name().as_ref() == b"output" {
                    return attribute(&e, "method")
                        .and_then(|m| DestinationType::from_output_method(&m));
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if depth == 1 && e.local_name().as_ref() == b"output" {
                    return attribute(&e, "method")
                        .and_then(|m| DestinationType::from_output_method(&m));
                }
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Wrap an XML payload into an XML data container.
///
/// # Errors
/// Fails when the identifier is missing, or when schema and transformation
/// are required but absent.
pub fn build_xdc(payload: &[u8], params: &ResolvedSigningParameters) -> SigningResult<Vec<u8>> {
    let payload = strip_declaration(as_utf8(payload)?);
    let identifier = params.identifier.as_deref().ok_or_else(|| {
        SigningError::request_validation("Identifier is required to create an XML data container")
    })?;
    let version = identifier
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(identifier);
    let xslt = params.xslt_params.clone().unwrap_or_default();

    let mut out = String::with_capacity(payload.len() + 1024);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!("<xdc:{XDC_ROOT} xmlns:xdc=\"{XDC_NAMESPACE}\">\n"));
    out.push_str(&format!(
        "<xdc:{XML_DATA} ContentType=\"application/xml; charset=UTF-8\" Identifier=\"{}\" Version=\"{}\">{payload}</xdc:{XML_DATA}>\n",
        escape(identifier),
        escape(version),
    ));

    if params.embed_used_schemas {
        out.push_str("<xdc:UsedSchemasEmbedded>\n");
        if let Some(schema) = params.schema.as_deref() {
            out.push_str(&format!(
                "<xdc:UsedXMLSchema>{}</xdc:UsedXMLSchema>\n",
                strip_declaration(schema)
            ));
        }
        if let Some(transformation) = params.transformation.as_deref() {
            out.push_str(&format!(
                "<xdc:UsedPresentationSchema ContentType=\"application/xslt+xml\"{}>{}</xdc:UsedPresentationSchema>\n",
                presentation_attributes(&xslt),
                strip_declaration(transformation)
            ));
        }
        out.push_str("</xdc:UsedSchemasEmbedded>\n");
    } else {
        let schema = params.schema.as_deref().ok_or_else(|| {
            SigningError::request_validation("Schema is required to create an XML data container")
        })?;
        let transformation = params.transformation.as_deref().ok_or_else(|| {
            SigningError::request_validation(
                "Transformation is required to create an XML data container",
            )
        })?;
        let digest = params.digest_algorithm;
        let xsd_identifier = params
            .xsd_identifier
            .clone()
            .unwrap_or_else(|| format!("{identifier}/form.xsd"));
        let xslt_identifier = xslt
            .identifier
            .clone()
            .unwrap_or_else(|| format!("{identifier}/form.xslt"));

        out.push_str("<xdc:UsedSchemasReferenced>\n");
        out.push_str(&format!(
            "<xdc:UsedXSDReference DigestMethod=\"{}\" DigestValue=\"{}\">{}</xdc:UsedXSDReference>\n",
            digest.xml_uri(),
            digest.digest(schema.as_bytes()).to_base64(),
            escape(&xsd_identifier),
        ));
        out.push_str(&format!(
            "<xdc:UsedPresentationSchemaReference ContentType=\"application/xslt+xml\" DigestMethod=\"{}\" DigestValue=\"{}\"{}>{}</xdc:UsedPresentationSchemaReference>\n",
            digest.xml_uri(),
            digest.digest(transformation.as_bytes()).to_base64(),
            presentation_attributes(&xslt),
            escape(&xslt_identifier),
        ));
        out.push_str("</xdc:UsedSchemasReferenced>\n");
    }

    out.push_str(&format!("</xdc:{XDC_ROOT}>\n"));
    Ok(out.into_bytes())
}

fn presentation_attributes(xslt: &XsltParams) -> String {
    let mut attrs = String::new();
    if let Some(language) = &xslt.language {
        attrs.push_str(&format!(" Language=\"{}\"", escape(language)));
    }
    let destination = xslt
        .media_destination_type_description
        .clone()
        .or_else(|| xslt.destination_type.map(|d| d.as_str().to_string()));
    if let Some(destination) = destination {
        attrs.push_str(&format!(
            " MediaDestinationTypeDescription=\"{}\"",
            escape(&destination)
        ));
    }
    if let Some(env) = &xslt.target_environment {
        attrs.push_str(&format!(" TargetEnvironment=\"{}\"", escape(env)));
    }
    attrs
}

/// Byte range of the inner XML of the first (outermost) element named `local`.
fn inner_range(text: &str, local: &str) -> SigningResult<Option<Range<usize>>> {
    let mut reader = Reader::from_str(text);
    let mut depth = 0usize;
    let mut start = None;
    loop {
        let before = reader.buffer_position();
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) if e.local_name().as_ref() == local.as_bytes() => {
                if depth == 0 {
                    start = Some(reader.buffer_position());
                }
                depth += 1;
            }
            Event::Empty(e) if depth == 0 && e.local_name().as_ref() == local.as_bytes() => {
                return Ok(Some(before..before));
            }
            Event::End(e) if e.local_name().as_ref() == local.as_bytes() => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some(start) = start {
                        return Ok(Some(start..before));
                    }
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn embedded_source(raw: &str) -> SigningResult<String> {
    let raw = raw.trim();
    if let Some(inner) = raw
        .strip_prefix("<![CDATA[")
        .and_then(|r| r.strip_suffix("]]>"))
    {
        return Ok(inner.trim().to_string());
    }
    if raw.starts_with("&lt;") {
        return Ok(unescape(raw).map_err(malformed)?.trim().to_string());
    }
    Ok(raw.to_string())
}

fn strip_declaration(text: &str) -> &str {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return trimmed[end + 2..].trim_start();
        }
    }
    trimmed
}

fn element_namespace(e: &BytesStart<'_>) -> Option<String> {
    let name = e.name();
    let wanted = match name.prefix() {
        Some(prefix) => format!("xmlns:{}", String::from_utf8_lossy(prefix.as_ref())),
        None => "xmlns".to_string(),
    };
    attribute(e, &wanted)
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key.as_bytes())
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

fn as_utf8(content: &[u8]) -> SigningResult<&str> {
    std::str::from_utf8(content)
        .map_err(|e| SigningError::eform_with("Document is not valid UTF-8 XML", e.to_string()))
}

fn malformed(error: impl std::fmt::Display) -> SigningError {
    SigningError::eform_with("Malformed XML document", error.to_string())
}
