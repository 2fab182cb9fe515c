//! Electronic form (eForm) metadata.

use super::level::{ContainerKind, Packaging};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace fragment identifying an XML data container.
pub const XDC_NAMESPACE_MARKER: &str = "xmldatacontainer";

/// Namespace of XML data containers produced by the gateway.
pub const XDC_NAMESPACE: &str = "http://data.gov.sk/def/container/xmldatacontainer+xml/1.1";

/// Output medium of a presentation transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DestinationType {
    Txt,
    Html,
    Xhtml,
}

impl DestinationType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DestinationType::Txt => "TXT",
            DestinationType::Html => "HTML",
            DestinationType::Xhtml => "XHTML",
        }
    }

    /// Map an `xsl:output` method attribute.
    #[must_use]
    pub fn from_output_method(method: &str) -> Option<Self> {
        match method.trim().to_ascii_lowercase().as_str() {
            "html" => Some(DestinationType::Html),
            "text" => Some(DestinationType::Txt),
            "xhtml" | "xml" => Some(DestinationType::Xhtml),
            _ => None,
        }
    }
}

impl FromStr for DestinationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TXT" => Ok(DestinationType::Txt),
            "HTML" => Ok(DestinationType::Html),
            "XHTML" => Ok(DestinationType::Xhtml),
            other => Err(format!("unknown destination type {other}")),
        }
    }
}

impl fmt::Display for DestinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of the presentation transformation (XSLT).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XsltParams {
    pub identifier: Option<String>,
    pub language: Option<String>,
    pub destination_type: Option<DestinationType>,
    pub target_environment: Option<String>,
    pub media_destination_type_description: Option<String>,
}

impl XsltParams {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &XsltParams::default()
    }

    /// Fill unset fields from `other`.
    #[must_use]
    pub fn or(self, other: &XsltParams) -> Self {
        Self {
            identifier: self.identifier.or_else(|| other.identifier.clone()),
            language: self.language.or_else(|| other.language.clone()),
            destination_type: self.destination_type.or(other.destination_type),
            target_environment: self
                .target_environment
                .or_else(|| other.target_environment.clone()),
            media_destination_type_description: self
                .media_destination_type_description
                .or_else(|| other.media_destination_type_description.clone()),
        }
    }
}

/// Attributes of a recognised eForm, from a registry or an XDC.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EFormAttributes {
    pub identifier: String,
    pub schema: Option<String>,
    pub transformation: Option<String>,
    pub container_xmlns: Option<String>,
    pub container: Option<ContainerKind>,
    pub packaging: Option<Packaging>,
    pub xsd_identifier: Option<String>,
    pub xslt_params: Option<XsltParams>,
    pub embed_used_schemas: bool,
}

/// What identifies an XML document as a particular form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FormFingerprint {
    /// Namespace of the root element.
    pub namespace: Option<String>,
    /// `Identifier` attribute of the XDC payload, when wrapped.
    pub identifier: Option<String>,
}

impl FormFingerprint {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespace.is_none() && self.identifier.is_none()
    }

    /// Lookup keys in priority order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.identifier
            .as_deref()
            .into_iter()
            .chain(self.namespace.as_deref())
    }
}

/// Whether a container namespace asks for an XML data container.
#[must_use]
pub fn is_xdc_namespace(xmlns: Option<&str>) -> bool {
    xmlns.is_some_and(|ns| ns.contains(XDC_NAMESPACE_MARKER))
}
