//! Media type domain type.
//!
//! A [`MimeType`] keeps the declared media type string (parameters such as
//! `charset` included) alongside the [`MimeKind`] the gateway reasons about.

use std::fmt;

pub const PDF: &str = "application/pdf";
pub const XML: &str = "application/xml";
pub const XDC: &str = "application/vnd.gov.sk.xmldatacontainer+xml";
pub const TEXT: &str = "text/plain";
pub const TEXT_UTF8: &str = "text/plain;charset=UTF-8";
pub const HTML: &str = "text/html";
pub const JPEG: &str = "image/jpeg";
pub const PNG: &str = "image/png";
pub const ASIC_S: &str = "application/vnd.etsi.asic-s+zip";
pub const ASIC_E: &str = "application/vnd.etsi.asic-e+zip";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Document kinds distinguished by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MimeKind {
    Pdf,
    Xml,
    Xdc,
    Text,
    Html,
    Jpeg,
    Png,
    AsicS,
    AsicE,
    Other,
}

impl MimeKind {
    /// XML or XML data container.
    #[must_use]
    pub fn is_xml_like(self) -> bool {
        matches!(self, MimeKind::Xml | MimeKind::Xdc)
    }

    #[must_use]
    pub fn is_asic(self) -> bool {
        matches!(self, MimeKind::AsicS | MimeKind::AsicE)
    }

    /// Kinds previewed as an inline image page.
    #[must_use]
    pub fn is_image(self) -> bool {
        matches!(self, MimeKind::Jpeg | MimeKind::Png)
    }

    /// Canonical media type for this kind.
    #[must_use]
    pub fn canonical(self) -> &'static str {
        match self {
            MimeKind::Pdf => PDF,
            MimeKind::Xml => XML,
            MimeKind::Xdc => XDC,
            MimeKind::Text => TEXT,
            MimeKind::Html => HTML,
            MimeKind::Jpeg => JPEG,
            MimeKind::Png => PNG,
            MimeKind::AsicS => ASIC_S,
            MimeKind::AsicE => ASIC_E,
            MimeKind::Other => OCTET_STREAM,
        }
    }

    fn from_essence(essence: &str) -> Self {
        match essence {
            PDF => MimeKind::Pdf,
            XDC => MimeKind::Xdc,
            "application/xml" | "text/xml" => MimeKind::Xml,
            TEXT => MimeKind::Text,
            "text/html" | "application/xhtml+xml" => MimeKind::Html,
            JPEG | "image/jpg" => MimeKind::Jpeg,
            PNG => MimeKind::Png,
            ASIC_S => MimeKind::AsicS,
            ASIC_E => MimeKind::AsicE,
            other if other.ends_with("+xml") => MimeKind::Xml,
            _ => MimeKind::Other,
        }
    }
}

/// Declared media type of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    value: String,
    kind: MimeKind,
}

impl MimeType {
    /// Parse a declared media type. Parameters after `;` are kept verbatim
    /// but do not influence the kind.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        let essence = value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        Self {
            value: value.to_string(),
            kind: MimeKind::from_essence(&essence),
        }
    }

    /// Canonical media type of a kind.
    #[must_use]
    pub fn of(kind: MimeKind) -> Self {
        Self {
            value: kind.canonical().to_string(),
            kind,
        }
    }

    /// Guess the media type from a file name extension.
    #[must_use]
    pub fn from_filename(name: &str) -> Self {
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let kind = match extension.as_str() {
            "pdf" => MimeKind::Pdf,
            "xml" | "xsd" | "xslt" | "xsl" => MimeKind::Xml,
            "xdcf" => MimeKind::Xdc,
            "txt" => MimeKind::Text,
            "html" | "htm" | "xhtml" => MimeKind::Html,
            "jpg" | "jpeg" => MimeKind::Jpeg,
            "png" => MimeKind::Png,
            "asics" | "scs" => MimeKind::AsicS,
            "asice" | "sce" => MimeKind::AsicE,
            _ => MimeKind::Other,
        };
        Self::of(kind)
    }

    #[must_use]
    pub fn kind(&self) -> MimeKind {
        self.kind
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Media type without parameters, as declared.
    #[must_use]
    pub fn essence(&self) -> &str {
        self.value.split(';').next().unwrap_or_default().trim()
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
