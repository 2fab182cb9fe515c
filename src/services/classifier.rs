//! Document kind classification.
//!
//! The declared media type is trusted except for XML, which is upgraded to
//! [`MimeKind::Xdc`] when the content is an XML data container, and for
//! untyped content, which is sniffed.

use crate::domain::document::Document;
use crate::domain::mime::MimeKind;
use crate::services::xdc;

pub struct MimeClassifier;

impl MimeClassifier {
    /// Effective kind of a document.
    #[must_use]
    pub fn classify(document: &Document) -> MimeKind {
        match document.declared_kind() {
            MimeKind::Xml if xdc::is_xdc(document.content()) => MimeKind::Xdc,
            MimeKind::Other => Self::sniff(document),
            kind => kind,
        }
    }

    fn sniff(document: &Document) -> MimeKind {
        let content = document.content();
        if content.starts_with(b"%PDF-") {
            MimeKind::Pdf
        } else if content.starts_with(&[0xFF, 0xD8, 0xFF]) {
            MimeKind::Jpeg
        } else if content.starts_with(b"\x89PNG\r\n\x1a\n") {
            MimeKind::Png
        } else if let Some(root) = xdc::root_element(content) {
            if root.local_name == "XMLDataContainer" {
                MimeKind::Xdc
            } else {
                MimeKind::Xml
            }
        } else {
            MimeKind::Other
        }
    }
}
