//! Pre-signing document transformation.

use crate::domain::document::Document;
use crate::domain::mime::{self, MimeKind, MimeType};
use crate::domain::params::ResolvedSigningParameters;
use crate::infra::error::SigningResult;
use crate::services::classifier::MimeClassifier;
use crate::services::xdc;

pub struct ContainerTransformer;

impl ContainerTransformer {
    /// Produce the document that is actually signed.
    ///
    /// XML is wrapped into an XML data container when the parameters ask for
    /// one and the document is neither an XDC nor an ASiC container; the
    /// result is renamed to `<stem>.xdcf`. Plain text is re-tagged with an
    /// explicit UTF-8 charset. Applying `wrap` to its own output returns it
    /// unchanged.
    ///
    /// # Errors
    /// Container construction failures.
    pub fn wrap(
        document: &Document,
        params: &ResolvedSigningParameters,
    ) -> SigningResult<Document> {
        let kind = MimeClassifier::classify(document);

        if params.should_create_xdc() && kind != MimeKind::Xdc && !kind.is_asic() {
            let content = xdc::build_xdc(document.content(), params)?;
            let filename = document.stem().map(|stem| format!("{stem}.xdcf"));
            log::debug!(
                "Wrapped {:?} into XML data container {filename:?}",
                document.filename()
            );
            return Ok(Document::new(content, filename, MimeType::of(MimeKind::Xdc)));
        }

        if kind == MimeKind::Text {
            return Ok(document.clone().with_mime(MimeType::parse(mime::TEXT_UTF8)));
        }

        Ok(document.clone())
    }
}
