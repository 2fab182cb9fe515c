//! ASiC container inspection.
//!
//! Only reading is done here: the enclosed original document is needed for
//! classification and visualization. Building containers is the signature
//! service's job.

use crate::domain::document::Document;
use crate::domain::mime::MimeType;
use crate::infra::error::{SigningError, SigningResult};
use std::io::{Cursor, Read};
use zip::ZipArchive;

const META_INF: &str = "META-INF/";
const MIMETYPE_ENTRY: &str = "mimetype";
/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_PREALLOCATION: usize = 1 << 20;

/// Extract the single original document enclosed in an ASiC container.
///
/// # Errors
/// `OriginalDocumentNotFound` when the container holds no data object,
/// `MultipleOriginalDocuments` when it holds more than one, and a request
/// validation error when the bytes are not a readable ZIP archive.
pub fn extract_original(container: &Document) -> SigningResult<Document> {
    let mut archive = ZipArchive::new(Cursor::new(container.content())).map_err(|e| {
        SigningError::request_validation_with("Unable to read ASiC container", e.to_string())
    })?;

    let mut original: Option<(String, Vec<u8>)> = None;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| {
            SigningError::request_validation_with("Unable to read ASiC entry", e.to_string())
        })?;
        let name = entry.name().to_string();
        if entry.is_dir() || name.starts_with(META_INF) || name == MIMETYPE_ENTRY {
            continue;
        }
        if original.is_some() {
            return Err(SigningError::MultipleOriginalDocuments);
        }

        let mut content = Vec::with_capacity(initial_capacity(entry.size()));
        entry.read_to_end(&mut content)?;
        original = Some((name, content));
    }

    let (name, content) = original.ok_or(SigningError::OriginalDocumentNotFound)?;
    log::debug!("Extracted original document {name} ({} bytes) from ASiC", content.len());
    let mime = MimeType::from_filename(&name);
    Ok(Document::new(content, Some(name), mime))
}

/// The declared size comes from the container itself and is only a hint.
fn initial_capacity(declared: u64) -> usize {
    usize::try_from(declared)
        .unwrap_or(usize::MAX)
        .min(MAX_PREALLOCATION)
}
