//! Document value type.

use super::mime::{MimeKind, MimeType};
use std::fmt;

/// An input or output document. Transformations return new values.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    content: Vec<u8>,
    filename: Option<String>,
    mime: MimeType,
}

impl Document {
    #[must_use]
    pub fn new(content: Vec<u8>, filename: Option<String>, mime: MimeType) -> Self {
        Self {
            content,
            filename,
            mime,
        }
    }

    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    #[must_use]
    pub fn into_content(self) -> Vec<u8> {
        self.content
    }

    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    #[must_use]
    pub fn mime(&self) -> &MimeType {
        &self.mime
    }

    /// Kind of the declared media type.
    #[must_use]
    pub fn declared_kind(&self) -> MimeKind {
        self.mime.kind()
    }

    /// File name without its last extension.
    #[must_use]
    pub fn stem(&self) -> Option<&str> {
        self.filename
            .as_deref()
            .map(|name| name.rsplit_once('.').map_or(name, |(stem, _)| stem))
    }

    /// Last extension of the file name, if any.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.filename
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext)
    }

    #[must_use]
    pub fn with_mime(self, mime: MimeType) -> Self {
        Self { mime, ..self }
    }

    #[must_use]
    pub fn renamed(self, filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..self
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Document(name={:?}, mime={}, len={})",
            self.filename,
            self.mime,
            self.content.len()
        )
    }
}
