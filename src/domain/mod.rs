//! Domain layer: documents, signature levels, eForm metadata and the
//! values exchanged by the signing protocol.
//!
//! Nothing here performs I/O; services and pipelines build on these types.

pub mod crypto;
pub mod document;
pub mod eform;
pub mod level;
pub mod mime;
pub mod params;
pub mod protocol;
pub mod types;
pub mod validation;
