//! Signing Gateway Library
//!
//! Resolves signing parameters for documents (PDF, XML, eForms, XML data
//! containers, ASiC containers, images and text), drives the two-phase
//! remote signing protocol (data to sign, then signature assembly) and
//! renders human-readable previews of what is being signed.
//!
//! Signature services, the signature validator and the XML engine are
//! collaborators behind traits; [`adapters::remote`] connects them to an
//! HTTP backend and [`adapters::http`] exposes the gateway to callers.

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod pipelines;
pub mod services;

pub use domain::crypto::CertificateToken;
pub use domain::document::Document;
pub use domain::mime::{MimeKind, MimeType};
pub use domain::params::{CallerParameters, ResolutionPolicy, ResolvedSigningParameters};
pub use domain::protocol::{DataToSignStructure, SignedDocumentResult};
pub use domain::types::TimestampSource;
pub use infra::config::{ConfigManager, ServerConfiguration};
pub use infra::error::{SigningError, SigningResult};
pub use pipelines::gateway::{Collaborators, SigningGateway, SigningRequest};
pub use services::eform::FormRegistry;
pub use services::signature::{SignatureService, SignatureServiceProvider};
pub use services::validation::{SignatureValidator, ValidationFacade};
pub use services::xml_engine::XmlEngine;
