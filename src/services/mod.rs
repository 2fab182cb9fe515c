//! Service layer: classification, eForm discovery, parameter resolution,
//! container handling and the boundaries to external collaborators.

pub mod asic;
pub mod cert_validator;
pub mod classifier;
pub mod container;
pub mod eform;
pub mod resolver;
pub mod signature;
pub mod validation;
pub mod xdc;
pub mod xml_engine;
