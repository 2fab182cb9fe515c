//! Adapter layer modules for external system integration.
//!
//! Provides adapters for:
//! - The gateway HTTP API (request bodies and the warp server)
//! - The remote backend hosting signature services, validation and XSLT
//! - A directory-backed eForm registry

pub mod http;
pub mod registry;
pub mod remote;
