//! Gateway HTTP API.
//!
//! [`protocol`] holds the JSON bodies and is always built; the warp server
//! needs the `server` feature.

pub mod protocol;

#[cfg(feature = "server")]
pub mod server;
