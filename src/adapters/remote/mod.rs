//! Remote collaborators adapter.
//!
//! Connects the gateway to a backend that hosts the signature services,
//! the signature validator with its trusted lists, and the XML schema and
//! transformation engine, over a small versioned JSON protocol.

pub mod client;
pub mod protocol;
