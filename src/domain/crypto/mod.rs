//! Foundational cryptographic domain types.
//!
//! Provides strongly-typed wrappers for cryptographic artifacts including:
//! - Digest algorithms and digest values with size validation
//! - Parsed signing certificates
//! - Signature values with their algorithm
//!
//! The gateway never computes signatures itself; these types carry what the
//! caller and the signature service exchange.

mod cert;
mod digest_bytes;
mod hash;
mod signature;

pub use cert::CertificateToken;
pub use digest_bytes::{DigestBytes, DigestBytesError};
pub use hash::DigestAlgorithm;
pub use signature::{KeyAlgorithm, SignatureAlgorithm, SignatureValue};
