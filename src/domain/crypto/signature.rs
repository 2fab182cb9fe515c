use std::fmt;

use super::DigestAlgorithm;

/// Public key algorithm of a signing certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Rsa,
    Ecdsa,
}

impl KeyAlgorithm {
    pub(crate) const RSA_OID: &'static str = "1.2.840.113549.1.1.1";
    pub(crate) const EC_OID: &'static str = "1.2.840.10045.2.1";

    #[must_use]
    pub fn from_oid(oid: &str) -> Option<Self> {
        match oid {
            Self::RSA_OID => Some(KeyAlgorithm::Rsa),
            Self::EC_OID => Some(KeyAlgorithm::Ecdsa),
            _ => None,
        }
    }
}

/// Signature algorithm: key algorithm combined with a digest algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureAlgorithm {
    pub key: KeyAlgorithm,
    pub digest: DigestAlgorithm,
}

impl SignatureAlgorithm {
    #[must_use]
    pub fn new(key: KeyAlgorithm, digest: DigestAlgorithm) -> Self {
        Self { key, digest }
    }

    /// Name in the `RSA_SHA256` style.
    #[must_use]
    pub fn name(&self) -> String {
        let key = match self.key {
            KeyAlgorithm::Rsa => "RSA",
            KeyAlgorithm::Ecdsa => "ECDSA",
        };
        format!("{key}_{}", self.digest)
    }

    /// Map an X.509 `signatureAlgorithm` OID.
    #[must_use]
    pub fn from_oid(oid: &str) -> Option<Self> {
        let (key, digest) = match oid {
            "1.2.840.113549.1.1.11" => (KeyAlgorithm::Rsa, DigestAlgorithm::Sha256),
            "1.2.840.113549.1.1.12" => (KeyAlgorithm::Rsa, DigestAlgorithm::Sha384),
            "1.2.840.113549.1.1.13" => (KeyAlgorithm::Rsa, DigestAlgorithm::Sha512),
            "1.2.840.10045.4.3.2" => (KeyAlgorithm::Ecdsa, DigestAlgorithm::Sha256),
            "1.2.840.10045.4.3.3" => (KeyAlgorithm::Ecdsa, DigestAlgorithm::Sha384),
            "1.2.840.10045.4.3.4" => (KeyAlgorithm::Ecdsa, DigestAlgorithm::Sha512),
            _ => return None,
        };
        Some(Self::new(key, digest))
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Raw signature value produced by the caller over the data to sign.
#[derive(Clone, Eq, PartialEq)]
pub struct SignatureValue {
    algorithm: SignatureAlgorithm,
    bytes: Box<[u8]>,
}

impl SignatureValue {
    #[must_use]
    pub fn new(algorithm: SignatureAlgorithm, bytes: Vec<u8>) -> Self {
        Self {
            algorithm,
            bytes: bytes.into_boxed_slice(),
        }
    }
    #[must_use]
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SignatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SignatureValue(algo={}, len={})",
            self.algorithm,
            self.bytes.len()
        )
    }
}
