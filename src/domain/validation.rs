//! Results reported by the signature validator.

use super::level::ContainerKind;
use serde::{Deserialize, Serialize};

/// Signature already present on a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingSignature {
    /// Signature form as reported, e.g. `XAdES`, `PAdES`, `PKCS7`.
    pub form: String,
    pub container: Option<ContainerKind>,
}

/// Opaque validation report passed through to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationReport(pub serde_json::Value);
