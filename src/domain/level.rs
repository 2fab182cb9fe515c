//! Signature level, container and packaging domain types.

use crate::infra::error::{SigningError, SigningResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Signature format family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureForm {
    XAdES,
    CAdES,
    PAdES,
    JAdES,
}

impl SignatureForm {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SignatureForm::XAdES => "XAdES",
            SignatureForm::CAdES => "CAdES",
            SignatureForm::PAdES => "PAdES",
            SignatureForm::JAdES => "JAdES",
        }
    }
}

impl FromStr for SignatureForm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "XAdES" => Ok(SignatureForm::XAdES),
            "CAdES" => Ok(SignatureForm::CAdES),
            "PAdES" => Ok(SignatureForm::PAdES),
            "JAdES" => Ok(SignatureForm::JAdES),
            other => Err(SigningError::UnsupportedSignatureLevel(other.to_string())),
        }
    }
}

impl fmt::Display for SignatureForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Baseline profile tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignatureTier {
    #[default]
    B,
    T,
}

impl SignatureTier {
    /// Whether the tier embeds a signature timestamp.
    #[must_use]
    pub fn requires_timestamp(self) -> bool {
        matches!(self, SignatureTier::T)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SignatureTier::B => "B",
            SignatureTier::T => "T",
        }
    }
}

/// Fully specified signature level, e.g. `XAdES_BASELINE_B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureLevel {
    pub form: SignatureForm,
    pub tier: SignatureTier,
}

impl SignatureLevel {
    #[must_use]
    pub fn new(form: SignatureForm, tier: SignatureTier) -> Self {
        Self { form, tier }
    }
}

impl fmt::Display for SignatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_BASELINE_{}", self.form, self.tier.as_str())
    }
}

/// Level as requested by a caller: either fully specified, or only a tier
/// (possibly none) to be completed from the document's existing signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedLevel {
    Full(SignatureLevel),
    Partial(Option<SignatureTier>),
}

impl RequestedLevel {
    /// Parse the caller's level string. Anything outside the supported
    /// baseline B/T levels is rejected.
    pub fn parse(raw: Option<&str>) -> SigningResult<Self> {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Ok(RequestedLevel::Partial(None)),
            Some(value) => value,
        };

        match raw {
            "B" => return Ok(RequestedLevel::Partial(Some(SignatureTier::B))),
            "T" => return Ok(RequestedLevel::Partial(Some(SignatureTier::T))),
            _ => {}
        }

        let unsupported = || SigningError::UnsupportedSignatureLevel(raw.to_string());
        let (form, tier) = raw.split_once("_BASELINE_").ok_or_else(unsupported)?;
        let form = form.parse::<SignatureForm>().map_err(|_| unsupported())?;
        let tier = match tier {
            "B" => SignatureTier::B,
            "T" => SignatureTier::T,
            _ => return Err(unsupported()),
        };
        Ok(RequestedLevel::Full(SignatureLevel::new(form, tier)))
    }
}

/// Associated Signature Container type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    #[serde(rename = "ASiC_S", alias = "ASIC_S")]
    AsicS,
    #[serde(rename = "ASiC_E", alias = "ASIC_E")]
    AsicE,
}

impl ContainerKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContainerKind::AsicS => "ASiC_S",
            ContainerKind::AsicE => "ASiC_E",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placement of the signature relative to the signed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Packaging {
    #[default]
    Enveloped,
    Enveloping,
    Detached,
    InternallyDetached,
}

impl Packaging {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Packaging::Enveloped => "ENVELOPED",
            Packaging::Enveloping => "ENVELOPING",
            Packaging::Detached => "DETACHED",
            Packaging::InternallyDetached => "INTERNALLY_DETACHED",
        }
    }
}

/// XML canonicalization algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CanonicalizationMethod {
    #[default]
    #[serde(rename = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315")]
    Inclusive,
    #[serde(rename = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments")]
    InclusiveWithComments,
    #[serde(rename = "http://www.w3.org/2001/10/xml-exc-c14n#")]
    Exclusive,
    #[serde(rename = "http://www.w3.org/2001/10/xml-exc-c14n#WithComments")]
    ExclusiveWithComments,
    #[serde(rename = "http://www.w3.org/2006/12/xml-c14n11")]
    Inclusive11,
    #[serde(rename = "http://www.w3.org/2006/12/xml-c14n11#WithComments")]
    Inclusive11WithComments,
}

impl CanonicalizationMethod {
    #[must_use]
    pub fn uri(self) -> &'static str {
        match self {
            CanonicalizationMethod::Inclusive => "http://www.w3.org/TR/2001/REC-xml-c14n-20010315",
            CanonicalizationMethod::InclusiveWithComments => {
                "http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments"
            }
            CanonicalizationMethod::Exclusive => "http://www.w3.org/2001/10/xml-exc-c14n#",
            CanonicalizationMethod::ExclusiveWithComments => {
                "http://www.w3.org/2001/10/xml-exc-c14n#WithComments"
            }
            CanonicalizationMethod::Inclusive11 => "http://www.w3.org/2006/12/xml-c14n11",
            CanonicalizationMethod::Inclusive11WithComments => {
                "http://www.w3.org/2006/12/xml-c14n11#WithComments"
            }
        }
    }
}
