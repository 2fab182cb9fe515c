//! Type-safe wrappers using the new-type pattern.

use crate::infra::error::{SigningError, SigningResult};
use std::fmt;
use std::str::FromStr;

/// Type-safe wrapper for timestamp authority URLs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimestampUrl(String);

impl TimestampUrl {
    /// Create a new `TimestampUrl` after validation
    ///
    /// # Errors
    /// Returns `SigningError::Configuration` for anything that is not an
    /// absolute http(s) URL with a host.
    pub fn new(url: impl AsRef<str>) -> SigningResult<Self> {
        let url = url.as_ref().trim();
        Self::validate_url(url)?;
        Ok(TimestampUrl(url.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate_url(url: &str) -> SigningResult<()> {
        let Some(rest) = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
        else {
            return Err(SigningError::Configuration(format!(
                "Timestamp URL must start with http:// or https://, got: {url}"
            )));
        };

        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(SigningError::Configuration(format!(
                "Timestamp URL must contain a host: {url}"
            )));
        }

        Ok(())
    }
}

impl FromStr for TimestampUrl {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TimestampUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered list of timestamp authorities, tried in order by the signature
/// service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampSource {
    servers: Vec<TimestampUrl>,
}

impl TimestampSource {
    /// # Errors
    /// Returns `SigningError::Configuration` when no server is given.
    pub fn new(servers: Vec<TimestampUrl>) -> SigningResult<Self> {
        if servers.is_empty() {
            return Err(SigningError::Configuration(
                "At least one timestamp server is required".to_string(),
            ));
        }
        Ok(Self { servers })
    }

    /// Parse and validate a list of URLs.
    ///
    /// # Errors
    /// Returns the first URL validation error, or an error for an empty list.
    pub fn from_urls<S: AsRef<str>>(urls: &[S]) -> SigningResult<Self> {
        let servers = urls
            .iter()
            .map(TimestampUrl::new)
            .collect::<SigningResult<Vec<_>>>()?;
        Self::new(servers)
    }

    #[must_use]
    pub fn servers(&self) -> &[TimestampUrl] {
        &self.servers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_url_validation() {
        assert!(TimestampUrl::new("http://tsa.belgium.be/connect").is_ok());
        assert!(TimestampUrl::new("https://timestamp.sectigo.com/qualified").is_ok());
        assert!(TimestampUrl::new("http://localhost:3180").is_ok());

        assert!(TimestampUrl::new("ftp://tsa.example.com").is_err());
        assert!(TimestampUrl::new("https://").is_err());
        assert!(TimestampUrl::new("tsa.example.com").is_err());
    }

    #[test]
    fn test_timestamp_source_requires_servers() {
        let empty: [&str; 0] = [];
        assert!(TimestampSource::from_urls(&empty).is_err());

        let source =
            TimestampSource::from_urls(&["http://tsa.sep.bg", "http://tsa.izenpe.com"]).unwrap();
        assert_eq!(source.servers().len(), 2);
        assert_eq!(source.servers()[0].as_str(), "http://tsa.sep.bg");
    }
}
