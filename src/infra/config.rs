//! Configuration management infrastructure.
//!
//! The gateway reads a single TOML file holding the listener address, the
//! timestamp authorities, resolution policy, worker and trust-list timing,
//! and the remote backend the external collaborators live behind.

use crate::domain::params::ResolutionPolicy;
use crate::domain::types::{TimestampSource, TimestampUrl};
use crate::infra::error::{SigningError, SigningResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Timestamp authorities used when none are configured.
pub const DEFAULT_TIMESTAMP_SERVERS: [&str; 6] = [
    "http://tsa.belgium.be/connect",
    "http://tsa.izenpe.com",
    "http://ts.quovadisglobal.com/eu",
    "http://tsa.sep.bg",
    "http://kstamp.keynectis.com/KSign",
    "https://timestamp.sectigo.com/qualified",
];

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfiguration {
    /// Address the HTTP server listens on
    pub bind_address: String,

    /// Timestamp authorities, tried in order, for levels above baseline B
    pub timestamp_servers: Vec<String>,

    /// Allow signing XML that is not a known eForm
    pub plain_xml_enabled: bool,

    /// Upper bound of concurrently processed requests
    pub worker_threads: usize,

    /// Period of the trusted list refresh
    pub trust_list_refresh_minutes: u64,

    /// How long validation waits for the first trusted list load
    pub trust_list_wait_seconds: u64,

    /// Bearer token required from callers, if set
    pub auth_token: Option<String>,

    /// Directory of eForm definitions
    pub form_registry_dir: Option<PathBuf>,

    /// Backend providing signature, validation and XML services
    pub backend: BackendConfig,
}

/// Remote backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub timeout_secs: u64,
    pub verify_tls: bool,
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:7200".to_string(),
            timestamp_servers: DEFAULT_TIMESTAMP_SERVERS
                .iter()
                .map(ToString::to_string)
                .collect(),
            plain_xml_enabled: false,
            worker_threads: 8,
            trust_list_refresh_minutes: 480,
            trust_list_wait_seconds: 30,
            auth_token: None,
            form_registry_dir: None,
            backend: BackendConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8090".to_string(),
            auth_token: None,
            timeout_secs: 30,
            verify_tls: true,
        }
    }
}

impl ServerConfiguration {
    /// Parsed listener address.
    ///
    /// # Errors
    /// `Configuration` when the address does not parse.
    pub fn bind_addr(&self) -> SigningResult<SocketAddr> {
        self.bind_address.parse().map_err(|e| {
            SigningError::Configuration(format!(
                "Invalid bind address '{}': {e}",
                self.bind_address
            ))
        })
    }

    /// Timestamp source, or `None` when the list is empty.
    ///
    /// # Errors
    /// `Configuration` for invalid URLs.
    pub fn timestamp_source(&self) -> SigningResult<Option<TimestampSource>> {
        if self.timestamp_servers.is_empty() {
            return Ok(None);
        }
        TimestampSource::from_urls(&self.timestamp_servers).map(Some)
    }

    /// # Errors
    /// `Configuration` for invalid timestamp server URLs.
    pub fn resolution_policy(&self) -> SigningResult<ResolutionPolicy> {
        Ok(ResolutionPolicy {
            plain_xml_enabled: self.plain_xml_enabled,
            timestamp_source: self.timestamp_source()?,
        })
    }

    #[must_use]
    pub fn trust_list_refresh(&self) -> Duration {
        Duration::from_secs(self.trust_list_refresh_minutes * 60)
    }

    #[must_use]
    pub fn trust_list_wait(&self) -> Duration {
        Duration::from_secs(self.trust_list_wait_seconds)
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    ///
    /// # Errors
    /// Never fails today; kept fallible for platform lookups.
    pub fn new() -> SigningResult<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    ///
    /// # Errors
    /// Never fails today; kept fallible for platform lookups.
    pub fn default_config_path() -> SigningResult<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("signing-gateway").join("config.toml"))
        } else {
            Ok(PathBuf::from("signing-gateway.toml"))
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    ///
    /// # Errors
    /// Read, parse, validation or write failures.
    pub fn load_or_create_default(&self) -> SigningResult<ServerConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = ServerConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file
    ///
    /// # Errors
    /// Read, parse or validation failures.
    pub fn load(&self) -> SigningResult<ServerConfiguration> {
        log::info!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            SigningError::Configuration(format!(
                "Failed to read config file {}: {e}",
                self.config_path.display()
            ))
        })?;

        let config: ServerConfiguration = toml::from_str(&content).map_err(|e| {
            SigningError::Configuration(format!("Failed to parse config file: {e}"))
        })?;

        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    ///
    /// # Errors
    /// Serialization or write failures.
    pub fn save(&self, config: &ServerConfiguration) -> SigningResult<()> {
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SigningError::Configuration(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            SigningError::Configuration(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            SigningError::Configuration(format!(
                "Failed to write config file {}: {e}",
                self.config_path.display()
            ))
        })?;

        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Errors
    /// `Configuration` describing the first invalid value.
    pub fn validate_config(config: &ServerConfiguration) -> SigningResult<()> {
        config.bind_addr()?;
        for url in &config.timestamp_servers {
            TimestampUrl::new(url)?;
        }

        if config.worker_threads == 0 {
            return Err(SigningError::Configuration(
                "Worker threads must be greater than 0".to_string(),
            ));
        }
        if config.trust_list_refresh_minutes == 0 {
            return Err(SigningError::Configuration(
                "Trust list refresh period must be greater than 0".to_string(),
            ));
        }
        if config.backend.timeout_secs == 0 {
            return Err(SigningError::Configuration(
                "Backend timeout must be greater than 0".to_string(),
            ));
        }
        if !config.backend.base_url.starts_with("http://")
            && !config.backend.base_url.starts_with("https://")
        {
            return Err(SigningError::Configuration(format!(
                "Backend URL must use http or https: {}",
                config.backend.base_url
            )));
        }

        Ok(())
    }

    /// Update a specific configuration value
    ///
    /// # Errors
    /// Unknown keys, unparsable values, or load/save failures.
    pub fn update_value(&self, key: &str, value: &str) -> SigningResult<()> {
        let mut config = self.load_or_create_default()?;

        match key {
            "bind_address" => config.bind_address = value.to_string(),
            "timestamp_servers" => {
                config.timestamp_servers = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect();
            }
            "plain_xml_enabled" => config.plain_xml_enabled = parse_bool(value)?,
            "worker_threads" => config.worker_threads = parse_number(value)?,
            "trust_list_refresh_minutes" => {
                config.trust_list_refresh_minutes = parse_number(value)?;
            }
            "trust_list_wait_seconds" => config.trust_list_wait_seconds = parse_number(value)?,
            "auth_token" => config.auth_token = non_empty(value),
            "form_registry_dir" => config.form_registry_dir = non_empty(value).map(PathBuf::from),
            "backend.base_url" => config.backend.base_url = value.to_string(),
            "backend.auth_token" => config.backend.auth_token = non_empty(value),
            "backend.timeout_secs" => config.backend.timeout_secs = parse_number(value)?,
            "backend.verify_tls" => config.backend.verify_tls = parse_bool(value)?,
            _ => {
                return Err(SigningError::Configuration(format!(
                    "Unknown configuration key: {key}"
                )));
            }
        }

        Self::validate_config(&config)?;
        self.save(&config)
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

fn parse_bool(value: &str) -> SigningResult<bool> {
    value
        .parse()
        .map_err(|_| SigningError::Configuration(format!("Invalid boolean value: {value}")))
}

fn parse_number<T: std::str::FromStr>(value: &str) -> SigningResult<T> {
    value
        .parse()
        .map_err(|_| SigningError::Configuration(format!("Invalid number: {value}")))
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_configuration() {
        let config = ServerConfiguration::default();
        assert_eq!(config.bind_address, "127.0.0.1:7200");
        assert_eq!(config.timestamp_servers.len(), 6);
        assert!(!config.plain_xml_enabled);
        assert_eq!(config.trust_list_refresh(), Duration::from_secs(480 * 60));
        ConfigManager::validate_config(&config).unwrap();
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ServerConfiguration = toml::from_str(
            r#"
            plain_xml_enabled = true
            [backend]
            base_url = "https://dss.internal:8443"
            "#,
        )
        .unwrap();
        assert!(config.plain_xml_enabled);
        assert_eq!(config.backend.base_url, "https://dss.internal:8443");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.worker_threads, 8);
    }

    #[test]
    fn test_config_manager_with_temp_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("gateway.toml");
        let manager = ConfigManager::with_path(&config_path);

        let config = manager.load_or_create_default().unwrap();
        assert!(config_path.exists());

        let loaded = manager.load().unwrap();
        assert_eq!(config.bind_address, loaded.bind_address);
        assert_eq!(config.timestamp_servers, loaded.timestamp_servers);
    }

    #[test]
    fn test_update_value() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("gateway.toml"));

        manager.update_value("plain_xml_enabled", "true").unwrap();
        manager
            .update_value("timestamp_servers", "http://tsa.one, http://tsa.two")
            .unwrap();
        manager.update_value("backend.verify_tls", "false").unwrap();

        let config = manager.load().unwrap();
        assert!(config.plain_xml_enabled);
        assert_eq!(config.timestamp_servers, vec!["http://tsa.one", "http://tsa.two"]);
        assert!(!config.backend.verify_tls);
        assert!(config.timestamp_source().unwrap().is_some());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("gateway.toml"));

        assert!(manager.update_value("worker_threads", "0").is_err());
        assert!(manager.update_value("bind_address", "nowhere").is_err());
        assert!(manager.update_value("timestamp_servers", "ftp://tsa").is_err());
        assert!(manager.update_value("no_such_key", "1").is_err());
    }
}
