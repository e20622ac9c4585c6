//! Configuration loading and validation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use warden_discovery::ScannerConfig;

/// Environment variable carrying the attestation authority service address
pub const AUTHORITY_ENV: &str = "DICE_AUTH_SERVICE_PORT";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub attestation: AttestationSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for the discovery API
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Addresses probed at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// HTTP port devices listen on
    #[serde(default = "default_device_port")]
    pub device_port: u16,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            request_timeout_ms: default_request_timeout_ms(),
            device_port: default_device_port(),
        }
    }
}

fn default_max_concurrency() -> usize {
    10
}

fn default_request_timeout_ms() -> u64 {
    3000
}

fn default_device_port() -> u16 {
    80
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttestationSection {
    /// Attestation authority URL (overridden by `DICE_AUTH_SERVICE_PORT`)
    #[serde(default)]
    pub authority_url: Option<String>,
}

impl Config {
    /// Convert to ScannerConfig
    pub fn to_scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            max_concurrency: self.discovery.max_concurrency,
            request_timeout_ms: self.discovery.request_timeout_ms,
            device_port: self.discovery.device_port,
            authority_url: self.attestation.authority_url.clone(),
        }
    }

    /// Apply the authority address from the environment, if set
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(AUTHORITY_ENV) {
            self.apply_authority_env(&value);
        }
    }

    fn apply_authority_env(&mut self, value: &str) {
        if let Some(url) = authority_url_from_env(value) {
            info!(url = %url, "Using attestation authority from environment");
            self.attestation.authority_url = Some(url);
        }
    }
}

/// Turn a service address such as `tcp://10.96.0.12:8000` into an HTTP URL
pub fn authority_url_from_env(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.replace("tcp", "http"))
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        config
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Config::default()
    };
    config.apply_env();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.daemon.bind, "0.0.0.0:8080");
        let scanner = config.to_scanner_config();
        assert_eq!(scanner.max_concurrency, 10);
        assert_eq!(scanner.request_timeout_ms, 3000);
        assert_eq!(scanner.device_port, 80);
        assert!(scanner.authority_url.is_none());
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[discovery]
max_concurrency = 32

[attestation]
authority_url = "http://dice-auth:8000/verify"
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.discovery.max_concurrency, 32);
        assert_eq!(config.discovery.request_timeout_ms, 3000);
        assert!(config.attestation.authority_url.is_some());
    }

    #[test]
    fn test_authority_url_from_env() {
        assert_eq!(
            authority_url_from_env("tcp://10.96.0.12:8000").as_deref(),
            Some("http://10.96.0.12:8000")
        );
        assert_eq!(authority_url_from_env("  "), None);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::default();
        config.attestation.authority_url = Some("http://file:1".to_string());
        config.apply_authority_env("tcp://env:2");
        assert_eq!(config.to_scanner_config().authority_url.as_deref(), Some("http://env:2"));
    }
}
