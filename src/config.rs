//! Configuration management
//!
//! Loaded once at startup from an optional YAML file plus `CAMARA_`
//! prefixed environment variables; immutable for the process lifetime.

use std::{path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::registry::ApiVersion;
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Base URL of the CAMARA API aggregator
    pub base_url: String,
    /// Static bearer credential attached to every upstream call
    pub api_key: String,
    /// Upstream API generation to target
    pub version: ApiVersion,
    /// End-to-end timeout for one upstream call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist, cannot be
    /// parsed, or the resulting base URL is not a valid absolute URL.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (CAMARA_ prefix)
        figment = figment.merge(Env::prefixed("CAMARA_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that must hold before serving traffic
    fn validate(&self) -> Result<()> {
        if !self.base_url.is_empty() {
            url::Url::parse(&self.base_url)
                .map_err(|e| Error::Config(format!("Invalid base_url: {e}")))?;
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Whether a credential is configured (reported by /health, never the value)
    #[must_use]
    pub fn api_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            base_url: String::new(),
            api_key: String::new(),
            version: ApiVersion::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_surface() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.version, ApiVersion::Spring25);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.api_configured());
    }

    #[test]
    fn loads_yaml_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(
            file,
            "base_url: https://api.operator.example\napi_key: secret\nversion: fall25\ntimeout: 5s\nserver:\n  port: 9100"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.base_url, "https://api.operator.example");
        assert_eq!(config.version, ApiVersion::Fall25);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.server.port, 9100);
        assert!(config.api_configured());
    }

    #[test]
    fn rejects_malformed_base_url() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(file, "base_url: 'not a url'").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/gateway.yaml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
