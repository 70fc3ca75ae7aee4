//! Client configuration.
//!
//! The configuration is layered with `figment`: built-in defaults, then an
//! optional YAML file, then environment variables prefixed with
//! `CRAWLERVERSE_`. Nested keys are separated by a double underscore.
//!
//! # Configuration File Format
//!
//! ```yaml
//! # API key, better provided through CRAWLERVERSE_API_KEY
//! api_key: "cra_..."
//!
//! # Base URL of the agent API
//! base_url: "https://crawlerver.se/api/agent"
//!
//! # Per-request timeout in seconds
//! timeout_secs: 30
//!
//! # Backoff of idempotent requests
//! retry:
//!   max_attempts: 3
//!   base_delay_ms: 500
//!   max_delay_ms: 10000
//!   jitter: 0.1
//! ```
//!
//! # Environment Variable Overrides
//!
//! ```bash
//! export CRAWLERVERSE_API_KEY="cra_..."
//! export CRAWLERVERSE_BASE_URL="http://localhost:3000/api/agent"
//! export CRAWLERVERSE_RETRY__MAX_ATTEMPTS=5
//! ```

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Prefix of every environment variable read by the configuration.
pub const ENV_PREFIX: &str = "CRAWLERVERSE_";
/// Environment variable holding the API key fallback.
pub const API_KEY_ENV: &str = "CRAWLERVERSE_API_KEY";
/// Production endpoint of the agent API.
pub const DEFAULT_BASE_URL: &str = "https://crawlerver.se/api/agent";

/// Root configuration of a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Bearer credential attached to every request.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the agent API, without trailing slash.
    ///
    /// # Examples
    ///
    /// - `https://crawlerver.se/api/agent`
    /// - `http://localhost:3000/api/agent`
    pub base_url: String,

    /// Timeout of a single HTTP request, in seconds.
    ///
    /// A request that times out is reported as a network error and follows
    /// the normal retry policy.
    pub timeout_secs: u64,

    /// Backoff settings of idempotent requests.
    pub retry: RetryConfig,
}

/// Retry settings, see [`crate::api::RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts, the first one included.
    pub max_attempts: u32,
    /// Wait before the first retry, in milliseconds. Doubles on every retry.
    pub base_delay_ms: u64,
    /// Upper bound of a single wait, in milliseconds.
    pub max_delay_ms: u64,
    /// Random extra wait, as a fraction of the computed delay.
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            jitter: 0.1,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_secs: 30,
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Builds the configuration from defaults and `CRAWLERVERSE_*` variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self::figment(None).extract()?)
    }

    /// Builds the configuration from defaults, a YAML file and
    /// `CRAWLERVERSE_*` variables, in increasing priority.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML file. A missing file is treated as empty.
    pub fn load(path: &str) -> Result<Self> {
        Ok(Self::figment(Some(path)).extract()?)
    }

    fn figment(path: Option<&str>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(ClientConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Overrides the API key when one is given explicitly.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        if api_key.is_some() {
            self.api_key = api_key;
        }
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns the API key, failing fast when none is configured.
    pub fn api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ClientError::MissingCredential {
                env_var: API_KEY_ENV,
            }),
        }
    }

    /// Base URL with any trailing slash removed.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn clear_env() {
        // SAFETY: tests touching the environment are serialized
        unsafe {
            std::env::remove_var(API_KEY_ENV);
            std::env::remove_var("CRAWLERVERSE_BASE_URL");
            std::env::remove_var("CRAWLERVERSE_RETRY__MAX_ATTEMPTS");
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        // SAFETY: serialized test
        unsafe {
            std::env::set_var(API_KEY_ENV, "cra_env");
            std::env::set_var("CRAWLERVERSE_BASE_URL", "http://localhost:3000/api/agent/");
            std::env::set_var("CRAWLERVERSE_RETRY__MAX_ATTEMPTS", "5");
        }
        let config = ClientConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.api_key().unwrap(), "cra_env");
        assert_eq!(config.normalized_base_url(), "http://localhost:3000/api/agent");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 500);
    }

    #[test]
    #[serial]
    fn test_explicit_key_wins_over_env() {
        clear_env();
        // SAFETY: serialized test
        unsafe {
            std::env::set_var(API_KEY_ENV, "cra_env");
        }
        let config = ClientConfig::from_env()
            .unwrap()
            .with_api_key(Some("cra_explicit".to_owned()));
        clear_env();
        assert_eq!(config.api_key().unwrap(), "cra_explicit");
    }

    #[test]
    #[serial]
    fn test_missing_credential() {
        clear_env();
        let config = ClientConfig::from_env().unwrap().with_api_key(None);
        let error = config.api_key().unwrap_err();
        assert!(matches!(
            error,
            ClientError::MissingCredential {
                env_var: API_KEY_ENV
            }
        ));
    }

    #[test]
    #[serial]
    fn test_load_yaml_file() {
        clear_env();
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api_key: \"cra_file\"\nbase_url: \"http://127.0.0.1:8080\"\ntimeout_secs: 5\nretry:\n  max_attempts: 4"
        )
        .unwrap();

        let config = ClientConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.api_key().unwrap(), "cra_file");
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.max_delay_ms, 10_000);
    }

    #[test]
    #[serial]
    fn test_invalid_yaml_value_is_config_error() {
        clear_env();
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "timeout_secs: \"soon\"").unwrap();

        let error = ClientConfig::load(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(error, ClientError::Config(_)));
    }
}
