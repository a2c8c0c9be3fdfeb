//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PASAR_API_URL` - Base URL of the Pasar REST backend
//! - `PASAR_API_TOKEN` - Bearer token for authenticated calls
//!
//! ## Optional
//! - `PASAR_HTTP_TIMEOUT_SECS` - Request timeout in seconds (default: 30)
//! - `PASAR_DETAIL_TTL_SECS` - Product-detail cache TTL in seconds (default: 60)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DETAIL_TTL_SECS: u64 = 60;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart client configuration.
///
/// Implements `Debug` manually to redact the bearer token.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the Pasar REST backend
    pub api_url: Url,
    /// Bearer token supplied by the session collaborator
    pub api_token: SecretString,
    /// Timeout applied to every HTTP request
    pub http_timeout: Duration,
    /// Time-to-live for cached product detail
    pub detail_ttl: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_token", &"[REDACTED]")
            .field("http_timeout", &self.http_timeout)
            .field("detail_ttl", &self.detail_ttl)
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Split out from [`Self::from_env`] so tests can supply a map instead
    /// of mutating the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value
    /// fails to parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = lookup("PASAR_API_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("PASAR_API_URL".to_string()))?;
        let api_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("PASAR_API_URL".to_string(), e.to_string()))?;
        if api_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "PASAR_API_URL".to_string(),
                format!("not a base URL: {raw_url}"),
            ));
        }

        let api_token = lookup("PASAR_API_TOKEN")
            .ok_or_else(|| ConfigError::MissingEnvVar("PASAR_API_TOKEN".to_string()))?
            .into();

        let http_timeout = duration_var(&lookup, "PASAR_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        let detail_ttl = duration_var(&lookup, "PASAR_DETAIL_TTL_SECS", DEFAULT_DETAIL_TTL_SECS)?;

        Ok(Self {
            api_url,
            api_token,
            http_timeout,
            detail_ttl,
        })
    }
}

fn duration_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default_secs: u64,
) -> Result<Duration, ConfigError> {
    let secs = match lookup(key) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?,
        None => default_secs,
    };
    Ok(Duration::from_secs(secs))
}

/// Convenience for building a config in tests and tools.
impl ClientConfig {
    /// Build a config from explicit values (used by tests and the CLI).
    #[must_use]
    pub fn new(api_url: Url, api_token: SecretString) -> Self {
        Self {
            api_url,
            api_token,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            detail_ttl: Duration::from_secs(DEFAULT_DETAIL_TTL_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn load(pairs: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let map = vars(pairs);
        ClientConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn loads_with_defaults() {
        let config = load(&[
            ("PASAR_API_URL", "https://api.pasar.dev"),
            ("PASAR_API_TOKEN", "tok"),
        ])
        .expect("config should load");

        assert_eq!(config.api_url.as_str(), "https://api.pasar.dev/");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.detail_ttl, Duration::from_secs(60));
    }

    #[test]
    fn missing_url_is_an_error() {
        let err = load(&[("PASAR_API_TOKEN", "tok")]).expect_err("should fail");
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "PASAR_API_URL"));
    }

    #[test]
    fn invalid_timeout_is_an_error() {
        let err = load(&[
            ("PASAR_API_URL", "https://api.pasar.dev"),
            ("PASAR_API_TOKEN", "tok"),
            ("PASAR_HTTP_TIMEOUT_SECS", "soon"),
        ])
        .expect_err("should fail");
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "PASAR_HTTP_TIMEOUT_SECS"));
    }

    #[test]
    fn rejects_non_base_urls() {
        let err = load(&[
            ("PASAR_API_URL", "mailto:eng@pasar.dev"),
            ("PASAR_API_TOKEN", "tok"),
        ])
        .expect_err("should fail");
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "PASAR_API_URL"));
    }

    #[test]
    fn debug_redacts_the_token() {
        let config = load(&[
            ("PASAR_API_URL", "https://api.pasar.dev"),
            ("PASAR_API_TOKEN", "super-secret"),
        ])
        .expect("config should load");

        let rendered = format!("{config:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("super-secret"));
    }
}
