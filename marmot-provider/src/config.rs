//! Provider configuration
//!
//! The configuration is read once at startup (from the configuration file,
//! with environment fallbacks) and validated into [`ClientSettings`], which
//! is then passed by reference to the HTTP client.

use std::fmt;
use std::time::Duration;

use marmot_core::provider::Diagnostic;
use serde::Deserialize;

/// Path prefix of every catalog API endpoint
pub const API_BASE_PATH: &str = "/api/v1";

/// Header carrying the API key (`X-API-Key`; header names are case-insensitive)
pub const API_KEY_HEADER: &str = "x-api-key";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const HOST_ENV: &str = "MARMOT_HOST";
pub const API_KEY_ENV: &str = "MARMOT_API_KEY";

/// Provider configuration as declared by the user
#[derive(Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// Marmot API host URL, with or without scheme
    pub host: Option<String>,
    /// Marmot API key for authentication
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("host", &self.host)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            api_key: Some(api_key.into()),
            timeout_secs: None,
        }
    }

    /// Fill unset values from the environment
    ///
    /// `lookup` is normally `|k| std::env::var(k).ok()`.
    pub fn with_env_fallback(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if is_blank(&self.host) {
            self.host = lookup(HOST_ENV);
        }
        if is_blank(&self.api_key) {
            self.api_key = lookup(API_KEY_ENV);
        }
        self
    }

    /// Validate the configuration, reporting one diagnostic per missing value
    pub fn validate(&self) -> Result<ClientSettings, Vec<Diagnostic>> {
        let mut diagnostics = Vec::new();

        if is_blank(&self.host) {
            diagnostics.push(
                Diagnostic::error(
                    "Missing Marmot API Host",
                    "The provider cannot create the Marmot API client without a host",
                )
                .for_attribute("host"),
            );
        }

        if is_blank(&self.api_key) {
            diagnostics.push(
                Diagnostic::error(
                    "Missing Marmot API Key",
                    "The provider cannot create the Marmot API client without an API key",
                )
                .for_attribute("api_key"),
            );
        }

        match (&self.host, &self.api_key) {
            (Some(host), Some(api_key)) if diagnostics.is_empty() => {
                let (scheme, host) = split_scheme(host);
                let host = host.trim_end_matches('/').to_string();
                Ok(ClientSettings {
                    base_url: format!("{}://{}{}", scheme, host, API_BASE_PATH),
                    host,
                    api_key: api_key.clone(),
                    timeout: Duration::from_secs(
                        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
                    ),
                })
            }
            _ => Err(diagnostics),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

/// Split an optional `http://` / `https://` prefix off a host
///
/// Hosts without a scheme default to https.
pub fn split_scheme(host: &str) -> (&'static str, &str) {
    if let Some(rest) = host.strip_prefix("http://") {
        ("http", rest)
    } else if let Some(rest) = host.strip_prefix("https://") {
        ("https", rest)
    } else {
        ("https", host)
    }
}

/// Validated settings used to build the catalog client
#[derive(Clone)]
pub struct ClientSettings {
    /// Host without scheme
    pub host: String,
    /// `{scheme}://{host}/api/v1`
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("host", &self.host)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_host_and_key_report_one_diagnostic_each() {
        let diagnostics = ProviderConfig::default().validate().unwrap_err();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].summary, "Missing Marmot API Host");
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("host"));
        assert_eq!(diagnostics[1].summary, "Missing Marmot API Key");
        assert_eq!(diagnostics[1].attribute.as_deref(), Some("api_key"));
    }

    #[test]
    fn blank_key_is_missing() {
        let config = ProviderConfig::new("catalog.internal", "  ");
        let diagnostics = config.validate().unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Missing Marmot API Key");
    }

    #[test]
    fn scheme_defaults_to_https() {
        let settings = ProviderConfig::new("catalog.internal:8080", "k")
            .validate()
            .unwrap();
        assert_eq!(settings.base_url, "https://catalog.internal:8080/api/v1");
        assert_eq!(settings.host, "catalog.internal:8080");
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn explicit_schemes_are_kept() {
        let http = ProviderConfig::new("http://localhost:8080/", "k")
            .validate()
            .unwrap();
        assert_eq!(http.base_url, "http://localhost:8080/api/v1");

        let https = ProviderConfig::new("https://marmot.example.com", "k")
            .validate()
            .unwrap();
        assert_eq!(https.base_url, "https://marmot.example.com/api/v1");
    }

    #[test]
    fn env_fallback_fills_only_missing_values() {
        let config = ProviderConfig {
            host: Some("configured.example.com".to_string()),
            api_key: None,
            timeout_secs: Some(5),
        }
        .with_env_fallback(|key| match key {
            HOST_ENV => Some("env.example.com".to_string()),
            API_KEY_ENV => Some("env-key".to_string()),
            _ => None,
        });

        assert_eq!(config.host.as_deref(), Some("configured.example.com"));
        assert_eq!(config.api_key.as_deref(), Some("env-key"));
        let settings = config.validate().unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let config = ProviderConfig::new("catalog.internal", "super-secret");
        assert!(!format!("{:?}", config).contains("super-secret"));
        let settings = config.validate().unwrap();
        assert!(!format!("{:?}", settings).contains("super-secret"));
    }
}
