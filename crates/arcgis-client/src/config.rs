//! Client configuration and builder pattern.

use crate::error::{Error, Result};
use std::time::Duration;

/// Browser string sent as `User-Agent`; some public servers reject unknown agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/95.0.4638.69 Safari/537.36";

/// Configuration for the ArcGIS client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User-Agent header value
    pub user_agent: String,
    /// Request timeout (default: 30 seconds)
    pub timeout: Duration,
    /// Whether to verify TLS certificates (default: true)
    pub tls_verify: bool,
    /// Value of the `f` parameter sent with every request: "json" (default) or "pjson"
    pub format: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            tls_verify: true,
            format: "json".to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Accepted `f` values; responses are always parsed as JSON.
    pub const FORMATS: &'static [&'static str] = &["json", "pjson"];

    /// Minimum allowed timeout value.
    pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(Error::Config("user_agent cannot be empty".to_string()));
        }

        if !Self::FORMATS.contains(&self.format.as_str()) {
            return Err(Error::Config(format!(
                "format '{}' must be one of {:?}",
                self.format,
                Self::FORMATS
            )));
        }

        if self.timeout < Self::MIN_TIMEOUT {
            return Err(Error::Config(format!(
                "timeout ({:?}) must be >= {:?}",
                self.timeout,
                Self::MIN_TIMEOUT
            )));
        }

        Ok(())
    }

    /// Parameters merged into every request.
    pub(crate) fn base_params(&self) -> Vec<(String, String)> {
        vec![("f".to_string(), self.format.clone())]
    }
}

/// Builder for client configuration.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set whether to verify TLS certificates.
    pub fn tls_verify(mut self, verify: bool) -> Self {
        self.config.tls_verify = verify;
        self
    }

    /// Set the response format parameter (`json` or `pjson`).
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.config.format = format.into();
        self
    }

    /// Build the configuration, validating all settings.
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
