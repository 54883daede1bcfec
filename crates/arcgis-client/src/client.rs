//! Blocking HTTP client and the transport seam every resource talks through.

use crate::catalog::Server;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::service::Service;
use crate::types::Descriptor;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::fmt;
use std::sync::Arc;

/// Synchronous GET transport returning parsed JSON.
///
/// Implementations must fail with [`Error::Status`] on a non-success status.
pub trait Transport: Send + Sync {
    /// Issue a GET for `url` with the given query parameters.
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<serde_json::Value>;
}

/// [`Transport`] backed by `reqwest::blocking`.
pub struct HttpTransport {
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a transport with the configured headers, timeout and TLS policy.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|_| Error::Config("Invalid user agent".to_string()))?,
        );

        let http = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.tls_verify)
            .build()?;

        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<serde_json::Value> {
        let start = std::time::Instant::now();

        tracing::debug!(url = %url, "Sending request");

        let response = self.http.get(url).query(params).send()?;
        let status = response.status();
        let duration = start.elapsed();

        tracing::debug!(
            url = %url,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Received response"
        );

        if !status.is_success() {
            tracing::warn!(
                url = %url,
                status = %status.as_u16(),
                duration_ms = %duration.as_millis(),
                "Request failed"
            );
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes()?;
        serde_json::from_slice(&body).map_err(|e| {
            Error::InvalidResponse(format!(
                "Failed to parse response from {}: {} (body: {})",
                url,
                e,
                String::from_utf8_lossy(&body)
            ))
        })
    }
}

/// Shared handle to the transport and configuration.
///
/// Cloning is cheap; every discovered resource keeps its own clone.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
}

impl Client {
    /// Create a client over HTTP with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connect to a server root, fetching its descriptor immediately.
    pub fn server(&self, url: &str) -> Result<Server> {
        Server::connect(self.clone(), url)
    }

    /// Address a service directly by its URL (`.../<name>/<type>`).
    pub fn service(&self, url: &str) -> Result<Service> {
        Service::from_url(self.clone(), url)
    }

    /// GET `url` with the fixed format parameter merged after `params`.
    ///
    /// The body must be a JSON object.
    pub(crate) fn get_json(&self, url: &str, params: &[(String, String)]) -> Result<Descriptor> {
        let mut merged: Vec<(String, String)> = params
            .iter()
            .filter(|(key, _)| key != "f")
            .cloned()
            .collect();
        merged.extend(self.config.base_params());

        match self.transport.get(url, &merged)? {
            serde_json::Value::Object(map) => match map.get("error") {
                Some(error) => Err(api_error(url, error)),
                None => Ok(map),
            },
            other => Err(Error::InvalidResponse(format!(
                "Expected a JSON object from {}, got {}",
                url,
                json_kind(&other)
            ))),
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// ArcGIS reports many failures as `{"error": {"code", "message"}}` with status 200.
fn api_error(url: &str, error: &serde_json::Value) -> Error {
    let code = error.get("code").and_then(serde_json::Value::as_i64).unwrap_or(0);
    let message = error
        .get("message")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown error")
        .to_string();

    tracing::warn!(url = %url, code = code, error = %message, "Server reported an error");

    Error::Api {
        url: url.to_string(),
        code,
        message,
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
