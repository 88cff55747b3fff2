//! Private HTTP transport for neo device exchanges
//!
//! This crate provides the minimal POST transport used to talk to a neo
//! transcoder controller. Every exchange is a single `text/xml` POST to one
//! configured endpoint; the response body is returned verbatim for the codec
//! layer to interpret.

mod error;

pub use error::TransportError;

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Content type expected by the controller's request parser
pub const CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// A request/response exchange with the device
///
/// Implementations own connection reuse and TLS policy. Callers never issue a
/// second exchange for the same session while one is outstanding.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to the device and return the raw response body
    async fn post(&self, body: String) -> Result<String, TransportError>;

    /// The endpoint this transport talks to
    fn endpoint(&self) -> &str;
}

/// Configuration for [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Full URL of the controller's request handler (e.g. `https://10.0.0.5/neoreq/`)
    pub endpoint: String,

    /// Whole-exchange timeout
    /// Default: 5 seconds
    pub request_timeout: Duration,

    /// Timeout for establishing the TCP/TLS connection
    /// Default: 3 seconds
    pub connect_timeout: Duration,

    /// Idle connections kept per host for reuse
    /// Default: 20
    pub max_idle_per_host: usize,

    /// Skip TLS certificate validation.
    ///
    /// Controllers ship with self-signed certificates. Leave this off in
    /// production and install the device certificate instead.
    /// Default: false
    pub accept_invalid_certs: bool,

    /// How many times a request that failed to connect is resent.
    /// Requests that reached the device are never resent.
    /// Default: 1
    pub connect_retries: u32,
}

impl TransportConfig {
    /// Create a configuration for `endpoint` with default settings
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(3),
            max_idle_per_host: 20,
            accept_invalid_certs: false,
            connect_retries: 1,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_max_idle_per_host(mut self, max_idle: usize) -> Self {
        self.max_idle_per_host = max_idle;
        self
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn with_connect_retries(mut self, retries: u32) -> Self {
        self.connect_retries = retries;
        self
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), TransportError> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(TransportError::Config(format!(
                "Endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }

        if self.request_timeout == Duration::ZERO {
            return Err(TransportError::Config(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout == Duration::ZERO {
            return Err(TransportError::Config(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Transport that POSTs XML to the controller over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpTransport {
    /// Build a transport from a validated configuration
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        config.validate()?;

        if config.accept_invalid_certs {
            warn!(
                endpoint = %config.endpoint,
                "TLS certificate validation is disabled for this endpoint"
            );
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| TransportError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// The configuration this transport was built from
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    async fn send_once(&self, body: &str) -> Result<String, reqwest::Error> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(body.to_string())
            .send()
            .await?
            .error_for_status()?;

        response.text().await
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, body: String) -> Result<String, TransportError> {
        let mut attempt = 0;

        loop {
            match self.send_once(&body).await {
                Ok(text) => {
                    debug!(
                        endpoint = %self.config.endpoint,
                        bytes = text.len(),
                        "Received response"
                    );
                    return Ok(text);
                }
                Err(e) if e.is_connect() && attempt < self.config.connect_retries => {
                    attempt += 1;
                    warn!(
                        endpoint = %self.config.endpoint,
                        attempt,
                        error = %e,
                        "Connection failed, resending request"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}
