//! HTTP transport that dispatches materialized requests.
//!
//! The request builder never configures TLS, pooling, proxies or redirects
//! itself: it hands one `reqwest::Request` to a [`Transport`] and takes back
//! one response or error. `reqwest::Client` is the standard implementation;
//! tests and embedders can substitute their own.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::request::constants::{CONNECT_TIMEOUT, READ_TIMEOUT};
use crate::user_agent;

/// Dispatches one request and returns its response.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends `request`.
    ///
    /// # Errors
    ///
    /// Returns the transport's own error (DNS, connect, TLS, timeout).
    async fn execute(&self, request: reqwest::Request)
    -> Result<reqwest::Response, reqwest::Error>;
}

#[async_trait]
impl Transport for Client {
    async fn execute(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, reqwest::Error> {
        Client::execute(self, request).await
    }
}

/// Settings for building a `reqwest::Client`.
///
/// Default configuration:
/// - Connect timeout: 30 seconds
/// - Read timeout: 5 minutes (for large bodies)
/// - Gzip decompression: enabled
/// - User-Agent: `fetch/<version>`
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Time allowed for establishing a connection.
    pub connect_timeout: Duration,
    /// Time allowed for the whole request, body included.
    pub read_timeout: Duration,
    /// User-Agent sent unless a request sets its own.
    pub user_agent: String,
    /// Whether to negotiate and transparently decode gzip bodies.
    pub gzip: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout: READ_TIMEOUT,
            user_agent: user_agent::default_user_agent(),
            gzip: true,
        }
    }
}

impl TransportConfig {
    /// Builds a client from these settings.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error (e.g. the TLS backend failed to load).
    pub fn build(&self) -> Result<Client, reqwest::Error> {
        debug!(
            connect_timeout_secs = self.connect_timeout.as_secs(),
            read_timeout_secs = self.read_timeout.as_secs(),
            "building HTTP client"
        );
        Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.read_timeout)
            .gzip(self.gzip)
            .user_agent(self.user_agent.as_str())
            .build()
    }
}

static DEFAULT_TRANSPORT: OnceLock<Arc<dyn Transport>> = OnceLock::new();

/// The process-wide client every new request starts with.
///
/// Built once from [`TransportConfig::default`] on first use.
#[must_use]
pub fn default_transport() -> Arc<dyn Transport> {
    Arc::clone(DEFAULT_TRANSPORT.get_or_init(|| {
        let client = TransportConfig::default().build().unwrap_or_else(|error| {
            warn!(%error, "default HTTP client configuration failed; using reqwest defaults");
            Client::new()
        });
        Arc::new(client)
    }))
}
