//! HTTP client utilities.

use reqwest::{Client, RequestBuilder, StatusCode};
use std::sync::Arc;
use std::time::Duration;

use crate::sources::SourceError;

/// Shared HTTP client with sensible defaults
///
/// One client is shared by every provider so connections are pooled across
/// a resolution's fan-out. Per-call deadlines are enforced by the registry,
/// the client timeout here only guards against hung sockets.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::with_user_agent(&default_user_agent(None))
    }

    /// Create a client whose user agent carries a contact address.
    ///
    /// Crossref, OpenAlex and Unpaywall route requests that identify a
    /// contact into their "polite" pools.
    pub fn for_contact(email: Option<&str>) -> Result<Self, SourceError> {
        Self::with_user_agent(&default_user_agent(email))
    }

    /// Create a new HTTP client with a custom user agent
    pub fn with_user_agent(user_agent: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Start a GET request
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Start a POST request
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Start a HEAD request
    pub fn head(&self, url: &str) -> RequestBuilder {
        self.client.head(url)
    }

    /// Check that a candidate PDF link actually answers.
    ///
    /// Redirects are followed; only a final `200 OK` counts. Transport
    /// failures are reported as `false`, never as an error.
    pub async fn probe(&self, url: &str) -> bool {
        match self.head(url).send().await {
            Ok(response) => {
                let ok = response.status() == StatusCode::OK;
                tracing::debug!(url, status = %response.status(), ok, "HEAD probe");
                ok
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "HEAD probe failed");
                false
            }
        }
    }
}

fn default_user_agent(email: Option<&str>) -> String {
    match email {
        Some(email) => format!(
            "{}/{} (mailto:{})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            email
        ),
        None => concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
    }
}
