//! Provider adapters with an extensible trait-based architecture.
//!
//! This module defines the [`Source`] trait every provider implements. A
//! source turns a validated [`Doi`] into zero or one [`SourceHit`]; the
//! [`ProviderRegistry`] wraps each call with the provider's timeout and rate
//! limit and converts the outcome into a [`ProviderResult`](crate::models::ProviderResult),
//! so errors never escape an adapter.
//!
//! # Tiers
//!
//! Sources are grouped by how much their answers can be trusted to point at
//! a legal copy:
//!
//! 1. open-access aggregators (Unpaywall, CORE, Europe PMC, OpenAIRE, DOAJ, BASE)
//! 2. preprint servers and repositories (arXiv, bioRxiv, medRxiv, Zenodo, Figshare,
//!    Internet Archive, OSF SHARE)
//! 3. publisher endpoints (doi.org redirect, PLOS)
//! 4. metadata-only sources (Crossref, OpenAlex, Semantic Scholar, PubMed, Dryad,
//!    Wikidata, Google Books)
//!
//! # Runtime Source Configuration
//!
//! - `PAPER_FINDER_SOURCES__ENABLED_SOURCES` - Only use these sources (e.g. "unpaywall,arxiv")
//! - `PAPER_FINDER_SOURCES__DISABLED_SOURCES` - Never use these sources (e.g. "wikidata")
//!
//! Sources whose required credential is missing are skipped with a warning.

mod arxiv;
mod base;
mod biorxiv;
mod core;
mod crossref;
mod doaj;
mod doi_org;
mod dryad;
mod europe_pmc;
mod fields;
mod figshare;
mod google_books;
mod internet_archive;
mod openaire;
mod openalex;
mod plos;
mod pubmed;
mod registry;
mod semantic;
mod share;
mod unpaywall;
mod wikidata;
mod zenodo;

pub mod mock;

pub use mock::MockSource;
pub use registry::{
    catalog_entry, CatalogEntry, Credential, ProviderRegistry, ProviderSpec, RegisteredProvider,
    RegistryBuilder, RegistryError, Tier, TierKind, CATALOG,
};

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{Doi, PaperMetadata};
use crate::utils::HttpClient;

bitflags::bitflags! {
    /// What a source can contribute to a resolution
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        const FULL_TEXT = 1 << 0;
        const METADATA = 1 << 1;
        const LANDING_PAGE = 1 << 2;
    }
}

impl SourceCapabilities {
    /// Short names for display, e.g. `full-text, metadata`
    pub fn describe(self) -> String {
        let mut labels = Vec::new();
        if self.contains(Self::FULL_TEXT) {
            labels.push("full-text");
        }
        if self.contains(Self::METADATA) {
            labels.push("metadata");
        }
        if self.contains(Self::LANDING_PAGE) {
            labels.push("landing");
        }
        labels.join(", ")
    }

    /// Whether a source with these capabilities belongs in a tier of `kind`.
    ///
    /// Link tiers need full text; the metadata-only tier must not claim it.
    pub fn fits_tier(self, kind: TierKind) -> bool {
        self.contains(Self::FULL_TEXT) != kind.is_metadata_only()
    }
}

/// The answer a source gives when it knows the DOI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceHit {
    pub metadata: PaperMetadata,
    pub pdf_url: Option<String>,
    pub landing_url: Option<String>,
    pub host_type: Option<String>,
    pub note: Option<String>,
}

impl SourceHit {
    pub fn with_pdf(pdf_url: impl Into<String>) -> Self {
        Self {
            pdf_url: Some(pdf_url.into()),
            ..Self::default()
        }
    }

    pub fn with_metadata(metadata: PaperMetadata) -> Self {
        Self {
            metadata,
            ..Self::default()
        }
    }

    pub fn pdf(mut self, pdf_url: Option<String>) -> Self {
        self.pdf_url = pdf_url.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn metadata(mut self, metadata: PaperMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn landing(mut self, url: Option<String>) -> Self {
        self.landing_url = url.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn host_type(mut self, host_type: impl Into<String>) -> Self {
        self.host_type = Some(host_type.into());
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Everything an adapter needs to talk to its provider
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub client: Arc<HttpClient>,
    /// Base endpoint, without a trailing slash
    pub base_url: String,
    pub api_key: Option<String>,
    pub contact_email: Option<String>,
}

impl SourceContext {
    pub fn new(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            contact_email: None,
        }
    }

    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn contact_email(mut self, email: Option<String>) -> Self {
        self.contact_email = email.filter(|e| !e.trim().is_empty());
        self
    }

    /// Join a path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request, mapping transport failures and error statuses onto [`SourceError`].
    ///
    /// A 404 is reported as `NotFound`, a 429 as `RateLimit`, other
    /// non-success statuses as `Api`.
    pub async fn send(
        &self,
        request: reqwest::RequestBuilder,
        provider: &str,
    ) -> Result<reqwest::Response, SourceError> {
        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to reach {}: {}", provider, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(format!("{} has no record", provider)));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimit);
        }
        if !status.is_success() {
            return Err(SourceError::Api(format!(
                "{} API returned status {}",
                provider, status
            )));
        }
        Ok(response)
    }

    /// Send a request and decode a JSON body
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        provider: &str,
    ) -> Result<T, SourceError> {
        self.send(request, provider)
            .await?
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse {} response: {}", provider, e)))
    }

    /// Send a request and return the body as text
    pub async fn get_text(
        &self,
        request: reqwest::RequestBuilder,
        provider: &str,
    ) -> Result<String, SourceError> {
        self.send(request, provider)
            .await?
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read {} response: {}", provider, e)))
    }
}

/// The Source trait defines the interface for all provider adapters.
///
/// # Implementing a New Source
///
/// 1. Create a struct holding a [`SourceContext`]
/// 2. Implement `id`, `name` and `lookup`
/// 3. Add a [`CatalogEntry`] for it to [`CATALOG`]
///
/// `lookup` returns `Ok(None)` (or `Err(SourceError::NotFound)`) when the
/// provider does not know the DOI. It must not retry; the orchestrator owns
/// retry and fallback policy.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g. "unpaywall")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Describe what this source can return
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::METADATA
    }

    /// Look a DOI up
    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML, JSON, etc.)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// The provider has no record for the DOI
    #[error("Not found: {0}")]
    NotFound(String),

    /// API error from the source
    #[error("API error: {0}")]
    Api(String),

    /// Missing or rejected credential
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}

/// A context pointing at a mock server
#[cfg(test)]
pub(crate) fn test_context(base_url: &str) -> SourceContext {
    SourceContext::new(Arc::new(HttpClient::new().unwrap()), base_url)
}
