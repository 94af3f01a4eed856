//! Registry of provider adapters, grouped into trust tiers.

use governor::DefaultDirectRateLimiter;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::{
    arxiv::ArxivSource, base::BaseSource, biorxiv::BiorxivSource, core::CoreSource,
    crossref::CrossRefSource, doaj::DoajSource, doi_org::DoiOrgSource, dryad::DryadSource,
    europe_pmc::EuropePmcSource, figshare::FigshareSource, google_books::GoogleBooksSource,
    internet_archive::InternetArchiveSource, openaire::OpenAireSource, openalex::OpenAlexSource,
    plos::PlosSource, pubmed::PubMedSource, semantic::SemanticScholarSource, share::ShareSource,
    unpaywall::UnpaywallSource, wikidata::WikidataSource, zenodo::ZenodoSource, Source,
    SourceCapabilities, SourceContext, SourceError, SourceHit,
};
use crate::config::Config;
use crate::models::{serialize_millis, Doi, ProviderRank, ProviderResult, ProviderStatus};
use crate::utils::{limiter_for_rate, validate_url, HttpClient};

/// Trust group a provider belongs to, in query order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TierKind {
    /// Dedicated open-access aggregators
    #[serde(rename = "open-access")]
    OpenAccess,
    /// Preprint servers and repositories
    #[serde(rename = "preprint")]
    Preprint,
    /// Publisher endpoints
    #[serde(rename = "publisher")]
    Publisher,
    /// Enrichment only, never a link
    #[serde(rename = "metadata")]
    MetadataOnly,
}

impl TierKind {
    pub const ALL: [TierKind; 4] = [
        TierKind::OpenAccess,
        TierKind::Preprint,
        TierKind::Publisher,
        TierKind::MetadataOnly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TierKind::OpenAccess => "open-access",
            TierKind::Preprint => "preprint",
            TierKind::Publisher => "publisher",
            TierKind::MetadataOnly => "metadata",
        }
    }

    pub fn is_metadata_only(self) -> bool {
        self == TierKind::MetadataOnly
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a provider needs before it can be queried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Credential {
    None,
    /// An API key raises limits but is not needed
    OptionalKey,
    RequiredKey,
    /// A contact email is part of every request
    RequiredEmail,
}

impl Credential {
    pub fn as_str(self) -> &'static str {
        match self {
            Credential::None => "none",
            Credential::OptionalKey => "optional key",
            Credential::RequiredKey => "API key",
            Credential::RequiredEmail => "contact email",
        }
    }
}

/// A built-in provider: defaults plus a constructor
#[derive(Clone, Copy)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub tier: TierKind,
    pub base_url: &'static str,
    pub credential: Credential,
    pub requests_per_second: f32,
    pub enabled_by_default: bool,
    pub build: fn(SourceContext) -> Arc<dyn Source>,
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("id", &self.id)
            .field("tier", &self.tier)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Every provider this crate knows about, in default query order
pub static CATALOG: &[CatalogEntry] = &[
    // Open-access aggregators
    CatalogEntry {
        id: "unpaywall",
        name: "Unpaywall",
        tier: TierKind::OpenAccess,
        base_url: "https://api.unpaywall.org/v2",
        credential: Credential::RequiredEmail,
        requests_per_second: 10.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(UnpaywallSource::new(ctx)),
    },
    CatalogEntry {
        id: "core",
        name: "CORE",
        tier: TierKind::OpenAccess,
        base_url: "https://api.core.ac.uk/v3",
        credential: Credential::RequiredKey,
        requests_per_second: 1.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(CoreSource::new(ctx)),
    },
    CatalogEntry {
        id: "europe_pmc",
        name: "Europe PMC",
        tier: TierKind::OpenAccess,
        base_url: "https://www.ebi.ac.uk/europepmc/webservices/rest",
        credential: Credential::None,
        requests_per_second: 10.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(EuropePmcSource::new(ctx)),
    },
    CatalogEntry {
        id: "openaire",
        name: "OpenAIRE",
        tier: TierKind::OpenAccess,
        base_url: "https://api.openaire.eu",
        credential: Credential::None,
        requests_per_second: 5.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(OpenAireSource::new(ctx)),
    },
    CatalogEntry {
        id: "doaj",
        name: "DOAJ",
        tier: TierKind::OpenAccess,
        base_url: "https://doaj.org/api/v2",
        credential: Credential::None,
        requests_per_second: 2.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(DoajSource::new(ctx)),
    },
    CatalogEntry {
        id: "base",
        name: "BASE",
        tier: TierKind::OpenAccess,
        base_url: "https://api.base-search.net/cgi-bin/BaseAPI.dll",
        credential: Credential::None,
        requests_per_second: 1.0,
        // IP-whitelisted API
        enabled_by_default: false,
        build: |ctx| Arc::new(BaseSource::new(ctx)),
    },
    // Preprint servers and repositories
    CatalogEntry {
        id: "arxiv",
        name: "arXiv",
        tier: TierKind::Preprint,
        base_url: "https://arxiv.org",
        credential: Credential::None,
        requests_per_second: 1.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(ArxivSource::new(ctx)),
    },
    CatalogEntry {
        id: "biorxiv",
        name: "bioRxiv",
        tier: TierKind::Preprint,
        base_url: "https://www.biorxiv.org",
        credential: Credential::None,
        requests_per_second: 2.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(BiorxivSource::biorxiv(ctx)),
    },
    CatalogEntry {
        id: "medrxiv",
        name: "medRxiv",
        tier: TierKind::Preprint,
        base_url: "https://www.medrxiv.org",
        credential: Credential::None,
        requests_per_second: 2.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(BiorxivSource::medrxiv(ctx)),
    },
    CatalogEntry {
        id: "europe_pmc_preprints",
        name: "Europe PMC Preprints",
        tier: TierKind::Preprint,
        base_url: "https://www.ebi.ac.uk/europepmc/webservices/rest",
        credential: Credential::None,
        requests_per_second: 10.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(EuropePmcSource::preprints(ctx)),
    },
    CatalogEntry {
        id: "zenodo",
        name: "Zenodo",
        tier: TierKind::Preprint,
        base_url: "https://zenodo.org/api",
        credential: Credential::None,
        requests_per_second: 2.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(ZenodoSource::new(ctx)),
    },
    CatalogEntry {
        id: "figshare",
        name: "Figshare",
        tier: TierKind::Preprint,
        base_url: "https://api.figshare.com/v2",
        credential: Credential::None,
        requests_per_second: 2.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(FigshareSource::new(ctx)),
    },
    CatalogEntry {
        id: "internet_archive",
        name: "Internet Archive",
        tier: TierKind::Preprint,
        base_url: "https://archive.org",
        credential: Credential::None,
        requests_per_second: 2.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(InternetArchiveSource::new(ctx)),
    },
    CatalogEntry {
        id: "share",
        name: "OSF SHARE",
        tier: TierKind::Preprint,
        base_url: "https://share.osf.io/api/v2",
        credential: Credential::None,
        requests_per_second: 2.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(ShareSource::new(ctx)),
    },
    // Publisher endpoints
    CatalogEntry {
        id: "doi_org",
        name: "doi.org",
        tier: TierKind::Publisher,
        base_url: "https://doi.org",
        credential: Credential::None,
        requests_per_second: 5.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(DoiOrgSource::new(ctx)),
    },
    CatalogEntry {
        id: "plos",
        name: "PLOS",
        tier: TierKind::Publisher,
        base_url: "https://api.plos.org",
        credential: Credential::None,
        requests_per_second: 1.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(PlosSource::new(ctx)),
    },
    // Metadata-only
    CatalogEntry {
        id: "crossref",
        name: "Crossref",
        tier: TierKind::MetadataOnly,
        base_url: "https://api.crossref.org",
        credential: Credential::None,
        requests_per_second: 10.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(CrossRefSource::new(ctx)),
    },
    CatalogEntry {
        id: "openalex",
        name: "OpenAlex",
        tier: TierKind::MetadataOnly,
        base_url: "https://api.openalex.org",
        credential: Credential::None,
        requests_per_second: 10.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(OpenAlexSource::new(ctx)),
    },
    CatalogEntry {
        id: "semantic_scholar",
        name: "Semantic Scholar",
        tier: TierKind::MetadataOnly,
        base_url: "https://api.semanticscholar.org/graph/v1",
        credential: Credential::OptionalKey,
        requests_per_second: 1.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(SemanticScholarSource::new(ctx)),
    },
    CatalogEntry {
        id: "pubmed",
        name: "PubMed",
        tier: TierKind::MetadataOnly,
        base_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils",
        credential: Credential::None,
        requests_per_second: 3.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(PubMedSource::new(ctx)),
    },
    CatalogEntry {
        id: "dryad",
        name: "Dryad",
        tier: TierKind::MetadataOnly,
        base_url: "https://datadryad.org/api/v2",
        credential: Credential::None,
        requests_per_second: 2.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(DryadSource::new(ctx)),
    },
    CatalogEntry {
        id: "wikidata",
        name: "Wikidata",
        tier: TierKind::MetadataOnly,
        base_url: "https://query.wikidata.org",
        credential: Credential::None,
        requests_per_second: 2.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(WikidataSource::new(ctx)),
    },
    CatalogEntry {
        id: "google_books",
        name: "Google Books",
        tier: TierKind::MetadataOnly,
        base_url: "https://www.googleapis.com/books/v1",
        credential: Credential::RequiredKey,
        requests_per_second: 1.0,
        enabled_by_default: true,
        build: |ctx| Arc::new(GoogleBooksSource::new(ctx)),
    },
];

/// Look a catalog entry up by id
pub fn catalog_entry(id: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|entry| entry.id == id)
}

/// Static configuration of one registered provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSpec {
    pub id: String,
    pub name: String,
    pub tier: TierKind,
    pub base_url: String,
    pub credential: Credential,
    #[serde(serialize_with = "serialize_millis")]
    pub timeout: Duration,
    pub requests_per_second: f32,
    pub enabled_by_default: bool,
}

impl ProviderSpec {
    /// A spec with no base URL, no credential, a 5 second timeout and no throttling
    pub fn new(id: impl Into<String>, tier: TierKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            tier,
            base_url: String::new(),
            credential: Credential::None,
            timeout: Duration::from_secs(5),
            requests_per_second: 0.0,
            enabled_by_default: true,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn requests_per_second(mut self, rate: f32) -> Self {
        self.requests_per_second = rate;
        self
    }

    fn from_catalog(entry: &CatalogEntry, timeout: Duration) -> Self {
        Self {
            id: entry.id.to_string(),
            name: entry.name.to_string(),
            tier: entry.tier,
            base_url: entry.base_url.to_string(),
            credential: entry.credential,
            timeout,
            requests_per_second: entry.requests_per_second,
            enabled_by_default: entry.enabled_by_default,
        }
    }
}

/// A provider ready to be queried: its spec, adapter, limiter and rank
pub struct RegisteredProvider {
    spec: ProviderSpec,
    source: Arc<dyn Source>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
    rank: ProviderRank,
}

impl RegisteredProvider {
    fn new(spec: ProviderSpec, source: Arc<dyn Source>, rank: ProviderRank) -> Self {
        let limiter = limiter_for_rate(spec.requests_per_second);
        Self {
            spec,
            source,
            limiter,
            rank,
        }
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    pub fn tier(&self) -> TierKind {
        self.spec.tier
    }

    pub fn rank(&self) -> ProviderRank {
        self.rank
    }

    pub fn capabilities(&self) -> SourceCapabilities {
        self.source.capabilities()
    }

    /// Query the adapter once.
    ///
    /// The rate-limit wait and the lookup share the provider's timeout.
    /// Every outcome, including failures, comes back as a normalized
    /// [`ProviderResult`].
    pub async fn resolve(&self, doi: &Doi) -> ProviderResult {
        let id = self.spec.id.as_str();
        let call = async {
            if let Some(limiter) = &self.limiter {
                limiter.until_ready().await;
            }
            self.source.lookup(doi).await
        };

        let result = match tokio::time::timeout(self.spec.timeout, call).await {
            Ok(Ok(Some(hit))) => result_from_hit(id, hit),
            Ok(Ok(None)) => ProviderResult::not_found(id, "no record for this DOI"),
            Ok(Err(SourceError::NotFound(message))) => ProviderResult::not_found(id, message),
            Ok(Err(e)) => ProviderResult::error(id, e.to_string()),
            Err(_) => ProviderResult::timeout(
                id,
                format!("timed out after {}ms", self.spec.timeout.as_millis()),
            ),
        };

        let result = result.ranked(self.spec.tier, self.rank).normalized();
        tracing::debug!(
            provider = id,
            status = %result.status,
            with_link = result.full_text_link.is_some(),
            "Provider call finished"
        );
        result
    }
}

impl fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("spec", &self.spec)
            .field("source", &self.source)
            .field("throttled", &self.limiter.is_some())
            .field("rank", &self.rank)
            .finish()
    }
}

fn result_from_hit(id: &str, hit: SourceHit) -> ProviderResult {
    let mut result = ProviderResult::new(id, ProviderStatus::Found).with_metadata(hit.metadata);
    if let Some(link) = hit.pdf_url {
        result = result.with_link(link);
    }
    if let Some(url) = hit.landing_url {
        result = result.with_landing_url(url);
    }
    if let Some(host_type) = hit.host_type {
        result = result.with_host_type(host_type);
    }
    if let Some(note) = hit.note {
        result = result.with_message(note);
    }
    result
}

/// One priority group of providers, queried together
#[derive(Debug, Clone)]
pub struct Tier {
    kind: TierKind,
    providers: Vec<Arc<RegisteredProvider>>,
}

impl Tier {
    pub fn kind(&self) -> TierKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn providers(&self) -> &[Arc<RegisteredProvider>] {
        &self.providers
    }

    pub fn specs(&self) -> impl Iterator<Item = &ProviderSpec> {
        self.providers.iter().map(|p| p.spec())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Errors raised while assembling the registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown provider '{0}' in configuration")]
    UnknownProvider(String),

    #[error("Provider '{0}' is registered more than once")]
    Duplicate(String),

    #[error("Invalid base URL for provider '{id}': {url}")]
    InvalidBaseUrl { id: String, url: String },

    #[error("No providers are enabled")]
    Empty,

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] SourceError),
}

/// Ordered, read-only catalog of providers grouped into tiers
///
/// Built once at start-up and shared across concurrent resolutions.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    tiers: Vec<Tier>,
}

impl ProviderRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Build the registry from the built-in catalog and user configuration.
    ///
    /// Providers whose required credential is missing are skipped with a
    /// warning. Unknown provider ids anywhere in the configuration are an
    /// error.
    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        let enabled = config.sources.enabled();
        let disabled = config.sources.disabled();

        let mentioned = config
            .providers
            .iter()
            .map(|p| p.id.trim().to_lowercase())
            .chain(enabled.iter().flatten().cloned())
            .chain(disabled.iter().cloned());
        for id in mentioned {
            if catalog_entry(&id).is_none() {
                return Err(RegistryError::UnknownProvider(id));
            }
        }

        let client = Arc::new(HttpClient::for_contact(config.contact.email.as_deref())?);
        let email = config.contact.email.clone();
        let mut builder = Self::builder();

        for entry in CATALOG {
            let overrides = config.provider(entry.id);

            let mut active = overrides
                .and_then(|o| o.enabled)
                .unwrap_or(entry.enabled_by_default);
            if let Some(enabled) = &enabled {
                active = enabled.iter().any(|id| id == entry.id) && overrides.and_then(|o| o.enabled) != Some(false);
            }
            if disabled.iter().any(|id| id == entry.id) {
                active = false;
            }
            if !active {
                tracing::debug!(provider = entry.id, "Provider disabled");
                continue;
            }

            let api_key = config.api_key(entry.id).map(str::to_string);
            match entry.credential {
                Credential::RequiredKey if api_key.is_none() => {
                    tracing::warn!(provider = entry.id, "Skipping provider: API key not configured");
                    continue;
                }
                Credential::RequiredEmail if email.is_none() => {
                    tracing::warn!(provider = entry.id, "Skipping provider: contact email not configured");
                    continue;
                }
                _ => {}
            }

            let timeout = overrides
                .and_then(|o| o.timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.resolver.provider_timeout());
            let mut spec = ProviderSpec::from_catalog(entry, timeout);
            if let Some(rate) = overrides.and_then(|o| o.requests_per_second) {
                spec.requests_per_second = rate;
            }
            if let Some(url) = overrides.and_then(|o| o.base_url.as_deref()) {
                spec.base_url = validate_url(url).map_err(|_| RegistryError::InvalidBaseUrl {
                    id: entry.id.to_string(),
                    url: url.to_string(),
                })?;
            }

            let ctx = SourceContext::new(Arc::clone(&client), spec.base_url.clone())
                .api_key(api_key)
                .contact_email(email.clone());
            builder = builder.provider(spec, (entry.build)(ctx));
        }

        builder.build()
    }

    /// Tiers in query order; empty tiers are omitted
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// All providers in query order
    pub fn providers(&self) -> impl Iterator<Item = &Arc<RegisteredProvider>> {
        self.tiers.iter().flat_map(|t| t.providers.iter())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<RegisteredProvider>> {
        self.providers().find(|p| p.id() == id)
    }

    pub fn has(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tiers.iter().map(Tier::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Assembles a [`ProviderRegistry`] from explicit adapters
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<(ProviderSpec, Arc<dyn Source>)>,
}

impl RegistryBuilder {
    /// Add a provider; within a tier, providers keep insertion order
    pub fn provider(mut self, spec: ProviderSpec, source: Arc<dyn Source>) -> Self {
        self.entries.push((spec, source));
        self
    }

    pub fn build(self) -> Result<ProviderRegistry, RegistryError> {
        if self.entries.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::new();
        for (spec, source) in &self.entries {
            if !seen.insert(spec.id.clone()) {
                return Err(RegistryError::Duplicate(spec.id.clone()));
            }
            let capabilities = source.capabilities();
            if !capabilities.fits_tier(spec.tier) {
                tracing::warn!(
                    provider = %spec.id,
                    tier = %spec.tier,
                    capabilities = %capabilities.describe(),
                    "Provider capabilities do not match its tier"
                );
            }
        }

        let mut tiers = Vec::new();
        for kind in TierKind::ALL {
            let members: Vec<_> = self
                .entries
                .iter()
                .filter(|(spec, _)| spec.tier == kind)
                .collect();
            if members.is_empty() {
                continue;
            }

            let tier_index = tiers.len();
            let providers = members
                .into_iter()
                .enumerate()
                .map(|(position, (spec, source))| {
                    Arc::new(RegisteredProvider::new(
                        spec.clone(),
                        Arc::clone(source),
                        ProviderRank::new(tier_index, position),
                    ))
                })
                .collect();
            tiers.push(Tier { kind, providers });
        }

        Ok(ProviderRegistry { tiers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderOverride;
    use crate::sources::MockSource;

    fn doi() -> Doi {
        Doi::parse("10.1234/abc").unwrap()
    }

    fn config_with_everything() -> Config {
        let mut config = Config::default();
        config.contact.email = Some("me@example.org".to_string());
        config.api_keys.core = Some("core-key".to_string());
        config.api_keys.google_books = Some("books-key".to_string());
        config
    }

    #[test]
    fn test_catalog_ids_unique() {
        let mut ids = HashSet::new();
        for entry in CATALOG {
            assert!(ids.insert(entry.id), "duplicate catalog id {}", entry.id);
        }
        assert_eq!(CATALOG.len(), 23);
    }

    #[test]
    fn test_catalog_is_in_tier_order() {
        let tiers: Vec<_> = CATALOG.iter().map(|e| e.tier).collect();
        let mut sorted = tiers.clone();
        sorted.sort();
        assert_eq!(tiers, sorted);
    }

    #[test]
    fn test_catalog_capabilities_match_tiers() {
        for entry in CATALOG {
            let source = (entry.build)(crate::sources::test_context("http://localhost"));
            assert!(
                source.capabilities().fits_tier(entry.tier),
                "{} does not fit the {} tier",
                entry.id,
                entry.tier
            );
        }
    }

    #[test]
    fn test_override_ids_are_case_insensitive() {
        let mut config = config_with_everything();
        config.providers.push(ProviderOverride {
            id: "Crossref".to_string(),
            timeout_secs: Some(2),
            ..ProviderOverride::default()
        });

        let registry = ProviderRegistry::from_config(&config).unwrap();
        let crossref = registry.get("crossref").unwrap();
        assert_eq!(crossref.spec().timeout, Duration::from_secs(2));
        assert!(crossref.capabilities().contains(SourceCapabilities::METADATA));
    }

    #[test]
    fn test_from_config_builds_tiers() {
        let registry = ProviderRegistry::from_config(&config_with_everything()).unwrap();

        let kinds: Vec<_> = registry.tiers().iter().map(Tier::kind).collect();
        assert_eq!(kinds, TierKind::ALL.to_vec());
        assert!(registry.has("unpaywall"));
        assert!(registry.has("google_books"));
        // disabled by default
        assert!(!registry.has("base"));
        assert_eq!(registry.get("crossref").unwrap().rank().tier, 3);
    }

    #[test]
    fn test_missing_credentials_exclude_providers() {
        let mut config = Config::default();
        config.contact.email = None;
        config.api_keys.core = None;
        config.api_keys.google_books = None;

        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert!(!registry.has("unpaywall"));
        assert!(!registry.has("core"));
        assert!(!registry.has("google_books"));
        assert!(registry.has("europe_pmc"));
    }

    #[test]
    fn test_enabled_and_disabled_lists() {
        let mut config = config_with_everything();
        config.sources.enabled_sources = Some("arxiv, crossref, openalex".to_string());
        config.sources.disabled_sources = Some("openalex".to_string());

        let registry = ProviderRegistry::from_config(&config).unwrap();
        let ids: Vec<_> = registry.providers().map(|p| p.id().to_string()).collect();
        assert_eq!(ids, vec!["arxiv", "crossref"]);
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = config_with_everything();
        config.providers.push(ProviderOverride {
            id: "crossref".to_string(),
            base_url: Some("http://localhost:8080/".to_string()),
            timeout_secs: Some(2),
            requests_per_second: Some(0.5),
            enabled: None,
        });
        config.providers.push(ProviderOverride {
            id: "base".to_string(),
            enabled: Some(true),
            ..ProviderOverride::default()
        });

        let registry = ProviderRegistry::from_config(&config).unwrap();
        let crossref = registry.get("crossref").unwrap().spec();
        assert_eq!(crossref.timeout, Duration::from_secs(2));
        assert_eq!(crossref.requests_per_second, 0.5);
        assert!(crossref.base_url.starts_with("http://localhost:8080"));
        assert!(registry.has("base"));
    }

    #[test]
    fn test_vanishing_rate_override_still_builds() {
        let mut config = config_with_everything();
        config.providers.push(ProviderOverride {
            id: "pubmed".to_string(),
            requests_per_second: Some(1e-20),
            ..ProviderOverride::default()
        });

        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.get("pubmed").unwrap().spec().requests_per_second, 1e-20);
    }

    #[test]
    fn test_unknown_provider_is_error() {
        let mut config = config_with_everything();
        config.sources.disabled_sources = Some("scihub".to_string());

        let err = ProviderRegistry::from_config(&config).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownProvider(id) if id == "scihub"));
    }

    #[test]
    fn test_invalid_base_url_is_error() {
        let mut config = config_with_everything();
        config.providers.push(ProviderOverride {
            id: "crossref".to_string(),
            base_url: Some("ftp://example.org".to_string()),
            ..ProviderOverride::default()
        });

        assert!(matches!(
            ProviderRegistry::from_config(&config),
            Err(RegistryError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_builder_ranks_and_duplicates() {
        let registry = ProviderRegistry::builder()
            .provider(
                ProviderSpec::new("meta", TierKind::MetadataOnly),
                Arc::new(MockSource::not_found("meta")),
            )
            .provider(
                ProviderSpec::new("oa-a", TierKind::OpenAccess),
                Arc::new(MockSource::not_found("oa-a")),
            )
            .provider(
                ProviderSpec::new("oa-b", TierKind::OpenAccess),
                Arc::new(MockSource::not_found("oa-b")),
            )
            .build()
            .unwrap();

        assert_eq!(registry.tiers().len(), 2);
        assert_eq!(registry.tiers()[0].name(), "open-access");
        assert_eq!(registry.get("oa-b").unwrap().rank(), ProviderRank::new(0, 1));
        assert_eq!(registry.get("meta").unwrap().rank(), ProviderRank::new(1, 0));

        let dup = ProviderRegistry::builder()
            .provider(ProviderSpec::new("x", TierKind::Preprint), Arc::new(MockSource::not_found("x")))
            .provider(ProviderSpec::new("x", TierKind::Publisher), Arc::new(MockSource::not_found("x")))
            .build();
        assert!(matches!(dup, Err(RegistryError::Duplicate(_))));
        assert!(matches!(ProviderRegistry::builder().build(), Err(RegistryError::Empty)));
    }

    #[tokio::test]
    async fn test_resolve_maps_outcomes() {
        let registry = ProviderRegistry::builder()
            .provider(
                ProviderSpec::new("hit", TierKind::OpenAccess),
                Arc::new(MockSource::with_hit("hit", SourceHit::with_pdf("https://example.org/a.pdf"))),
            )
            .provider(
                ProviderSpec::new("broken", TierKind::OpenAccess),
                Arc::new(MockSource::failing("broken", "HTTP 500")),
            )
            .provider(
                ProviderSpec::new("slow", TierKind::OpenAccess).timeout(Duration::from_millis(20)),
                Arc::new(
                    MockSource::with_hit("slow", SourceHit::with_pdf("https://example.org/b.pdf"))
                        .delay(Duration::from_secs(5)),
                ),
            )
            .build()
            .unwrap();

        let hit = registry.get("hit").unwrap().resolve(&doi()).await;
        assert_eq!(hit.status, ProviderStatus::Found);
        assert!(hit.offers_link());
        assert_eq!(hit.tier, TierKind::OpenAccess);

        let broken = registry.get("broken").unwrap().resolve(&doi()).await;
        assert_eq!(broken.status, ProviderStatus::Error);
        assert!(broken.message.unwrap().contains("HTTP 500"));

        let slow = registry.get("slow").unwrap().resolve(&doi()).await;
        assert_eq!(slow.status, ProviderStatus::Timeout);
    }
}
