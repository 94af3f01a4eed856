//! Per-provider results and the reconciled paper record.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sources::TierKind;
use crate::utils::validate_url;

/// An author as reported by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affiliation: None,
        }
    }

    /// Builds an author from optional parts, dropping blank names.
    pub fn from_parts(given: Option<&str>, family: Option<&str>) -> Option<Self> {
        let name = [given, family]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!name.is_empty()).then(|| Self::new(name))
    }

    pub fn with_affiliation(mut self, affiliation: Option<String>) -> Self {
        self.affiliation = affiliation.filter(|a| !a.trim().is_empty());
        self
    }
}

/// Bibliographic metadata, every field optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corresponding_email: Option<String>,
}

impl PaperMetadata {
    pub fn title(mut self, title: Option<String>) -> Self {
        self.title = non_blank(title);
        self
    }

    pub fn journal(mut self, journal: Option<String>) -> Self {
        self.journal = non_blank(journal);
        self
    }

    pub fn year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn authors(mut self, authors: Vec<Author>) -> Self {
        self.authors = authors
            .into_iter()
            .filter(|a| !a.name.trim().is_empty())
            .collect();
        self
    }

    pub fn corresponding_email(mut self, email: Option<String>) -> Self {
        self.corresponding_email = non_blank(email);
        self
    }

    /// Number of populated fields, used to break ties between candidates
    pub fn richness(&self) -> usize {
        [
            self.title.is_some(),
            !self.authors.is_empty(),
            self.journal.is_some(),
            self.year.is_some(),
            self.corresponding_email.is_some(),
        ]
        .into_iter()
        .filter(|populated| *populated)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.richness() == 0
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Outcome of one provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderStatus {
    Found,
    NotFound,
    Error,
    /// The call exceeded its budget; selection treats it exactly like `Error`
    Timeout,
}

impl ProviderStatus {
    pub fn is_failure(self) -> bool {
        matches!(self, ProviderStatus::Error | ProviderStatus::Timeout)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderStatus::Found => "found",
            ProviderStatus::NotFound => "not-found",
            ProviderStatus::Error => "error",
            ProviderStatus::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a provider sits in the registry: lower is more trusted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ProviderRank {
    /// Index of the provider's tier
    pub tier: usize,
    /// Index of the provider within its tier
    pub position: usize,
}

impl ProviderRank {
    pub const fn new(tier: usize, position: usize) -> Self {
        Self { tier, position }
    }
}

/// The normalized output of one provider call.
///
/// Invariant: `status == Found` implies metadata or a full-text link is
/// present. [`ProviderResult::normalized`] enforces it by downgrading empty
/// hits to `NotFound`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderResult {
    /// Provider id
    pub source: String,
    pub status: ProviderStatus,
    pub metadata: Option<PaperMetadata>,
    pub full_text_link: Option<String>,
    /// Publisher or repository landing page, never a full-text link
    pub landing_url: Option<String>,
    pub host_type: Option<String>,
    pub message: Option<String>,
    pub tier: TierKind,
    pub rank: ProviderRank,
}

impl ProviderResult {
    pub fn new(source: impl Into<String>, status: ProviderStatus) -> Self {
        Self {
            source: source.into(),
            status,
            metadata: None,
            full_text_link: None,
            landing_url: None,
            host_type: None,
            message: None,
            tier: TierKind::OpenAccess,
            rank: ProviderRank::default(),
        }
    }

    pub fn not_found(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(source, ProviderStatus::NotFound).with_message(message)
    }

    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(source, ProviderStatus::Error).with_message(message)
    }

    pub fn timeout(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(source, ProviderStatus::Timeout).with_message(message)
    }

    pub fn with_metadata(mut self, metadata: PaperMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.full_text_link = Some(link.into());
        self
    }

    pub fn with_landing_url(mut self, url: impl Into<String>) -> Self {
        self.landing_url = Some(url.into());
        self
    }

    pub fn with_host_type(mut self, host_type: impl Into<String>) -> Self {
        self.host_type = Some(host_type.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn ranked(mut self, tier: TierKind, rank: ProviderRank) -> Self {
        self.tier = tier;
        self.rank = rank;
        self
    }

    /// Enforce the result invariants.
    ///
    /// Empty metadata becomes `None`, links that are not absolute HTTP(S)
    /// URLs are dropped, metadata-only tiers lose any link, and a `Found`
    /// result left with neither metadata nor link becomes `NotFound`.
    pub fn normalized(mut self) -> Self {
        if self.metadata.as_ref().is_some_and(PaperMetadata::is_empty) {
            self.metadata = None;
        }

        if let Some(link) = self.full_text_link.take() {
            match validate_url(&link) {
                Ok(link) if !self.tier.is_metadata_only() => self.full_text_link = Some(link),
                Ok(_) => {
                    tracing::debug!(source = %self.source, "Dropping link from metadata-only provider");
                }
                Err(e) => {
                    tracing::debug!(source = %self.source, link = %link, error = %e, "Dropping invalid link");
                }
            }
        }

        if let Some(url) = self.landing_url.take() {
            self.landing_url = validate_url(&url).ok();
        }

        if self.status == ProviderStatus::Found
            && self.metadata.is_none()
            && self.full_text_link.is_none()
        {
            self.status = ProviderStatus::NotFound;
            if self.message.is_none() {
                self.message = Some("response carried neither metadata nor a link".to_string());
            }
        }

        self
    }

    /// Whether this result may win link selection
    pub fn offers_link(&self) -> bool {
        self.status == ProviderStatus::Found
            && self.full_text_link.is_some()
            && !self.tier.is_metadata_only()
    }

    pub fn richness(&self) -> usize {
        self.metadata.as_ref().map_or(0, PaperMetadata::richness)
    }
}

/// The reconciled answer for one DOI.
///
/// Built once by the reconciler and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPaper {
    metadata: Option<PaperMetadata>,
    full_text_link: Option<String>,
    source: Option<String>,
    host_type: Option<String>,
    landing_url: Option<String>,
    message: String,
}

impl ResolvedPaper {
    pub(crate) fn new(
        metadata: Option<PaperMetadata>,
        full_text_link: Option<String>,
        source: Option<String>,
        host_type: Option<String>,
        landing_url: Option<String>,
        message: String,
    ) -> Self {
        Self {
            metadata,
            full_text_link,
            source,
            host_type,
            landing_url,
            message,
        }
    }

    pub fn metadata(&self) -> Option<&PaperMetadata> {
        self.metadata.as_ref()
    }

    pub fn full_text_link(&self) -> Option<&str> {
        self.full_text_link.as_deref()
    }

    /// Provider credited for the winning link
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn host_type(&self) -> Option<&str> {
        self.host_type.as_deref()
    }

    pub fn landing_url(&self) -> Option<&str> {
        self.landing_url.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn has_link(&self) -> bool {
        self.full_text_link.is_some()
    }
}
