//! Semantic Scholar metadata provider.

use async_trait::async_trait;
use serde::Deserialize;

use super::fields::lenient_year;
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

const PAPER_FIELDS: &str = "title,authors,journal,venue,year,url";

/// Semantic Scholar metadata source
///
/// Uses the Graph API paper route with a `DOI:` external id. An API key is
/// optional; without one requests share the anonymous rate limit.
#[derive(Debug, Clone)]
pub struct SemanticScholarSource {
    ctx: SourceContext,
}

impl SemanticScholarSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    /// Add API key to request headers if available
    fn add_api_key_if_present(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.ctx.api_key {
            Some(key) => builder.header("x-api-key", key),
            None => builder,
        }
    }

    fn parse_paper(paper: S2Paper) -> SourceHit {
        let authors = paper
            .authors
            .into_iter()
            .filter_map(|a| a.name)
            .map(Author::new)
            .collect();

        let journal = paper
            .journal
            .and_then(|j| j.name)
            .filter(|name| !name.trim().is_empty())
            .or(paper.venue);

        let metadata = PaperMetadata::default()
            .title(paper.title)
            .journal(journal)
            .year(paper.year)
            .authors(authors);

        SourceHit::with_metadata(metadata).landing(paper.url)
    }
}

#[async_trait]
impl Source for SemanticScholarSource {
    fn id(&self) -> &str {
        "semantic_scholar"
    }

    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::METADATA
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let url = self.ctx.endpoint(&format!("paper/DOI:{}", doi));
        let request = self
            .add_api_key_if_present(self.ctx.client.get(&url))
            .query(&[("fields", PAPER_FIELDS)]);

        let paper: S2Paper = self.ctx.get_json(request, "Semantic Scholar").await?;
        Ok(Some(Self::parse_paper(paper)))
    }
}

// ===== Semantic Scholar API Types =====

#[derive(Debug, Deserialize)]
struct S2Paper {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<S2Author>,
    journal: Option<S2Journal>,
    venue: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    year: Option<i32>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2Author {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2Journal {
    name: Option<String>,
}
