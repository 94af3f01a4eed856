//! Europe PMC provider.
//!
//! Searches Europe PMC by DOI and returns open-access PDF full-text URLs.
//! The same adapter serves the preprint tier with a `PUB_TYPE:preprint` filter.
//! API documentation: <https://europepmc.org/RestfulWebService>

use async_trait::async_trait;
use serde::Deserialize;

use super::fields::{lenient_year, string_or_first};
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

/// Europe PMC provider
#[derive(Debug, Clone)]
pub struct EuropePmcSource {
    ctx: SourceContext,
    preprints: bool,
}

impl EuropePmcSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self {
            ctx,
            preprints: false,
        }
    }

    /// Restrict results to preprints
    pub fn preprints(ctx: SourceContext) -> Self {
        Self {
            ctx,
            preprints: true,
        }
    }

    fn query(&self, doi: &Doi) -> String {
        if self.preprints {
            format!("DOI:\"{}\" AND PUB_TYPE:preprint", doi)
        } else {
            format!("DOI:\"{}\"", doi)
        }
    }
}

#[async_trait]
impl Source for EuropePmcSource {
    fn id(&self) -> &str {
        if self.preprints {
            "europe_pmc_preprints"
        } else {
            "europe_pmc"
        }
    }

    fn name(&self) -> &str {
        if self.preprints {
            "Europe PMC Preprints"
        } else {
            "Europe PMC"
        }
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FULL_TEXT | SourceCapabilities::METADATA
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let request = self.ctx.client.get(&self.ctx.endpoint("search")).query(&[
            ("query", self.query(doi).as_str()),
            ("format", "json"),
            ("resultType", "core"),
        ]);
        let response: SearchResponse = self.ctx.get_json(request, self.name()).await?;

        let results = response.result_list.map(|l| l.result).unwrap_or_default();
        let Some(first) = results.first() else {
            return Ok(None);
        };

        let pdf_url = results.iter().find_map(EpmcResult::open_access_pdf);
        let metadata = PaperMetadata::default()
            .title(first.title.clone())
            .journal(first.journal_title.clone())
            .year(first.pub_year)
            .authors(
                first
                    .author_string
                    .as_deref()
                    .map(split_author_string)
                    .unwrap_or_default(),
            );

        let host_type = if self.preprints { "preprint" } else { "repository" };
        Ok(Some(
            SourceHit::with_metadata(metadata)
                .pdf(pdf_url)
                .host_type(host_type),
        ))
    }
}

fn split_author_string(authors: &str) -> Vec<Author> {
    authors
        .trim_end_matches('.')
        .split(", ")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(Author::new)
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    result_list: Option<ResultList>,
}

#[derive(Debug, Deserialize)]
struct ResultList {
    #[serde(default)]
    result: Vec<EpmcResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpmcResult {
    #[serde(default, deserialize_with = "string_or_first")]
    title: Option<String>,
    #[serde(default)]
    author_string: Option<String>,
    #[serde(default, deserialize_with = "string_or_first")]
    journal_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub_year: Option<i32>,
    #[serde(default)]
    full_text_url_list: Option<FullTextUrlList>,
}

impl EpmcResult {
    fn open_access_pdf(&self) -> Option<String> {
        self.full_text_url_list
            .as_ref()?
            .full_text_url
            .iter()
            .find(|u| {
                u.document_style.as_deref() == Some("pdf")
                    && u.availability.as_deref() == Some("OPEN_ACCESS")
            })
            .and_then(|u| u.url.clone())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FullTextUrlList {
    #[serde(default)]
    full_text_url: Vec<FullTextUrl>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FullTextUrl {
    #[serde(default)]
    availability: Option<String>,
    #[serde(default)]
    document_style: Option<String>,
    #[serde(default)]
    url: Option<String>,
}
