//! Internet Archive provider.
//!
//! Runs an advanced search for the DOI, then probes the conventional
//! `/download/<id>/<id>.pdf` location of each matching item.

use async_trait::async_trait;
use serde::Deserialize;

use super::fields::{lenient_year, string_list, string_or_first};
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

const MAX_PROBES: usize = 3;

#[derive(Debug, Clone)]
pub struct InternetArchiveSource {
    ctx: SourceContext,
}

impl InternetArchiveSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Source for InternetArchiveSource {
    fn id(&self) -> &str {
        "internet_archive"
    }

    fn name(&self) -> &str {
        "Internet Archive"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FULL_TEXT | SourceCapabilities::METADATA
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let query = format!("doi:\"{}\"", doi);
        let request = self.ctx.client.get(&self.ctx.endpoint("advancedsearch.php")).query(&[
            ("q", query.as_str()),
            ("fl[]", "identifier"),
            ("fl[]", "title"),
            ("fl[]", "creator"),
            ("fl[]", "year"),
            ("rows", "5"),
            ("output", "json"),
        ]);
        let response: SearchResponse = self.ctx.get_json(request, "Internet Archive").await?;

        let docs = response.response.map(|r| r.docs).unwrap_or_default();
        let Some(first) = docs.first() else {
            return Ok(None);
        };

        let mut pdf_url = None;
        for identifier in docs.iter().filter_map(|d| d.identifier.as_deref()).take(MAX_PROBES) {
            let candidate = self
                .ctx
                .endpoint(&format!("download/{0}/{0}.pdf", urlencoding::encode(identifier)));
            if self.ctx.client.probe(&candidate).await {
                pdf_url = Some(candidate);
                break;
            }
        }

        let metadata = PaperMetadata::default()
            .title(first.title.clone())
            .year(first.year)
            .authors(first.creator.iter().cloned().map(Author::new).collect());

        Ok(Some(
            SourceHit::with_metadata(metadata)
                .pdf(pdf_url)
                .host_type("repository"),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    response: Option<SearchDocs>,
}

#[derive(Debug, Deserialize)]
struct SearchDocs {
    #[serde(default)]
    docs: Vec<ArchiveDoc>,
}

#[derive(Debug, Deserialize)]
struct ArchiveDoc {
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default, deserialize_with = "string_or_first")]
    title: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    creator: Vec<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    year: Option<i32>,
}
