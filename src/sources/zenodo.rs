//! Zenodo provider.
//!
//! Searches Zenodo records by DOI and returns the first attached PDF file.
//! API documentation: <https://developers.zenodo.org/>

use async_trait::async_trait;
use serde::Deserialize;

use super::fields::{lenient_year, string_or_first};
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

#[derive(Debug, Clone)]
pub struct ZenodoSource {
    ctx: SourceContext,
}

impl ZenodoSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Source for ZenodoSource {
    fn id(&self) -> &str {
        "zenodo"
    }

    fn name(&self) -> &str {
        "Zenodo"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FULL_TEXT | SourceCapabilities::METADATA | SourceCapabilities::LANDING_PAGE
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let request = self
            .ctx
            .client
            .get(&self.ctx.endpoint("records"))
            .query(&[("q", format!("doi:\"{}\"", doi)), ("size", "5".to_string())]);
        let response: ZenodoResponse = self.ctx.get_json(request, "Zenodo").await?;

        let hits = response.hits.map(|h| h.hits).unwrap_or_default();
        let Some(first) = hits.first() else {
            return Ok(None);
        };

        let pdf_url = hits.iter().flat_map(|r| r.files.iter()).find_map(ZenodoFile::pdf_link);
        let metadata = first
            .metadata
            .as_ref()
            .map(ZenodoMetadata::to_metadata)
            .unwrap_or_default();
        let landing = first.links.as_ref().and_then(|l| l.html.clone());

        Ok(Some(
            SourceHit::with_metadata(metadata)
                .pdf(pdf_url)
                .landing(landing)
                .host_type("repository"),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ZenodoResponse {
    #[serde(default)]
    hits: Option<ZenodoHits>,
}

#[derive(Debug, Deserialize)]
struct ZenodoHits {
    #[serde(default)]
    hits: Vec<ZenodoRecord>,
}

#[derive(Debug, Deserialize)]
struct ZenodoRecord {
    #[serde(default)]
    metadata: Option<ZenodoMetadata>,
    #[serde(default)]
    files: Vec<ZenodoFile>,
    #[serde(default)]
    links: Option<ZenodoLinks>,
}

#[derive(Debug, Deserialize)]
struct ZenodoMetadata {
    #[serde(default, deserialize_with = "string_or_first")]
    title: Option<String>,
    #[serde(default)]
    creators: Vec<ZenodoCreator>,
    #[serde(default, deserialize_with = "lenient_year")]
    publication_date: Option<i32>,
    #[serde(default)]
    journal: Option<ZenodoJournal>,
}

impl ZenodoMetadata {
    fn to_metadata(&self) -> PaperMetadata {
        PaperMetadata::default()
            .title(self.title.clone())
            .journal(self.journal.as_ref().and_then(|j| j.title.clone()))
            .year(self.publication_date)
            .authors(
                self.creators
                    .iter()
                    .filter_map(|c| {
                        c.name
                            .clone()
                            .map(|name| Author::new(name).with_affiliation(c.affiliation.clone()))
                    })
                    .collect(),
            )
    }
}

#[derive(Debug, Deserialize)]
struct ZenodoCreator {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    affiliation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ZenodoJournal {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ZenodoFile {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    links: Option<ZenodoFileLinks>,
}

impl ZenodoFile {
    /// The download link of a PDF file; newer records end it in `/content`
    fn pdf_link(&self) -> Option<String> {
        let link = self.links.as_ref()?.link.clone()?;
        let is_pdf = link.to_lowercase().ends_with(".pdf")
            || self.key.as_deref().is_some_and(|k| k.to_lowercase().ends_with(".pdf"));
        is_pdf.then_some(link)
    }
}

#[derive(Debug, Deserialize)]
struct ZenodoFileLinks {
    #[serde(default, rename = "self")]
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ZenodoLinks {
    #[serde(default)]
    html: Option<String>,
}
