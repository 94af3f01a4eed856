//! Figshare provider.
//!
//! Searches Figshare articles for the DOI and returns the download URL of
//! the first PDF file.
//! API documentation: <https://docs.figshare.com/>

use async_trait::async_trait;
use serde::Deserialize;

use super::fields::{lenient_year, string_or_first};
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

#[derive(Debug, Clone)]
pub struct FigshareSource {
    ctx: SourceContext,
}

impl FigshareSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Source for FigshareSource {
    fn id(&self) -> &str {
        "figshare"
    }

    fn name(&self) -> &str {
        "Figshare"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FULL_TEXT | SourceCapabilities::METADATA
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let request = self
            .ctx
            .client
            .post(&self.ctx.endpoint("articles/search"))
            .json(&serde_json::json!({ "search_for": format!(":doi: {}", doi), "page_size": 5 }));
        let articles: Vec<FigshareArticle> = self.ctx.get_json(request, "Figshare").await?;

        let Some(first) = articles.first() else {
            return Ok(None);
        };

        let pdf_url = articles
            .iter()
            .flat_map(|a| a.files.iter())
            .find(|f| f.name.as_deref().is_some_and(|n| n.to_lowercase().ends_with(".pdf")))
            .and_then(|f| f.download_url.clone());

        let metadata = PaperMetadata::default()
            .title(first.title.clone())
            .year(first.published_date)
            .authors(
                first
                    .authors
                    .iter()
                    .filter_map(|a| a.full_name.clone().map(Author::new))
                    .collect(),
            );

        Ok(Some(
            SourceHit::with_metadata(metadata)
                .pdf(pdf_url)
                .landing(first.url_public_html.clone())
                .host_type("repository"),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct FigshareArticle {
    #[serde(default, deserialize_with = "string_or_first")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    published_date: Option<i32>,
    #[serde(default)]
    authors: Vec<FigshareAuthor>,
    #[serde(default)]
    files: Vec<FigshareFile>,
    #[serde(default)]
    url_public_html: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FigshareAuthor {
    #[serde(default)]
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FigshareFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}
