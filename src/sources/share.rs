//! OSF SHARE provider.
//!
//! Searches the SHARE index of research outputs and looks for a `.pdf` URL
//! among each result's sources, its full-text field and its links.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use super::fields::{lenient_year, string_list, string_or_first};
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

#[derive(Debug, Clone)]
pub struct ShareSource {
    ctx: SourceContext,
}

impl ShareSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }
}

fn is_pdf(url: &str) -> bool {
    url.to_lowercase().ends_with(".pdf")
}

#[async_trait]
impl Source for ShareSource {
    fn id(&self) -> &str {
        "share"
    }

    fn name(&self) -> &str {
        "OSF SHARE"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FULL_TEXT | SourceCapabilities::METADATA
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let query = format!("doi:{}", doi);
        let request = self
            .ctx
            .client
            .get(&self.ctx.endpoint("search/"))
            .query(&[("q", query.as_str()), ("page[size]", "5")]);
        let response: ShareResponse = self.ctx.get_json(request, "SHARE").await?;

        let Some(first) = response.data.first() else {
            return Ok(None);
        };

        let pdf_url = response
            .data
            .iter()
            .find_map(|item| item.attributes.as_ref().and_then(ShareAttributes::pdf_url));
        let metadata = first
            .attributes
            .as_ref()
            .map(|a| {
                PaperMetadata::default()
                    .title(a.title.clone())
                    .year(a.date_published)
                    .authors(a.contributors.iter().cloned().map(Author::new).collect())
            })
            .unwrap_or_default();

        Ok(Some(
            SourceHit::with_metadata(metadata)
                .pdf(pdf_url)
                .host_type("repository"),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ShareResponse {
    #[serde(default)]
    data: Vec<ShareItem>,
}

#[derive(Debug, Deserialize)]
struct ShareItem {
    #[serde(default)]
    attributes: Option<ShareAttributes>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShareAttributes {
    #[serde(default, deserialize_with = "string_or_first")]
    title: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    contributors: Vec<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    date_published: Option<i32>,
    #[serde(default)]
    sources: Vec<ShareSourceLink>,
    #[serde(default)]
    fulltext: Option<String>,
    #[serde(default)]
    links: HashMap<String, String>,
}

impl ShareAttributes {
    /// Sources first, then the full-text field, then `links.pdf` and `links.html`
    fn pdf_url(&self) -> Option<String> {
        let from_sources = self
            .sources
            .iter()
            .filter_map(|s| s.url.as_deref())
            .find(|u| is_pdf(u));
        let from_links = ["pdf", "html"]
            .iter()
            .filter_map(|key| self.links.get(*key).map(String::as_str))
            .find(|u| is_pdf(u));

        from_sources
            .or(self.fulltext.as_deref().filter(|u| is_pdf(u)))
            .or(from_links)
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize)]
struct ShareSourceLink {
    #[serde(default)]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_context;
    use mockito::Matcher;

    fn attributes(json: &str) -> ShareAttributes {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_pdf_search_order() {
        let both = attributes(
            r#"{"sources": [{"url": "https://osf.io/a.pdf"}], "fulltext": "https://osf.io/b.pdf"}"#,
        );
        assert_eq!(both.pdf_url().as_deref(), Some("https://osf.io/a.pdf"));

        let links = attributes(r#"{"links": {"html": "https://osf.io/c.PDF", "pdf": "https://osf.io/c"}}"#);
        assert_eq!(links.pdf_url().as_deref(), Some("https://osf.io/c.PDF"));

        assert!(attributes(r#"{"fulltext": "https://osf.io/page"}"#).pdf_url().is_none());
    }

    #[tokio::test]
    async fn test_lookup() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"data": [{"attributes": {
                    "title": "Preregistration",
                    "contributors": ["Brian Nosek"],
                    "datePublished": "2018-03-13",
                    "fulltext": "https://osf.io/x/download.pdf"
                }}]}"#,
            )
            .create_async()
            .await;

        let source = ShareSource::new(test_context(&server.url()));
        let hit = source
            .lookup(&Doi::parse("10.31219/osf.io/x").unwrap())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(hit.pdf_url.as_deref(), Some("https://osf.io/x/download.pdf"));
        assert_eq!(hit.metadata.year, Some(2018));
    }
}
