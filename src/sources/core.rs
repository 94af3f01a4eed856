//! CORE provider.
//!
//! Searches the CORE aggregation of repository full texts by DOI.
//! API documentation: <https://api.core.ac.uk/docs/v3>

use async_trait::async_trait;
use serde::Deserialize;

use super::fields::{lenient_year, string_list, string_or_first};
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

/// CORE provider (API key required)
#[derive(Debug, Clone)]
pub struct CoreSource {
    ctx: SourceContext,
}

impl CoreSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    /// First work's download URL, else its first `.pdf` full-text URL that answers a HEAD probe
    async fn pick_pdf(&self, work: &CoreWork) -> Option<String> {
        if let Some(url) = work.download_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Some(url.to_string());
        }

        for url in work
            .source_fulltext_urls
            .iter()
            .filter(|u| u.to_lowercase().ends_with(".pdf"))
        {
            if self.ctx.client.probe(url).await {
                return Some(url.clone());
            }
            tracing::debug!(url = %url, "CORE full-text URL not reachable");
        }
        None
    }
}

#[async_trait]
impl Source for CoreSource {
    fn id(&self) -> &str {
        "core"
    }

    fn name(&self) -> &str {
        "CORE"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FULL_TEXT | SourceCapabilities::METADATA
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let api_key = self
            .ctx
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::Auth("CORE requires an API key".to_string()))?;

        let request = self
            .ctx
            .client
            .get(&self.ctx.endpoint("search/works"))
            .bearer_auth(api_key)
            .query(&[("q", format!("doi:\"{}\"", doi)), ("limit", "5".to_string())]);
        let response: CoreSearchResponse = self.ctx.get_json(request, "CORE").await?;

        let Some(work) = response.results.into_iter().next() else {
            return Ok(None);
        };

        let pdf_url = self.pick_pdf(&work).await;
        let metadata = PaperMetadata::default()
            .title(work.title)
            .journal(work.journals.into_iter().find_map(|j| j.title).or(work.publisher))
            .year(work.year_published)
            .authors(work.authors.into_iter().filter_map(|a| a.name.map(Author::new)).collect());

        Ok(Some(
            SourceHit::with_metadata(metadata)
                .pdf(pdf_url)
                .host_type("repository"),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct CoreSearchResponse {
    #[serde(default)]
    results: Vec<CoreWork>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoreWork {
    #[serde(default, deserialize_with = "string_or_first")]
    title: Option<String>,
    #[serde(default)]
    authors: Vec<CoreAuthor>,
    #[serde(default)]
    journals: Vec<CoreJournal>,
    #[serde(default, deserialize_with = "string_or_first")]
    publisher: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    year_published: Option<i32>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    source_fulltext_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CoreAuthor {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoreJournal {
    #[serde(default)]
    title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_context;
    use mockito::Matcher;

    fn doi() -> Doi {
        Doi::parse("10.1234/core.1").unwrap()
    }

    #[tokio::test]
    async fn test_download_url_preferred() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search/works")
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_body(
                r#"{"results": [{
                    "title": "Open repositories",
                    "authors": [{"name": "Petr Knoth"}],
                    "yearPublished": 2023,
                    "publisher": "CORE",
                    "downloadUrl": "https://core.ac.uk/download/1.pdf"
                }]}"#,
            )
            .create_async()
            .await;

        let source = CoreSource::new(test_context(&server.url()).api_key(Some("secret".to_string())));
        let hit = source.lookup(&doi()).await.unwrap().unwrap();

        assert_eq!(hit.pdf_url.as_deref(), Some("https://core.ac.uk/download/1.pdf"));
        assert_eq!(hit.metadata.journal.as_deref(), Some("CORE"));
        assert_eq!(hit.metadata.year, Some(2023));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fulltext_urls_are_probed() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(
            r#"{{"results": [{{"title": "T", "sourceFulltextUrls": ["{0}/dead.pdf", "{0}/page.html", "{0}/live.pdf"]}}]}}"#,
            server.url()
        );
        let _search = server
            .mock("GET", "/search/works")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        let _dead = server.mock("HEAD", "/dead.pdf").with_status(404).create_async().await;
        let _live = server.mock("HEAD", "/live.pdf").with_status(200).create_async().await;

        let source = CoreSource::new(test_context(&server.url()).api_key(Some("k".to_string())));
        let hit = source.lookup(&doi()).await.unwrap().unwrap();

        assert_eq!(hit.pdf_url, Some(format!("{}/live.pdf", server.url())));
    }

    #[tokio::test]
    async fn test_no_results() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search/works")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"totalHits": 0, "results": []}"#)
            .create_async()
            .await;

        let source = CoreSource::new(test_context(&server.url()).api_key(Some("k".to_string())));
        assert!(source.lookup(&doi()).await.unwrap().is_none());
    }
}
