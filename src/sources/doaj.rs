//! DOAJ provider.
//!
//! Looks an article up in the Directory of Open Access Journals and returns
//! the PDF link from its bibliographic record.
//! API documentation: <https://doaj.org/api/docs>

use async_trait::async_trait;
use serde::Deserialize;

use super::fields::{lenient_year, string_or_first};
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

#[derive(Debug, Clone)]
pub struct DoajSource {
    ctx: SourceContext,
}

impl DoajSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Source for DoajSource {
    fn id(&self) -> &str {
        "doaj"
    }

    fn name(&self) -> &str {
        "DOAJ"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FULL_TEXT | SourceCapabilities::METADATA
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let path = format!("search/articles/{}", urlencoding::encode(&format!("doi:{}", doi)));
        let request = self.ctx.client.get(&self.ctx.endpoint(&path));
        let response: DoajResponse = self.ctx.get_json(request, "DOAJ").await?;

        let Some(article) = response.results.into_iter().next().and_then(|r| r.bibjson) else {
            return Ok(None);
        };

        let pdf_url = article
            .link
            .iter()
            .find(|l| {
                l.url.is_some()
                    && (l.content_type.as_deref() == Some("application/pdf")
                        || l.content_type.as_deref().is_some_and(|c| c.eq_ignore_ascii_case("pdf")))
            })
            .and_then(|l| l.url.clone());

        let metadata = PaperMetadata::default()
            .title(article.title)
            .journal(article.journal.and_then(|j| j.title))
            .year(article.year)
            .authors(
                article
                    .author
                    .into_iter()
                    .filter_map(|a| a.name.map(|name| Author::new(name).with_affiliation(a.affiliation)))
                    .collect(),
            );

        Ok(Some(
            SourceHit::with_metadata(metadata)
                .pdf(pdf_url)
                .host_type("publisher"),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct DoajResponse {
    #[serde(default)]
    results: Vec<DoajArticle>,
}

#[derive(Debug, Deserialize)]
struct DoajArticle {
    #[serde(default)]
    bibjson: Option<BibJson>,
}

#[derive(Debug, Deserialize)]
struct BibJson {
    #[serde(default, deserialize_with = "string_or_first")]
    title: Option<String>,
    #[serde(default)]
    author: Vec<DoajAuthor>,
    #[serde(default)]
    journal: Option<DoajJournal>,
    #[serde(default, deserialize_with = "lenient_year")]
    year: Option<i32>,
    #[serde(default)]
    link: Vec<DoajLink>,
}

#[derive(Debug, Deserialize)]
struct DoajAuthor {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    affiliation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DoajJournal {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DoajLink {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_context;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_pdf_link_from_bibjson() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Regex(r"^/search/articles/".to_string()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"total": 1, "results": [{"bibjson": {
                    "title": "Coral reef resilience",
                    "year": "2022",
                    "journal": {"title": "PeerJ"},
                    "author": [{"name": "Ana Lima", "affiliation": "USP"}],
                    "link": [
                        {"type": "fulltext", "url": "https://peerj.com/articles/1", "content_type": "HTML"},
                        {"type": "fulltext", "url": "https://peerj.com/articles/1.pdf", "content_type": "application/pdf"}
                    ]
                }}]}"#,
            )
            .create_async()
            .await;

        let source = DoajSource::new(test_context(&server.url()));
        let hit = source
            .lookup(&Doi::parse("10.7717/peerj.1").unwrap())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(hit.pdf_url.as_deref(), Some("https://peerj.com/articles/1.pdf"));
        assert_eq!(hit.metadata.journal.as_deref(), Some("PeerJ"));
        assert_eq!(hit.metadata.authors[0].affiliation.as_deref(), Some("USP"));
    }

    #[tokio::test]
    async fn test_no_pdf_still_yields_metadata() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Regex(r"^/search/articles/".to_string()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"results": [{"bibjson": {"title": "Only metadata", "link": []}}]}"#)
            .create_async()
            .await;

        let source = DoajSource::new(test_context(&server.url()));
        let hit = source
            .lookup(&Doi::parse("10.7717/peerj.2").unwrap())
            .await
            .unwrap()
            .unwrap();

        assert!(hit.pdf_url.is_none());
        assert_eq!(hit.metadata.title.as_deref(), Some("Only metadata"));
    }
}
