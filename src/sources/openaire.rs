//! OpenAIRE provider.
//!
//! Queries the OpenAIRE publication search by DOI and keeps full texts
//! served as `application/pdf`.

use async_trait::async_trait;
use serde::Deserialize;

use super::fields::{lenient_year, string_or_first};
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

#[derive(Debug, Clone)]
pub struct OpenAireSource {
    ctx: SourceContext,
}

impl OpenAireSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Source for OpenAireSource {
    fn id(&self) -> &str {
        "openaire"
    }

    fn name(&self) -> &str {
        "OpenAIRE"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FULL_TEXT | SourceCapabilities::METADATA
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let request = self
            .ctx
            .client
            .get(&self.ctx.endpoint("search/publications"))
            .query(&[("doi", doi.as_str()), ("format", "json")]);
        let response: OpenAireResponse = self.ctx.get_json(request, "OpenAIRE").await?;

        let Some(publication) = response.results.into_iter().next().and_then(|r| r.result) else {
            return Ok(None);
        };

        let pdf_url = publication
            .fulltexts
            .iter()
            .find(|ft| {
                ft.media_type
                    .as_deref()
                    .is_some_and(|m| m.eq_ignore_ascii_case("application/pdf"))
            })
            .and_then(|ft| ft.url.clone());

        let metadata = PaperMetadata::default()
            .title(publication.title)
            .journal(publication.publisher)
            .year(publication.publication_year)
            .authors(
                publication
                    .creators
                    .into_iter()
                    .filter_map(|c| c.name.map(Author::new))
                    .collect(),
            );

        Ok(Some(
            SourceHit::with_metadata(metadata)
                .pdf(pdf_url)
                .host_type("repository"),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct OpenAireResponse {
    #[serde(default)]
    results: Vec<OpenAireRecord>,
}

#[derive(Debug, Deserialize)]
struct OpenAireRecord {
    #[serde(default)]
    result: Option<Publication>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Publication {
    #[serde(default, deserialize_with = "string_or_first")]
    title: Option<String>,
    #[serde(default)]
    creators: Vec<Creator>,
    #[serde(default, deserialize_with = "string_or_first")]
    publisher: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    publication_year: Option<i32>,
    #[serde(default)]
    fulltexts: Vec<FullText>,
}

#[derive(Debug, Deserialize)]
struct Creator {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FullText {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    media_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_context;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_pdf_fulltext_selected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search/publications")
            .match_query(Matcher::UrlEncoded("doi".into(), "10.5281/zenodo.42".into()))
            .with_status(200)
            .with_body(
                r#"{"results": [{"result": {
                    "title": "Research graph",
                    "creators": [{"name": "Paolo Manghi"}],
                    "publisher": "Zenodo",
                    "publicationYear": "2021",
                    "fulltexts": [
                        {"url": "https://zenodo.org/record/42", "mediaType": "text/html"},
                        {"url": "https://zenodo.org/record/42/files/paper.pdf", "mediaType": "Application/PDF"}
                    ]
                }}]}"#,
            )
            .create_async()
            .await;

        let source = OpenAireSource::new(test_context(&server.url()));
        let hit = source
            .lookup(&Doi::parse("10.5281/zenodo.42").unwrap())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            hit.pdf_url.as_deref(),
            Some("https://zenodo.org/record/42/files/paper.pdf")
        );
        assert_eq!(hit.metadata.year, Some(2021));
        assert_eq!(hit.metadata.authors[0].name, "Paolo Manghi");
    }

    #[tokio::test]
    async fn test_empty_results() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search/publications")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"results": []}"#)
            .create_async()
            .await;

        let source = OpenAireSource::new(test_context(&server.url()));
        assert!(source
            .lookup(&Doi::parse("10.5281/zenodo.42").unwrap())
            .await
            .unwrap()
            .is_none());
    }
}
