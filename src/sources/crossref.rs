//! Crossref metadata provider.
//!
//! Uses the Crossref REST API `works/{doi}` route. Crossref is the DOI
//! registration agency for most journal content, so its record is the
//! authoritative bibliographic answer even though it never links full text.

use async_trait::async_trait;
use serde::Deserialize;

use super::fields::{lenient_year, string_or_first};
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

/// Crossref metadata source
#[derive(Debug, Clone)]
pub struct CrossRefSource {
    ctx: SourceContext,
}

impl CrossRefSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Source for CrossRefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "Crossref"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::METADATA | SourceCapabilities::LANDING_PAGE
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let url = self.ctx.endpoint(&format!("works/{}", doi.url_encoded()));
        let mut request = self.ctx.client.get(&url);
        if let Some(email) = &self.ctx.contact_email {
            request = request.query(&[("mailto", email.as_str())]);
        }

        let data: CRResponse = self.ctx.get_json(request, "Crossref").await?;
        let item = data.message;

        let authors = item
            .author
            .iter()
            .filter_map(|a| {
                let author = match (&a.given, &a.family) {
                    (None, None) => a.name.as_deref().map(Author::new),
                    (given, family) => Author::from_parts(given.as_deref(), family.as_deref()),
                }?;
                Some(author.with_affiliation(a.affiliation.first().and_then(|aff| aff.name.clone())))
            })
            .collect();

        let year = [&item.published, &item.published_print, &item.published_online, &item.created]
            .into_iter()
            .flatten()
            .find_map(|date| date.year);

        let metadata = PaperMetadata::default()
            .title(item.title)
            .journal(item.container_title)
            .year(year)
            .authors(authors);

        Ok(Some(SourceHit::with_metadata(metadata).landing(item.url)))
    }
}

// ===== Crossref API Types =====

#[derive(Debug, Deserialize)]
struct CRResponse {
    message: CRWork,
}

#[derive(Debug, Deserialize)]
struct CRWork {
    #[serde(default, deserialize_with = "string_or_first")]
    title: Option<String>,
    #[serde(default)]
    author: Vec<CRAuthor>,
    #[serde(default, rename = "container-title", deserialize_with = "string_or_first")]
    container_title: Option<String>,
    #[serde(default)]
    published: Option<CRDate>,
    #[serde(default, rename = "published-print")]
    published_print: Option<CRDate>,
    #[serde(default, rename = "published-online")]
    published_online: Option<CRDate>,
    #[serde(default)]
    created: Option<CRDate>,
    #[serde(default, rename = "URL")]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CRAuthor {
    given: Option<String>,
    family: Option<String>,
    /// Consortium authors carry only a name
    name: Option<String>,
    #[serde(default)]
    affiliation: Vec<CRAffiliation>,
}

#[derive(Debug, Deserialize)]
struct CRAffiliation {
    name: Option<String>,
}

/// `{"date-parts": [[2020, 9, 16]]}`
#[derive(Debug, Deserialize)]
struct CRDate {
    #[serde(default, rename = "date-parts", deserialize_with = "first_date_part")]
    year: Option<i32>,
}

fn first_date_part<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let parts = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    let first = parts.and_then(|p| p.into_iter().next());
    Ok(first.and_then(|part| lenient_year(part).ok().flatten()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_context;

    const NUMPY: &str = r#"{
        "status": "ok",
        "message": {
            "DOI": "10.1038/s41586-020-2649-2",
            "title": ["Array programming with NumPy"],
            "container-title": ["Nature"],
            "author": [
                {"given": "Charles R.", "family": "Harris", "affiliation": [{"name": "Independent researcher"}]},
                {"given": "K. Jarrod", "family": "Millman", "affiliation": []},
                {"name": "The NumPy Developers"}
            ],
            "published": {"date-parts": [[2020, 9, 16]]},
            "created": {"date-parts": [[2020, 9, 17]]},
            "URL": "https://doi.org/10.1038/s41586-020-2649-2"
        }
    }"#;

    #[tokio::test]
    async fn test_lookup_parses_work() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works/10.1038%2Fs41586-020-2649-2")
            .with_status(200)
            .with_body(NUMPY)
            .create_async()
            .await;

        let source = CrossRefSource::new(test_context(&server.url()));
        let hit = source
            .lookup(&Doi::parse("10.1038/s41586-020-2649-2").unwrap())
            .await
            .unwrap()
            .unwrap();

        mock.assert_async().await;
        assert!(hit.pdf_url.is_none());
        assert_eq!(hit.metadata.title.as_deref(), Some("Array programming with NumPy"));
        assert_eq!(hit.metadata.journal.as_deref(), Some("Nature"));
        assert_eq!(hit.metadata.year, Some(2020));
        assert_eq!(hit.metadata.authors.len(), 3);
        assert_eq!(hit.metadata.authors[0].name, "Charles R. Harris");
        assert_eq!(
            hit.metadata.authors[0].affiliation.as_deref(),
            Some("Independent researcher")
        );
        assert_eq!(hit.metadata.authors[2].name, "The NumPy Developers");
    }

    #[tokio::test]
    async fn test_falls_back_to_created_date() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/works/10.1234%2Fx")
            .with_status(200)
            .with_body(r#"{"message": {"title": ["T"], "created": {"date-parts": [[2011, 2]]}}}"#)
            .create_async()
            .await;

        let source = CrossRefSource::new(test_context(&server.url()));
        let hit = source
            .lookup(&Doi::parse("10.1234/x").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.metadata.year, Some(2011));
    }

    #[tokio::test]
    async fn test_unknown_doi() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/works/10.1234%2Fmissing")
            .with_status(404)
            .with_body("Resource not found.")
            .create_async()
            .await;

        let source = CrossRefSource::new(test_context(&server.url()));
        let result = source.lookup(&Doi::parse("10.1234/missing").unwrap()).await;
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }
}
