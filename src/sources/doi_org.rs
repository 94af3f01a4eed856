//! doi.org redirect provider.
//!
//! Follows the DOI resolver's redirect chain to the publisher. A final URL
//! that serves a PDF is a full-text link; an arXiv abstract page is
//! rewritten to its PDF; anything else is reported as a landing page only.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use crate::models::Doi;
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

#[derive(Debug, Clone)]
pub struct DoiOrgSource {
    ctx: SourceContext,
}

impl DoiOrgSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }
}

/// Where the redirect chain ended
#[derive(Debug, Clone, PartialEq, Eq)]
enum Destination {
    Pdf(String),
    Landing(String),
}

fn classify(final_url: &url::Url, content_type: Option<&str>) -> Destination {
    let is_pdf_type = content_type.is_some_and(|c| c.to_lowercase().contains("pdf"));
    if final_url.path().to_lowercase().ends_with(".pdf") || is_pdf_type {
        return Destination::Pdf(final_url.to_string());
    }

    let on_arxiv = final_url
        .host_str()
        .is_some_and(|h| h == "arxiv.org" || h.ends_with(".arxiv.org"));
    if on_arxiv && final_url.path().starts_with("/abs/") {
        let mut pdf = final_url.clone();
        pdf.set_path(&final_url.path().replacen("/abs/", "/pdf/", 1));
        return Destination::Pdf(pdf.to_string());
    }

    Destination::Landing(final_url.to_string())
}

#[async_trait]
impl Source for DoiOrgSource {
    fn id(&self) -> &str {
        "doi_org"
    }

    fn name(&self) -> &str {
        "doi.org"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FULL_TEXT | SourceCapabilities::LANDING_PAGE
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let response = self
            .ctx
            .client
            .get(&self.ctx.endpoint(doi.as_str()))
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to follow DOI redirect: {}", e)))?;

        let status = response.status();
        let final_url = response.url().clone();
        // Publishers often refuse automated clients after the redirect; the
        // final URL is still a valid landing page in that case.
        if status == StatusCode::NOT_FOUND && final_url.as_str().starts_with(&self.ctx.base_url) {
            return Err(SourceError::NotFound("DOI is not registered".to_string()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let hit = match classify(&final_url, content_type.as_deref()) {
            Destination::Pdf(link) if status.is_success() => {
                SourceHit::with_pdf(link).host_type("publisher")
            }
            Destination::Pdf(link) | Destination::Landing(link) => SourceHit::default()
                .landing(Some(link))
                .host_type("publisher")
                .note("publisher landing page only"),
        };
        Ok(Some(hit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_context;

    fn url(s: &str) -> url::Url {
        url::Url::parse(s).unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(&url("https://pub.example.org/article.PDF"), None),
            Destination::Pdf("https://pub.example.org/article.PDF".to_string())
        );
        assert_eq!(
            classify(&url("https://pub.example.org/download?id=1"), Some("application/pdf")),
            Destination::Pdf("https://pub.example.org/download?id=1".to_string())
        );
        assert_eq!(
            classify(&url("https://arxiv.org/abs/2301.12345"), Some("text/html")),
            Destination::Pdf("https://arxiv.org/pdf/2301.12345".to_string())
        );
        assert_eq!(
            classify(&url("https://www.nature.com/articles/x"), Some("text/html")),
            Destination::Landing("https://www.nature.com/articles/x".to_string())
        );
    }

    #[tokio::test]
    async fn test_redirect_to_pdf() {
        let mut server = mockito::Server::new_async().await;
        let _redirect = server
            .mock("GET", "/10.1234/oa.1")
            .with_status(302)
            .with_header("location", &format!("{}/files/oa.pdf", server.url()))
            .create_async()
            .await;
        let _pdf = server
            .mock("GET", "/files/oa.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body("%PDF-1.7")
            .create_async()
            .await;

        let source = DoiOrgSource::new(test_context(&server.url()));
        let hit = source
            .lookup(&Doi::parse("10.1234/oa.1").unwrap())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(hit.pdf_url, Some(format!("{}/files/oa.pdf", server.url())));
    }

    #[tokio::test]
    async fn test_landing_page_only() {
        let mut server = mockito::Server::new_async().await;
        let _redirect = server
            .mock("GET", "/10.1234/closed.1")
            .with_status(302)
            .with_header("location", &format!("{}/article/closed", server.url()))
            .create_async()
            .await;
        let _landing = server
            .mock("GET", "/article/closed")
            .with_status(403)
            .with_header("content-type", "text/html")
            .create_async()
            .await;

        let source = DoiOrgSource::new(test_context(&server.url()));
        let hit = source
            .lookup(&Doi::parse("10.1234/closed.1").unwrap())
            .await
            .unwrap()
            .unwrap();

        assert!(hit.pdf_url.is_none());
        assert_eq!(hit.landing_url, Some(format!("{}/article/closed", server.url())));
    }

    #[tokio::test]
    async fn test_unregistered_doi() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/10.1234/nope")
            .with_status(404)
            .create_async()
            .await;

        let source = DoiOrgSource::new(test_context(&server.url()));
        let result = source.lookup(&Doi::parse("10.1234/nope").unwrap()).await;
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }
}
