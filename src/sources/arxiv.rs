//! arXiv provider.
//!
//! arXiv mints DOIs of the form `10.48550/arXiv.<id>`; for those the PDF
//! location is derived from the identifier and confirmed with a HEAD probe.
//! Other DOIs are answered locally without a network call.

use async_trait::async_trait;

use crate::models::Doi;
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

const ARXIV_DOI_PREFIX: &str = "10.48550";
const ARXIV_SUFFIX_PREFIX: &str = "arxiv.";

#[derive(Debug, Clone)]
pub struct ArxivSource {
    ctx: SourceContext,
}

impl ArxivSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }
}

/// The arXiv identifier inside an arXiv-minted DOI
fn arxiv_id(doi: &Doi) -> Option<&str> {
    if doi.prefix() != ARXIV_DOI_PREFIX {
        return None;
    }
    let suffix = doi.suffix();
    let head = suffix.get(..ARXIV_SUFFIX_PREFIX.len())?;
    if !head.eq_ignore_ascii_case(ARXIV_SUFFIX_PREFIX) {
        return None;
    }
    suffix
        .get(ARXIV_SUFFIX_PREFIX.len()..)
        .filter(|id| !id.is_empty())
}

#[async_trait]
impl Source for ArxivSource {
    fn id(&self) -> &str {
        "arxiv"
    }

    fn name(&self) -> &str {
        "arXiv"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FULL_TEXT | SourceCapabilities::LANDING_PAGE
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let Some(id) = arxiv_id(doi) else {
            return Err(SourceError::NotFound("not an arXiv DOI".to_string()));
        };

        let pdf_url = self.ctx.endpoint(&format!("pdf/{}", id));
        if !self.ctx.client.probe(&pdf_url).await {
            return Err(SourceError::NotFound(format!("no PDF at {}", pdf_url)));
        }

        Ok(Some(
            SourceHit::with_pdf(pdf_url)
                .landing(Some(self.ctx.endpoint(&format!("abs/{}", id))))
                .host_type("preprint"),
        ))
    }
}
