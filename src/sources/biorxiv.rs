//! bioRxiv and medRxiv provider.
//!
//! Both servers share the Cold Spring Harbor DOI prefix `10.1101` and the
//! same `/content/<doi>.full.pdf` layout, so one adapter serves both.

use async_trait::async_trait;

use crate::models::Doi;
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

const CSHL_DOI_PREFIX: &str = "10.1101";

#[derive(Debug, Clone)]
pub struct BiorxivSource {
    ctx: SourceContext,
    id: &'static str,
    name: &'static str,
}

impl BiorxivSource {
    pub fn biorxiv(ctx: SourceContext) -> Self {
        Self {
            ctx,
            id: "biorxiv",
            name: "bioRxiv",
        }
    }

    pub fn medrxiv(ctx: SourceContext) -> Self {
        Self {
            ctx,
            id: "medrxiv",
            name: "medRxiv",
        }
    }
}

#[async_trait]
impl Source for BiorxivSource {
    fn id(&self) -> &str {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FULL_TEXT | SourceCapabilities::LANDING_PAGE
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        if doi.prefix() != CSHL_DOI_PREFIX {
            return Err(SourceError::NotFound(format!("not a {} DOI", self.name)));
        }

        let landing = self.ctx.endpoint(&format!("content/{}", doi));
        let pdf_url = format!("{}.full.pdf", landing);
        if !self.ctx.client.probe(&pdf_url).await {
            return Err(SourceError::NotFound(format!("no PDF on {}", self.name)));
        }

        Ok(Some(
            SourceHit::with_pdf(pdf_url)
                .landing(Some(landing))
                .host_type("preprint"),
        ))
    }
}
