//! PLOS provider.
//!
//! Confirms a PLOS DOI through the PLOS Solr search API and builds the
//! printable PDF link from the DOI.
//! API documentation: <https://api.plos.org/solr/faq/>

use async_trait::async_trait;
use serde::Deserialize;

use super::fields::{lenient_year, string_list, string_or_first};
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

const PLOS_DOI_PREFIX: &str = "10.1371";
const PLOS_PRINTABLE_URL: &str = "https://journals.plos.org/plosone/article/file";

#[derive(Debug, Clone)]
pub struct PlosSource {
    ctx: SourceContext,
}

impl PlosSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }
}

fn printable_pdf(doi: &Doi) -> String {
    format!("{}?id={}&type=printable", PLOS_PRINTABLE_URL, doi.url_encoded())
}

#[async_trait]
impl Source for PlosSource {
    fn id(&self) -> &str {
        "plos"
    }

    fn name(&self) -> &str {
        "PLOS"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FULL_TEXT | SourceCapabilities::METADATA
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        if doi.prefix() != PLOS_DOI_PREFIX {
            return Err(SourceError::NotFound("not a PLOS DOI".to_string()));
        }

        let query = format!("id:\"{}\"", doi);
        let request = self.ctx.client.get(&self.ctx.endpoint("search")).query(&[
            ("q", query.as_str()),
            ("fl", "id,title_display,author_display,publication_date,journal"),
            ("wt", "json"),
        ]);
        let response: PlosResponse = self.ctx.get_json(request, "PLOS").await?;

        let Some(doc) = response.response.and_then(|r| r.docs.into_iter().next()) else {
            return Ok(None);
        };

        let metadata = PaperMetadata::default()
            .title(doc.title)
            .journal(doc.journal)
            .year(doc.publication_date)
            .authors(doc.authors.into_iter().map(Author::new).collect());

        Ok(Some(
            SourceHit::with_pdf(printable_pdf(doi))
                .metadata(metadata)
                .landing(Some(doi.resolver_url()))
                .host_type("publisher"),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct PlosResponse {
    #[serde(default)]
    response: Option<PlosDocs>,
}

#[derive(Debug, Deserialize)]
struct PlosDocs {
    #[serde(default)]
    docs: Vec<PlosDoc>,
}

#[derive(Debug, Deserialize)]
struct PlosDoc {
    #[serde(default, alias = "title", rename = "title_display", deserialize_with = "string_or_first")]
    title: Option<String>,
    #[serde(default, alias = "author", rename = "author_display", deserialize_with = "string_list")]
    authors: Vec<String>,
    #[serde(default, deserialize_with = "string_or_first")]
    journal: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    publication_date: Option<i32>,
}
