//! PubMed metadata provider using the NCBI E-utilities.
//!
//! Two calls: `esearch` maps the DOI to a PMID (XML), `esummary` returns
//! the document summary for that PMID (JSON).

use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use serde_json::Value;

use super::fields::year_from_str;
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

/// PubMed metadata source
#[derive(Debug, Clone)]
pub struct PubMedSource {
    ctx: SourceContext,
}

impl PubMedSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    /// NCBI asks automated clients to identify themselves
    fn identify(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.query(&[("tool", env!("CARGO_PKG_NAME"))]);
        match &self.ctx.contact_email {
            Some(email) => request.query(&[("email", email.as_str())]),
            None => request,
        }
    }

    /// Parse E-utilities search response XML
    fn parse_search_response(xml: &str) -> Result<Vec<String>, SourceError> {
        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct ESearchResult {
            #[serde(default)]
            IdList: IdList,
        }

        #[derive(Debug, Default, Deserialize)]
        struct IdList {
            #[serde(rename = "Id", default)]
            ids: Vec<String>,
        }

        let result: ESearchResult = from_str(xml)
            .map_err(|e| SourceError::Parse(format!("Failed to parse PubMed search XML: {}", e)))?;

        Ok(result.IdList.ids)
    }

    /// Pull the summary for `pmid` out of an `esummary` JSON body
    fn parse_summary(body: Value, pmid: &str) -> Result<Option<PaperMetadata>, SourceError> {
        let Some(record) = body.get("result").and_then(|r| r.get(pmid)).cloned() else {
            return Ok(None);
        };
        let summary: ESummary = serde_json::from_value(record)?;

        let authors = summary
            .authors
            .into_iter()
            .filter(|a| a.authtype.as_deref().map_or(true, |t| t == "Author"))
            .filter_map(|a| a.name)
            .map(Author::new)
            .collect();

        let year = summary.pubdate.as_deref().and_then(year_from_str);

        Ok(Some(
            PaperMetadata::default()
                .title(summary.title.map(|t| t.trim_end_matches('.').to_string()))
                .journal(summary.fulljournalname.or(summary.source))
                .year(year)
                .authors(authors),
        ))
    }
}

#[async_trait]
impl Source for PubMedSource {
    fn id(&self) -> &str {
        "pubmed"
    }

    fn name(&self) -> &str {
        "PubMed"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::METADATA
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let term = format!("{}[doi]", doi);
        let search = self.identify(self.ctx.client.get(&self.ctx.endpoint("esearch.fcgi")).query(&[
            ("db", "pubmed"),
            ("term", term.as_str()),
            ("retmode", "xml"),
        ]));
        let xml = self.ctx.get_text(search, "PubMed").await?;

        let Some(pmid) = Self::parse_search_response(&xml)?.into_iter().next() else {
            return Ok(None);
        };

        let summary = self.identify(self.ctx.client.get(&self.ctx.endpoint("esummary.fcgi")).query(&[
            ("db", "pubmed"),
            ("id", pmid.as_str()),
            ("retmode", "json"),
        ]));
        let body: Value = self.ctx.get_json(summary, "PubMed").await?;

        let hit = Self::parse_summary(body, &pmid)?.map(|metadata| {
            SourceHit::with_metadata(metadata)
                .landing(Some(format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid)))
        });
        Ok(hit)
    }
}

// ===== E-utilities summary types =====

#[derive(Debug, Deserialize)]
struct ESummary {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<ESummaryAuthor>,
    fulljournalname: Option<String>,
    source: Option<String>,
    pubdate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ESummaryAuthor {
    name: Option<String>,
    authtype: Option<String>,
}
