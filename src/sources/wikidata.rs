//! Wikidata provider backed by the public SPARQL endpoint.
//!
//! Wikidata stores DOIs (property P356) upper-cased, so the lookup
//! upper-cases the DOI before matching.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use super::fields::year_from_str;
use crate::models::{Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

#[derive(Debug, Clone)]
pub struct WikidataSource {
    ctx: SourceContext,
}

impl WikidataSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }
}

fn sparql_query(doi: &Doi) -> String {
    // Quotes and backslashes cannot appear unescaped inside the literal
    let literal = doi
        .as_str()
        .to_uppercase()
        .replace('\\', "\\\\")
        .replace('"', "\\\"");
    format!(
        r#"SELECT ?item ?itemLabel ?date ?venueLabel WHERE {{
  ?item wdt:P356 "{}" .
  OPTIONAL {{ ?item wdt:P577 ?date . }}
  OPTIONAL {{ ?item wdt:P1433 ?venue . }}
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "en". }}
}}
LIMIT 1"#,
        literal
    )
}

/// The label service falls back to the bare entity id (`Q42`) when there is no English label
fn real_label(label: Option<String>) -> Option<String> {
    label.filter(|l| {
        let is_entity_id = l
            .strip_prefix('Q')
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
        !is_entity_id
    })
}

#[async_trait]
impl Source for WikidataSource {
    fn id(&self) -> &str {
        "wikidata"
    }

    fn name(&self) -> &str {
        "Wikidata"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::METADATA | SourceCapabilities::LANDING_PAGE
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let mut url = url::Url::parse(&self.ctx.endpoint("sparql"))
            .map_err(|e| SourceError::Other(format!("Invalid Wikidata endpoint: {}", e)))?;
        url.query_pairs_mut().append_pair("query", &sparql_query(doi));

        let request = self
            .ctx
            .client
            .get(url.as_str())
            .header(reqwest::header::ACCEPT, SPARQL_RESULTS_JSON);
        let response: SparqlResponse = self.ctx.get_json(request, "Wikidata").await?;

        let Some(mut row) = response.results.bindings.into_iter().next() else {
            return Ok(None);
        };
        let mut take = |name: &str| row.remove(name).map(|b| b.value);

        let item = take("item");
        let title = real_label(take("itemLabel"));
        let journal = real_label(take("venueLabel"));
        let year = take("date").as_deref().and_then(year_from_str);

        let metadata = PaperMetadata::default().title(title).journal(journal).year(year);
        Ok(Some(SourceHit::with_metadata(metadata).landing(item)))
    }
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<HashMap<String, SparqlValue>>,
}

#[derive(Debug, Deserialize)]
struct SparqlValue {
    value: String,
}
