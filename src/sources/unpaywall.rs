//! Unpaywall provider.
//!
//! Looks a DOI up in the Unpaywall database of open-access locations.
//! API documentation: <https://unpaywall.org/products/api>

use async_trait::async_trait;
use serde::Deserialize;

use super::fields::{lenient_year, string_or_first};
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

/// Unpaywall provider
///
/// Every request must carry a contact email; the registry skips this
/// provider when none is configured.
#[derive(Debug, Clone)]
pub struct UnpaywallSource {
    ctx: SourceContext,
}

impl UnpaywallSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Source for UnpaywallSource {
    fn id(&self) -> &str {
        "unpaywall"
    }

    fn name(&self) -> &str {
        "Unpaywall"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FULL_TEXT | SourceCapabilities::METADATA | SourceCapabilities::LANDING_PAGE
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let email = self
            .ctx
            .contact_email
            .as_deref()
            .ok_or_else(|| SourceError::Auth("Unpaywall requires a contact email".to_string()))?;

        let request = self
            .ctx
            .client
            .get(&self.ctx.endpoint(&doi.url_encoded()))
            .query(&[("email", email)]);
        let response: UnpaywallResponse = self.ctx.get_json(request, "Unpaywall").await?;

        Ok(Some(parse_response(response)))
    }
}

fn parse_response(response: UnpaywallResponse) -> SourceHit {
    let authors = response
        .z_authors
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| Author::from_parts(a.given.as_deref(), a.family.as_deref()))
        .collect();

    let metadata = PaperMetadata::default()
        .title(response.title)
        .journal(response.journal_name)
        .year(response.year)
        .authors(authors);

    // The best location first, then every other location, in the order given
    let location = response
        .best_oa_location
        .into_iter()
        .chain(response.oa_locations)
        .find(|loc| loc.url_for_pdf.as_deref().is_some_and(|u| !u.trim().is_empty()));

    let mut hit = SourceHit::with_metadata(metadata);
    if let Some(location) = location {
        hit = hit
            .pdf(location.url_for_pdf)
            .landing(location.url_for_landing_page);
        if let Some(host_type) = location.host_type {
            hit = hit.host_type(host_type);
        }
    }
    hit
}

/// Unpaywall API response
#[derive(Debug, Deserialize)]
struct UnpaywallResponse {
    #[serde(default, deserialize_with = "string_or_first")]
    title: Option<String>,
    #[serde(default, deserialize_with = "string_or_first")]
    journal_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    year: Option<i32>,
    #[serde(default)]
    z_authors: Option<Vec<UnpaywallAuthor>>,
    #[serde(default)]
    best_oa_location: Option<OaLocation>,
    #[serde(default)]
    oa_locations: Vec<OaLocation>,
}

#[derive(Debug, Deserialize)]
struct UnpaywallAuthor {
    #[serde(default)]
    given: Option<String>,
    #[serde(default)]
    family: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OaLocation {
    #[serde(default)]
    url_for_pdf: Option<String>,
    #[serde(default)]
    url_for_landing_page: Option<String>,
    #[serde(default)]
    host_type: Option<String>,
}
