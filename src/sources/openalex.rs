//! OpenAlex metadata provider.

use async_trait::async_trait;
use serde::Deserialize;

use super::fields::lenient_year;
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceContext, SourceError, SourceHit};

/// OpenAlex metadata source
///
/// Looks works up with the `doi:` external-id form of the single-work route.
#[derive(Debug, Clone)]
pub struct OpenAlexSource {
    ctx: SourceContext,
}

impl OpenAlexSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    fn parse_work(work: OAWork) -> SourceHit {
        let authors = work
            .authorships
            .into_iter()
            .filter_map(|a| {
                let affiliation = a.institutions.into_iter().find_map(|i| i.display_name);
                a.author
                    .display_name
                    .map(|name| Author::new(name).with_affiliation(affiliation))
            })
            .collect();

        let location = work.primary_location;
        let journal = location
            .as_ref()
            .and_then(|l| l.source.as_ref())
            .and_then(|s| s.display_name.clone());
        let landing = location.and_then(|l| l.landing_page_url);

        let metadata = PaperMetadata::default()
            .title(work.title.or(work.display_name))
            .journal(journal)
            .year(work.publication_year)
            .authors(authors);

        SourceHit::with_metadata(metadata).landing(landing)
    }
}

#[async_trait]
impl Source for OpenAlexSource {
    fn id(&self) -> &str {
        "openalex"
    }

    fn name(&self) -> &str {
        "OpenAlex"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::METADATA | SourceCapabilities::LANDING_PAGE
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let url = self.ctx.endpoint(&format!("works/doi:{}", doi));
        let mut request = self.ctx.client.get(&url);
        // Identifying a contact moves requests into the polite pool
        if let Some(email) = &self.ctx.contact_email {
            request = request.query(&[("mailto", email.as_str())]);
        }

        let work: OAWork = self.ctx.get_json(request, "OpenAlex").await?;
        Ok(Some(Self::parse_work(work)))
    }
}

// ===== OpenAlex API Types =====

#[derive(Debug, Deserialize)]
struct OAWork {
    title: Option<String>,
    display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    publication_year: Option<i32>,
    #[serde(default)]
    authorships: Vec<OAAuthorship>,
    primary_location: Option<OALocation>,
}

#[derive(Debug, Deserialize)]
struct OAAuthorship {
    author: OAAuthor,
    #[serde(default)]
    institutions: Vec<OAInstitution>,
}

#[derive(Debug, Deserialize)]
struct OAAuthor {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAInstitution {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OALocation {
    landing_page_url: Option<String>,
    source: Option<OASource>,
}

#[derive(Debug, Deserialize)]
struct OASource {
    display_name: Option<String>,
}
