//! Dryad data repository provider.
//!
//! Dryad only mints DOIs under its own prefix; anything else is answered
//! without a request.

use async_trait::async_trait;
use serde::Deserialize;

use super::fields::year_from_str;
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceContext, SourceError, SourceHit};

const DRYAD_DOI_PREFIX: &str = "10.5061";

#[derive(Debug, Clone)]
pub struct DryadSource {
    ctx: SourceContext,
}

impl DryadSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Source for DryadSource {
    fn id(&self) -> &str {
        "dryad"
    }

    fn name(&self) -> &str {
        "Dryad"
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        if doi.prefix() != DRYAD_DOI_PREFIX {
            return Err(SourceError::NotFound("not a Dryad DOI".to_string()));
        }

        let id = urlencoding::encode(&format!("doi:{}", doi)).into_owned();
        let request = self.ctx.client.get(&self.ctx.endpoint(&format!("datasets/{}", id)));
        let dataset: DryadDataset = self.ctx.get_json(request, "Dryad").await?;

        let corresponding_email = dataset
            .authors
            .iter()
            .find_map(|a| a.email.clone().filter(|e| e.contains('@')));
        let authors = dataset
            .authors
            .into_iter()
            .filter_map(|a| {
                Author::from_parts(a.first_name.as_deref(), a.last_name.as_deref())
                    .map(|author| author.with_affiliation(a.affiliation))
            })
            .collect();

        let metadata = PaperMetadata::default()
            .title(dataset.title)
            .year(dataset.publication_date.as_deref().and_then(year_from_str))
            .authors(authors)
            .corresponding_email(corresponding_email);

        let landing = format!("https://datadryad.org/stash/dataset/doi:{}", doi);
        Ok(Some(SourceHit::with_metadata(metadata).landing(Some(landing))))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DryadDataset {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<DryadAuthor>,
    publication_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DryadAuthor {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    affiliation: Option<String>,
}
