//! Google Books provider.
//!
//! Requires an API key. Calls are capped by a daily quota; once it is spent
//! the source answers "not found" immediately instead of waiting for the
//! allowance to replenish.

use async_trait::async_trait;
use governor::DefaultDirectRateLimiter;
use serde::Deserialize;
use std::sync::Arc;

use super::fields::{lenient_year, string_list};
use crate::models::{Author, Doi, PaperMetadata};
use crate::sources::{Source, SourceContext, SourceError, SourceHit};
use crate::utils::daily_quota;

/// Requests allowed per day with a standard key
const DAILY_QUERY_LIMIT: u32 = 1000;

#[derive(Clone)]
pub struct GoogleBooksSource {
    ctx: SourceContext,
    quota: Option<Arc<DefaultDirectRateLimiter>>,
}

impl std::fmt::Debug for GoogleBooksSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleBooksSource")
            .field("ctx", &self.ctx)
            .field("quota", &self.quota.is_some())
            .finish()
    }
}

impl GoogleBooksSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self::with_daily_limit(ctx, DAILY_QUERY_LIMIT)
    }

    pub fn with_daily_limit(ctx: SourceContext, per_day: u32) -> Self {
        Self {
            ctx,
            quota: daily_quota(per_day),
        }
    }

    fn quota_available(&self) -> bool {
        self.quota.as_ref().map_or(true, |q| q.check().is_ok())
    }
}

#[async_trait]
impl Source for GoogleBooksSource {
    fn id(&self) -> &str {
        "google_books"
    }

    fn name(&self) -> &str {
        "Google Books"
    }

    async fn lookup(&self, doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        let key = self
            .ctx
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::Auth("Google Books requires an API key".to_string()))?;

        if !self.quota_available() {
            tracing::debug!("Google Books daily quota exhausted");
            return Err(SourceError::NotFound("daily quota reached".to_string()));
        }

        let query = format!("doi:{}", doi);
        let request = self
            .ctx
            .client
            .get(&self.ctx.endpoint("volumes"))
            .query(&[("q", query.as_str()), ("key", key)]);
        let response: VolumesResponse = self.ctx.get_json(request, "Google Books").await?;

        let Some(info) = response.items.into_iter().next().map(|v| v.volume_info) else {
            return Ok(None);
        };

        let metadata = PaperMetadata::default()
            .title(info.title)
            .journal(info.publisher)
            .year(info.published_date)
            .authors(info.authors.into_iter().map(Author::new).collect());

        Ok(Some(SourceHit::with_metadata(metadata).landing(info.info_link)))
    }
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    authors: Vec<String>,
    publisher: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    published_date: Option<i32>,
    info_link: Option<String>,
}
