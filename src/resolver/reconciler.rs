//! Result Reconciler: folds partial provider answers into one [`ResolvedPaper`].
//!
//! Link selection is not re-decided here; the orchestrator's winner is
//! taken as given. Metadata is merged field by field, the first non-empty
//! value in registry order winning, so the merge does not depend on the
//! order in which answers arrived.

use crate::models::{Author, PaperMetadata, ProviderResult, ProviderStatus, ResolvedPaper};

pub const PAPER_FOUND: &str = "Paper found!";
pub const PAPER_FOUND_NO_METADATA: &str = "Paper found, but no metadata available";
pub const NO_COPY_FOUND: &str = "no open-access copy found";
pub const NO_COPY_FOUND_IN_BUDGET: &str = "no open-access copy found before the time budget ran out";

/// `Found` results in registry order: tier, then position, then id
fn in_registry_order(results: &[ProviderResult]) -> Vec<&ProviderResult> {
    let mut found: Vec<_> = results
        .iter()
        .filter(|r| r.status == ProviderStatus::Found)
        .collect();
    found.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.source.cmp(&b.source)));
    found
}

fn first_field<T>(ordered: &[&ProviderResult], field: impl Fn(&PaperMetadata) -> Option<T>) -> Option<T> {
    ordered
        .iter()
        .filter_map(|r| r.metadata.as_ref())
        .find_map(field)
}

/// Merge the metadata of every `Found` result; `None` when nothing is known
pub fn merge_metadata(results: &[ProviderResult]) -> Option<PaperMetadata> {
    let ordered = in_registry_order(results);

    let authors: Vec<Author> =
        first_field(&ordered, |m| (!m.authors.is_empty()).then(|| m.authors.clone())).unwrap_or_default();

    let merged = PaperMetadata::default()
        .title(first_field(&ordered, |m| m.title.clone()))
        .journal(first_field(&ordered, |m| m.journal.clone()))
        .year(first_field(&ordered, |m| m.year))
        .corresponding_email(first_field(&ordered, |m| m.corresponding_email.clone()))
        .authors(authors);

    (!merged.is_empty()).then_some(merged)
}

/// Build the final record for a request.
///
/// `winner` is the orchestrator's link winner, if any. `budget_exhausted`
/// only changes the wording of a negative answer.
pub fn merge(
    results: &[ProviderResult],
    winner: Option<&ProviderResult>,
    budget_exhausted: bool,
) -> ResolvedPaper {
    let metadata = merge_metadata(results);

    let message = match (winner, &metadata) {
        (Some(_), Some(_)) => PAPER_FOUND,
        (Some(_), None) => PAPER_FOUND_NO_METADATA,
        (None, _) if budget_exhausted => NO_COPY_FOUND_IN_BUDGET,
        (None, _) => NO_COPY_FOUND,
    };

    let landing_url = winner.and_then(|w| w.landing_url.clone()).or_else(|| {
        let mut candidates: Vec<_> = results.iter().filter(|r| r.landing_url.is_some()).collect();
        candidates.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.source.cmp(&b.source)));
        candidates.first().and_then(|r| r.landing_url.clone())
    });

    ResolvedPaper::new(
        metadata,
        winner.and_then(|w| w.full_text_link.clone()),
        winner.map(|w| w.source.clone()),
        winner.and_then(|w| w.host_type.clone()),
        landing_url,
        message.to_string(),
    )
}
