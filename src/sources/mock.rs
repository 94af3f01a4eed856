//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::models::{Doi, PaperMetadata};
use crate::sources::{Source, SourceCapabilities, SourceError, SourceHit};

#[derive(Debug, Clone)]
enum MockOutcome {
    Hit(SourceHit),
    NotFound,
    Fail(String),
}

/// A mock source that answers every DOI the same way.
///
/// Counts its calls so tests can assert how many outbound requests a
/// resolution issued.
#[derive(Debug)]
pub struct MockSource {
    id: String,
    outcome: MockOutcome,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSource {
    fn with_outcome(id: impl Into<String>, outcome: MockOutcome) -> Self {
        Self {
            id: id.into(),
            outcome,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A source that knows the DOI
    pub fn with_hit(id: impl Into<String>, hit: SourceHit) -> Self {
        Self::with_outcome(id, MockOutcome::Hit(hit))
    }

    /// A source that returns a PDF link and the given metadata
    pub fn with_link(id: impl Into<String>, link: impl Into<String>, metadata: PaperMetadata) -> Self {
        Self::with_hit(id, SourceHit::with_pdf(link).metadata(metadata))
    }

    /// A source that only knows metadata
    pub fn with_metadata(id: impl Into<String>, metadata: PaperMetadata) -> Self {
        Self::with_hit(id, SourceHit::with_metadata(metadata))
    }

    /// A source that never knows the DOI
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::with_outcome(id, MockOutcome::NotFound)
    }

    /// A source whose every call fails
    pub fn failing(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_outcome(id, MockOutcome::Fail(message.into()))
    }

    /// Sleep before answering
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of lookups issued so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FULL_TEXT | SourceCapabilities::METADATA
    }

    async fn lookup(&self, _doi: &Doi) -> Result<Option<SourceHit>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.outcome {
            MockOutcome::Hit(hit) => Ok(Some(hit.clone())),
            MockOutcome::NotFound => Ok(None),
            MockOutcome::Fail(message) => Err(SourceError::Api(message.clone())),
        }
    }
}

/// Helper to build a complete metadata record for tests.
pub fn make_metadata(title: &str, journal: &str, year: i32) -> PaperMetadata {
    PaperMetadata::default()
        .title(Some(title.to_string()))
        .journal(Some(journal.to_string()))
        .year(Some(year))
}
