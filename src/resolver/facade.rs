//! Resolution Facade: the single entry point for callers.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::info;

use super::observer::{LogObserver, ProcessedEvent, ResolutionObserver};
use super::orchestrator::{Orchestration, Orchestrator, OrchestratorConfig};
use super::{reconciler, ResolveError};
use crate::config::Config;
use crate::models::{AttemptOutcome, Doi, ResolutionResponse, ResolutionTrace, ResolvedPaper};
use crate::sources::{ProviderRegistry, RegistryError};

/// How a completed resolution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionOutcome {
    LinkFound,
    /// Every tier was asked; none offered a link
    NoCopyFound,
    /// The budget ran out first; the paper carries whatever had arrived
    BudgetExhausted,
}

/// A completed resolution: the reconciled paper plus its trace
#[derive(Debug, Clone)]
pub struct Resolution {
    pub doi: Doi,
    pub paper: ResolvedPaper,
    pub trace: ResolutionTrace,
    pub outcome: ResolutionOutcome,
    pub elapsed: Duration,
}

impl Resolution {
    /// The JSON shape handed to the presentation layer
    pub fn to_response(&self) -> ResolutionResponse {
        ResolutionResponse::new(self.doi.as_str(), &self.paper, &self.trace)
    }
}

/// Turns raw user input into a [`Resolution`].
///
/// Holds no per-request state; one instance serves concurrent requests.
#[derive(Clone)]
pub struct Resolver {
    orchestrator: Orchestrator,
    observer: Arc<dyn ResolutionObserver>,
}

impl Resolver {
    pub fn new(registry: ProviderRegistry, config: OrchestratorConfig) -> Self {
        Self {
            orchestrator: Orchestrator::new(Arc::new(registry), config),
            observer: Arc::new(LogObserver),
        }
    }

    /// Build the registry from configuration and wrap it
    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        let registry = ProviderRegistry::from_config(config)?;
        Ok(Self::new(registry, OrchestratorConfig::from(&config.resolver)))
    }

    pub fn with_observer(mut self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        self.orchestrator.registry()
    }

    /// Resolve within the configured budget
    pub async fn handle(&self, raw: &str) -> Result<Resolution, ResolveError> {
        self.handle_within(raw, self.orchestrator.config().budget).await
    }

    /// Resolve one raw DOI string within `budget`.
    ///
    /// Malformed input fails before any provider is contacted. "Nothing
    /// found" is a successful resolution; only a run in which every provider
    /// failed outright is reported as [`ResolveError::ResolutionFailed`].
    pub async fn handle_within(&self, raw: &str, budget: Duration) -> Result<Resolution, ResolveError> {
        let doi = Doi::parse(raw)?;
        let started = Instant::now();

        let orchestration = self.orchestrator.resolve_within(&doi, budget).await;
        let elapsed = started.elapsed();
        let failure = total_failure(&orchestration);

        let Orchestration {
            results,
            winner,
            trace,
            budget_exhausted,
        } = orchestration;
        let winning = winner.and_then(|i| results.get(i));
        let paper = reconciler::merge(&results, winning, budget_exhausted);

        self.observer.on_processed(&ProcessedEvent {
            doi: doi.to_string(),
            found_link: paper.has_link(),
            source: paper.source().map(str::to_string),
            attempts: trace.len(),
            elapsed,
        });

        if let Some(reason) = failure {
            return Err(ResolveError::ResolutionFailed(reason));
        }

        let outcome = if paper.has_link() {
            ResolutionOutcome::LinkFound
        } else if budget_exhausted {
            ResolutionOutcome::BudgetExhausted
        } else {
            ResolutionOutcome::NoCopyFound
        };

        info!(
            doi = %doi,
            outcome = ?outcome,
            source = paper.source().unwrap_or("-"),
            attempts = trace.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Resolution finished"
        );

        Ok(Resolution {
            doi,
            paper,
            trace,
            outcome,
            elapsed,
        })
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

/// Every attempt errored or timed out, within budget: nobody could answer
fn total_failure(orchestration: &Orchestration) -> Option<String> {
    let trace = &orchestration.trace;
    if orchestration.budget_exhausted || trace.is_empty() {
        return None;
    }
    let errors = trace.count(AttemptOutcome::Error);
    let timeouts = trace.count(AttemptOutcome::Timeout);
    (errors + timeouts == trace.len()).then(|| {
        format!(
            "no provider answered ({} errors, {} timeouts)",
            errors, timeouts
        )
    })
}
