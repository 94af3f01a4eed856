//! Tiered fan-out over the provider registry.

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use super::reconciler;
use crate::config::ResolverConfig;
use crate::models::{Doi, ProviderResult, ResolutionTrace, TraceEntry};
use crate::sources::{ProviderRegistry, Tier};

/// Timing knobs for one resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Overall wall-clock budget per request
    pub budget: Duration,
    /// How long the rest of a tier may keep answering after the first link
    pub grace_period: Duration,
    /// Query the metadata-only tiers after an early link when no title is known
    pub enrich_metadata: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&ResolverConfig::default())
    }
}

impl From<&ResolverConfig> for OrchestratorConfig {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            budget: config.budget(),
            grace_period: config.grace_period(),
            enrich_metadata: config.enrich_metadata,
        }
    }
}

/// Everything the orchestrator gathered for one DOI
#[derive(Debug, Clone)]
pub struct Orchestration {
    /// Completed provider results, in completion order
    pub results: Vec<ProviderResult>,
    /// Index into `results` of the link winner
    pub winner: Option<usize>,
    pub trace: ResolutionTrace,
    /// The overall budget ran out before the walk finished
    pub budget_exhausted: bool,
}

impl Orchestration {
    pub fn winner(&self) -> Option<&ProviderResult> {
        self.winner.and_then(|i| self.results.get(i))
    }
}

/// Pick the link winner among completed results.
///
/// Only results that offer a link compete. Lower tier rank wins, then richer
/// metadata, then earlier completion (position in `results`).
pub fn select_winner(results: &[ProviderResult]) -> Option<usize> {
    results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.offers_link())
        .min_by_key(|(index, r)| (r.rank.tier, Reverse(r.richness()), *index))
        .map(|(index, _)| index)
}

/// Mutable state of one in-flight resolution
struct Run {
    doi: Arc<Doi>,
    deadline: Instant,
    results: Vec<ProviderResult>,
    trace: ResolutionTrace,
    budget_exhausted: bool,
}

impl Run {
    fn has_time_left(&mut self) -> bool {
        if Instant::now() >= self.deadline {
            self.budget_exhausted = true;
        }
        !self.budget_exhausted
    }
}

/// `now + span`, saturating instead of overflowing on absurd configuration
fn after(span: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(span)
        .unwrap_or_else(|| now + Duration::from_secs(365 * 24 * 60 * 60))
}

/// Drives the registry's tiers for one DOI at a time.
///
/// Cheap to clone; the registry is shared read-only.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(registry: Arc<ProviderRegistry>, config: OrchestratorConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Resolve within the configured budget
    pub async fn resolve(&self, doi: &Doi) -> Orchestration {
        self.resolve_within(doi, self.config.budget).await
    }

    /// Walk the tiers until a link is found, the tiers run out, or `budget` elapses.
    pub async fn resolve_within(&self, doi: &Doi, budget: Duration) -> Orchestration {
        let mut run = Run {
            doi: Arc::new(doi.clone()),
            deadline: after(budget),
            results: Vec::new(),
            trace: ResolutionTrace::new(),
            budget_exhausted: false,
        };

        let tiers = self.registry.tiers();
        let mut visited = vec![false; tiers.len()];

        for (index, tier) in tiers.iter().enumerate() {
            if !run.has_time_left() {
                break;
            }
            visited[index] = true;
            if self.run_tier(tier, &mut run, true).await {
                debug!(doi = %doi, tier = %tier.kind(), "Link found, skipping remaining tiers");
                break;
            }
            if run.budget_exhausted {
                break;
            }
        }

        let winner = select_winner(&run.results);
        if winner.is_some() && self.config.enrich_metadata && !run.budget_exhausted {
            let untitled = reconciler::merge_metadata(&run.results)
                .map_or(true, |m| m.title.is_none());
            if untitled {
                self.enrich(tiers, &visited, &mut run).await;
            }
        }

        if run.budget_exhausted {
            warn!(doi = %doi, budget_ms = budget.as_millis() as u64, "Resolution budget exhausted");
        }

        Orchestration {
            // Enrichment tiers never offer links, so the winner index is stable
            winner,
            results: run.results,
            trace: run.trace,
            budget_exhausted: run.budget_exhausted,
        }
    }

    /// Issue the metadata-only tiers the walk did not reach, without short-circuit.
    async fn enrich(&self, tiers: &[Tier], visited: &[bool], run: &mut Run) {
        let pending = tiers
            .iter()
            .zip(visited)
            .filter(|(tier, seen)| !**seen && tier.kind().is_metadata_only())
            .map(|(tier, _)| tier);

        for tier in pending {
            if !run.has_time_left() {
                break;
            }
            debug!(doi = %run.doi, tier = %tier.kind(), "Enriching metadata");
            self.run_tier(tier, run, false).await;
        }
    }

    /// Fan out over one tier and collect answers in completion order.
    ///
    /// With `short_circuit`, the first link-bearing answer narrows the
    /// cut-off to the grace window. Calls still in flight at the cut-off are
    /// aborted and recorded as abandoned. Returns whether a link was found.
    async fn run_tier(&self, tier: &Tier, run: &mut Run, short_circuit: bool) -> bool {
        let providers = tier.providers();
        let tier_started = Instant::now();
        let (tx, mut rx) = mpsc::channel(providers.len().max(1));

        let handles: Vec<_> = providers
            .iter()
            .enumerate()
            .map(|(slot, provider)| {
                let provider = Arc::clone(provider);
                let doi = Arc::clone(&run.doi);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let started = Instant::now();
                    let result = provider.resolve(&doi).await;
                    // The receiver is gone once the tier was cut off
                    let _ = tx.send((slot, result, started.elapsed())).await;
                })
            })
            .collect();
        drop(tx);

        let mut pending = vec![true; providers.len()];
        let mut cutoff = run.deadline;
        let mut found_link = false;

        loop {
            match timeout_at(cutoff, rx.recv()).await {
                Ok(Some((slot, result, elapsed))) => {
                    pending[slot] = false;
                    run.trace.push(TraceEntry::from_result(&result, elapsed));
                    if short_circuit && !found_link && result.offers_link() {
                        found_link = true;
                        cutoff = cutoff.min(after(self.config.grace_period));
                        debug!(provider = %result.source, "First link in tier, grace window opened");
                    }
                    run.results.push(result);
                }
                Ok(None) => break,
                Err(_) => {
                    if cutoff >= run.deadline {
                        run.budget_exhausted = true;
                    }
                    break;
                }
            }
        }

        for ((handle, provider), still_pending) in handles.into_iter().zip(providers).zip(pending) {
            if still_pending {
                handle.abort();
                run.trace.push(TraceEntry::abandoned(
                    provider.id(),
                    tier.kind(),
                    tier_started.elapsed(),
                ));
            }
        }

        found_link
    }
}
