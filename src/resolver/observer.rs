//! The "processed" side channel.
//!
//! The resolver emits exactly one [`ProcessedEvent`] per completed
//! resolution to an injected [`ResolutionObserver`]. Invalid input never
//! reaches the orchestrator and emits nothing.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::models::serialize_millis;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedEvent {
    pub doi: String,
    pub found_link: bool,
    /// Provider credited for the link
    pub source: Option<String>,
    /// Number of trace entries
    pub attempts: usize,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

pub trait ResolutionObserver: Send + Sync {
    fn on_processed(&self, event: &ProcessedEvent);
}

/// Writes each event to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ResolutionObserver for LogObserver {
    fn on_processed(&self, event: &ProcessedEvent) {
        tracing::info!(
            doi = %event.doi,
            found_link = event.found_link,
            source = event.source.as_deref().unwrap_or("-"),
            attempts = event.attempts,
            elapsed_ms = event.elapsed.as_millis() as u64,
            "Paper processed"
        );
    }
}

/// Counts processed papers in memory
#[derive(Debug, Default)]
pub struct StatsCollector {
    processed: AtomicU64,
    with_link: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub processed: u64,
    pub with_link: u64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            with_link: self.with_link.load(Ordering::Relaxed),
        }
    }
}

impl ResolutionObserver for StatsCollector {
    fn on_processed(&self, event: &ProcessedEvent) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if event.found_link {
            self.with_link.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(found_link: bool) -> ProcessedEvent {
        ProcessedEvent {
            doi: "10.1234/abc".to_string(),
            found_link,
            source: found_link.then(|| "unpaywall".to_string()),
            attempts: 3,
            elapsed: Duration::from_millis(120),
        }
    }

    #[test]
    fn test_stats_collector_counts() {
        let stats = StatsCollector::new();
        stats.on_processed(&event(true));
        stats.on_processed(&event(false));
        stats.on_processed(&event(true));

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                processed: 3,
                with_link: 2
            }
        );
    }

    #[test]
    fn test_event_serializes_elapsed_as_millis() {
        let json = serde_json::to_value(event(true)).unwrap();
        assert_eq!(json["elapsed"], 120);
        assert_eq!(json["source"], "unpaywall");
    }
}
