//! The per-request timeline of provider attempts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use super::{ProviderResult, ProviderStatus};
use crate::sources::TierKind;

/// What happened to one provider attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttemptOutcome {
    Found,
    NotFound,
    Error,
    Timeout,
    /// Still in flight when the grace window or the budget closed
    Abandoned,
}

impl AttemptOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptOutcome::Found => "found",
            AttemptOutcome::NotFound => "not-found",
            AttemptOutcome::Error => "error",
            AttemptOutcome::Timeout => "timeout",
            AttemptOutcome::Abandoned => "abandoned",
        }
    }
}

impl From<ProviderStatus> for AttemptOutcome {
    fn from(status: ProviderStatus) -> Self {
        match status {
            ProviderStatus::Found => AttemptOutcome::Found,
            ProviderStatus::NotFound => AttemptOutcome::NotFound,
            ProviderStatus::Error => AttemptOutcome::Error,
            ProviderStatus::Timeout => AttemptOutcome::Timeout,
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub provider: String,
    pub tier: TierKind,
    pub outcome: AttemptOutcome,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub with_link: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TraceEntry {
    pub fn from_result(result: &ProviderResult, elapsed: Duration) -> Self {
        Self {
            provider: result.source.clone(),
            tier: result.tier,
            outcome: result.status.into(),
            elapsed,
            with_link: result.full_text_link.is_some(),
            message: result.message.clone(),
        }
    }

    pub fn abandoned(provider: impl Into<String>, tier: TierKind, elapsed: Duration) -> Self {
        Self {
            provider: provider.into(),
            tier,
            outcome: AttemptOutcome::Abandoned,
            elapsed,
            with_link: false,
            message: Some("result not awaited".to_string()),
        }
    }
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}) in {}ms",
            self.provider,
            self.outcome,
            self.tier,
            self.elapsed.as_millis()
        )?;
        if self.with_link {
            f.write_str(", full-text link")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

/// Append-only record of the attempts made for one request, in completion order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionTrace {
    started_at: DateTime<Utc>,
    entries: Vec<TraceEntry>,
}

impl ResolutionTrace {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of attempts that ended with the given outcome
    pub fn count(&self, outcome: AttemptOutcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }

    /// Human-readable lines, one per attempt
    pub fn log_lines(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }
}

impl Default for ResolutionTrace {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a duration as whole milliseconds
pub fn serialize_millis<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_display() {
        let result = ProviderResult::new("unpaywall", ProviderStatus::Found)
            .with_link("https://example.org/paper.pdf");
        let entry = TraceEntry::from_result(&result, Duration::from_millis(42));

        assert_eq!(
            entry.to_string(),
            "[unpaywall] found (open-access) in 42ms, full-text link"
        );
    }

    #[test]
    fn test_trace_counts_in_order() {
        let mut trace = ResolutionTrace::new();
        trace.push(TraceEntry::from_result(
            &ProviderResult::timeout("core", "timed out after 5000ms"),
            Duration::from_secs(5),
        ));
        trace.push(TraceEntry::abandoned("zenodo", TierKind::Preprint, Duration::from_millis(10)));

        assert_eq!(trace.len(), 2);
        assert_eq!(trace.count(AttemptOutcome::Timeout), 1);
        assert_eq!(trace.count(AttemptOutcome::Abandoned), 1);
        assert!(trace.log_lines()[0].starts_with("[core] timeout"));
        assert!(trace.log_lines()[1].contains("abandoned (preprint)"));
    }
}
