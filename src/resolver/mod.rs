//! The resolution engine.
//!
//! - [`Orchestrator`]: walks the registry tier by tier, fanning out within a
//!   tier and short-circuiting once a link is found
//! - [`reconciler`]: merges partial metadata and packages the winning link
//! - [`Resolver`]: the entry point; validates input, runs the orchestrator,
//!   reconciles, and notifies the [`ResolutionObserver`]

mod facade;
mod observer;
mod orchestrator;
pub mod reconciler;

pub use facade::{Resolution, ResolutionOutcome, Resolver};
pub use observer::{LogObserver, ProcessedEvent, ResolutionObserver, StatsCollector, StatsSnapshot};
pub use orchestrator::{select_winner, Orchestration, Orchestrator, OrchestratorConfig};

use http::StatusCode;

use crate::models::ErrorResponse;
use crate::utils::ValidationError;

/// Hard failures of a resolution request.
///
/// Provider errors never appear here; they are absorbed into the trace.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The input is not a DOI; no provider was contacted
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// Every provider that was asked failed outright
    #[error("Resolution failed: {0}")]
    ResolutionFailed(String),
}

impl ResolveError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResolveError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ResolveError::ResolutionFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.status_code().as_u16(), self.to_string())
    }
}
