//! Core data models for DOI resolution.

mod doi;
mod paper;
mod response;
mod trace;

pub use doi::Doi;
pub use paper::{
    Author, PaperMetadata, ProviderRank, ProviderResult, ProviderStatus, ResolvedPaper,
};
pub use response::{ErrorResponse, ResolutionResponse};
pub use trace::{serialize_millis, AttemptOutcome, ResolutionTrace, TraceEntry};
