//! JSON shapes handed to the presentation layer.

use serde::{Deserialize, Serialize};

use super::{PaperMetadata, ResolutionTrace, ResolvedPaper};

/// Body of a successful resolution, found or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResponse {
    pub doi: String,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landing_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PaperMetadata>,

    #[serde(default)]
    pub logs: Vec<String>,
}

impl ResolutionResponse {
    pub fn new(doi: &str, paper: &ResolvedPaper, trace: &ResolutionTrace) -> Self {
        Self {
            doi: doi.to_string(),
            message: paper.message().to_string(),
            pdf_link: paper.full_text_link().map(str::to_string),
            source: paper.source().map(str::to_string),
            host_type: paper.host_type().map(str::to_string),
            landing_url: paper.landing_url().map(str::to_string),
            metadata: paper.metadata().cloned(),
            logs: trace.log_lines(),
        }
    }
}

/// Body of a non-2xx answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

impl ErrorResponse {
    pub fn new(status: u16, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status,
        }
    }
}
