//! Utility modules supporting DOI resolution.
//!
//! - [`HttpClient`]: shared HTTP client with a polite-pool user agent and a PDF probe
//! - [`limiter_for_rate`] / [`daily_quota`]: per-provider throttling
//! - [`validate_doi`] / [`validate_url`]: input and link validation
//!
//! # Validation
//!
//! ```rust
//! use paper_finder::utils::validate_doi;
//!
//! assert_eq!(validate_doi("doi:10.1038/NATURE12373").unwrap(), "10.1038/NATURE12373");
//! assert!(validate_doi("not-a-doi").is_err());
//! ```

mod http;
mod rate_limit;
mod validate;

pub use http::HttpClient;
pub use rate_limit::{daily_quota, limiter_for_rate};
pub use validate::{validate_doi, validate_url, ValidationError};
