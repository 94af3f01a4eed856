//! # Paper Finder
//!
//! Resolves a DOI to a legal open-access full-text link plus bibliographic
//! metadata by querying tiers of external providers.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Doi, ProviderResult, ResolvedPaper, trace)
//! - [`sources`]: Provider adapters with an extensible trait-based architecture and the registry
//! - [`resolver`]: Tiered orchestration, reconciliation and the resolution entry point
//! - [`utils`]: HTTP client, rate limiting and validation
//! - [`config`]: Configuration management
//! - [`ui`]: Terminal rendering for the CLI
//!
//! ## Example
//!
//! ```no_run
//! use paper_finder::{config::get_config, Resolver};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let resolver = Resolver::from_config(&get_config())?;
//! let resolution = resolver.handle("10.1038/s41586-020-2649-2").await?;
//! println!("{}", resolution.paper.message());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod models;
pub mod resolver;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{Doi, ResolvedPaper};
pub use resolver::{Resolution, ResolveError, Resolver};
pub use sources::{ProviderRegistry, Source};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
