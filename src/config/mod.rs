//! Configuration management.
//!
//! Settings come from, in increasing precedence: built-in defaults (which
//! honour the legacy `UNPAYWALL_EMAIL`, `CORE_API_KEY`, `GOOGLE_BOOKS_API_KEY`,
//! `SEMANTIC_SCHOLAR_API_KEY` and `BASE_API_ENABLED` variables), an optional
//! TOML file, and `PAPER_FINDER_*` environment variables using `__` as the
//! section separator.
//!
//! # Configuration File Format
//!
//! ```toml
//! [contact]
//! email = "you@example.org"
//!
//! [resolver]
//! budget_secs = 20
//! grace_period_ms = 1000
//! provider_timeout_secs = 5
//! enrich_metadata = true
//!
//! [api_keys]
//! core = "your-core-api-key"
//! google_books = "your-google-key"
//!
//! [sources]
//! enabled_sources = "unpaywall,arxiv,crossref"
//! disabled_sources = ""
//!
//! [[providers]]
//! id = "semantic_scholar"
//! requests_per_second = 0.5
//!
//! [[providers]]
//! id = "base"
//! enabled = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "PAPER_FINDER";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Contact details sent to polite-pool providers
    #[serde(default)]
    pub contact: ContactConfig,

    /// Timing of a resolution
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Which providers take part
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Per-provider overrides
    #[serde(default)]
    pub providers: Vec<ProviderOverride>,
}

impl Config {
    /// Find the override entry for a provider; ids match case-insensitively
    pub fn provider(&self, id: &str) -> Option<&ProviderOverride> {
        self.providers.iter().find(|p| p.id.trim().eq_ignore_ascii_case(id))
    }

    /// Look an API key up by provider id
    pub fn api_key(&self, id: &str) -> Option<&str> {
        let key = match id {
            "core" => self.api_keys.core.as_deref(),
            "google_books" => self.api_keys.google_books.as_deref(),
            "semantic_scholar" => self.api_keys.semantic_scholar.as_deref(),
            _ => None,
        };
        key.filter(|k| !k.trim().is_empty())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Contact details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactConfig {
    /// Email announced in the user agent and required by Unpaywall
    #[serde(default = "default_contact_email")]
    pub email: Option<String>,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            email: default_contact_email(),
        }
    }
}

fn default_contact_email() -> Option<String> {
    env_var("UNPAYWALL_EMAIL")
}

/// Resolution timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Overall deadline for one DOI, in seconds
    #[serde(default = "default_budget_secs")]
    pub budget_secs: u64,

    /// How long to wait for the rest of a tier once a link is found
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Default per-call timeout, in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Query metadata-only providers when the winner lacks a title
    #[serde(default = "default_true")]
    pub enrich_metadata: bool,
}

impl ResolverConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_secs(self.budget_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            budget_secs: default_budget_secs(),
            grace_period_ms: default_grace_period_ms(),
            provider_timeout_secs: default_provider_timeout_secs(),
            enrich_metadata: true,
        }
    }
}

fn default_budget_secs() -> u64 {
    20
}

fn default_grace_period_ms() -> u64 {
    1000
}

fn default_provider_timeout_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

/// API keys for external services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeys {
    /// CORE API key (required by the `core` provider)
    #[serde(default = "default_core_key")]
    pub core: Option<String>,

    /// Google Books API key (required by the `google_books` provider)
    #[serde(default = "default_google_books_key")]
    pub google_books: Option<String>,

    /// Semantic Scholar API key (optional, for higher rate limits)
    #[serde(default = "default_semantic_scholar_key")]
    pub semantic_scholar: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            core: default_core_key(),
            google_books: default_google_books_key(),
            semantic_scholar: default_semantic_scholar_key(),
        }
    }
}

fn default_core_key() -> Option<String> {
    env_var("CORE_API_KEY")
}

fn default_google_books_key() -> Option<String> {
    env_var("GOOGLE_BOOKS_API_KEY")
}

fn default_semantic_scholar_key() -> Option<String> {
    env_var("SEMANTIC_SCHOLAR_API_KEY")
}

/// Provider selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Comma-separated allow-list; when set only these providers run
    #[serde(default)]
    pub enabled_sources: Option<String>,

    /// Comma-separated deny-list
    #[serde(default)]
    pub disabled_sources: Option<String>,
}

impl SourcesConfig {
    pub fn enabled(&self) -> Option<Vec<String>> {
        self.enabled_sources.as_deref().map(split_ids).filter(|ids| !ids.is_empty())
    }

    pub fn disabled(&self) -> Vec<String> {
        self.disabled_sources.as_deref().map(split_ids).unwrap_or_default()
    }
}

fn split_ids(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Settings for one provider, overriding its catalog defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderOverride {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_second: Option<f32>,

    /// Force the provider on or off regardless of its default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(name: &str) -> bool {
    env_var(name).is_some_and(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// Default location of the configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("paper-finder").join("config.toml"))
}

/// Find a configuration file: `./paper-finder.toml`, then the platform config dir
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("paper-finder.toml");
    if local.is_file() {
        return Some(local);
    }
    default_config_path().filter(|p| p.is_file())
}

/// Load configuration from an optional file plus the environment.
///
/// An explicit `path` must exist; otherwise [`find_config_file`] is consulted
/// and a missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();

    match path {
        Some(path) => {
            builder = builder.add_source(config::File::from(path));
        }
        None => {
            if let Some(found) = find_config_file() {
                tracing::debug!(path = %found.display(), "Using config file");
                builder = builder.add_source(config::File::from(found).required(false));
            }
        }
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let mut config: Config = settings.try_deserialize()?;
    apply_legacy_flags(&mut config);
    Ok(config)
}

/// Get the configuration from defaults and legacy environment variables only
pub fn get_config() -> Config {
    let mut config = Config::default();
    apply_legacy_flags(&mut config);
    config
}

fn apply_legacy_flags(config: &mut Config) {
    if env_flag("BASE_API_ENABLED") && config.provider("base").is_none() {
        config.providers.push(ProviderOverride {
            id: "base".to_string(),
            enabled: Some(true),
            ..ProviderOverride::default()
        });
    }
}
