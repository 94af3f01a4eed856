use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use paper_finder::config::load_config;
use paper_finder::models::AttemptOutcome;
use paper_finder::resolver::{ResolveError, Resolver};
use paper_finder::sources::{ProviderRegistry, ProviderSpec};
use paper_finder::ui;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Paper Finder - resolve a DOI to a legal open-access PDF plus metadata
#[derive(Parser, Debug)]
#[command(name = "paper-finder")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve a DOI to a legal open-access full-text link plus metadata", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv, -vvv)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress everything but errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overall time budget per resolution, in seconds
    #[arg(long, global = true)]
    budget: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Plain text on a terminal, JSON otherwise
    Auto,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if ui::is_terminal() => OutputFormat::Plain,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a DOI
    #[command(alias = "r")]
    Resolve {
        /// The DOI, bare or as a doi.org URL
        doi: String,
    },

    /// List the enabled providers by tier
    Providers,

    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(cli: &Cli) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("paper_finder={}", level)));

    // Logs go to stderr so JSON on stdout stays parseable
    let json_layer = cli
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!cli.log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(budget) = cli.budget {
        config.resolver.budget_secs = budget;
    }

    match &cli.command {
        Commands::Resolve { doi } => {
            let resolver = Resolver::from_config(&config).context("Failed to build provider registry")?;
            let budget = Duration::from_secs(config.resolver.budget_secs);
            resolve(&resolver, doi, budget, cli.output.resolve()).await
        }
        Commands::Providers => {
            let registry = ProviderRegistry::from_config(&config).context("Failed to build provider registry")?;
            match cli.output.resolve() {
                OutputFormat::Json => {
                    let specs: Vec<&ProviderSpec> = registry.tiers().iter().flat_map(|t| t.specs()).collect();
                    println!("{}", serde_json::to_string_pretty(&specs)?);
                }
                _ => println!("{}", ui::providers_table(&registry)),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => {
            print!("{}", config.to_toml().context("Failed to render configuration")?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn resolve(resolver: &Resolver, doi: &str, budget: Duration, format: OutputFormat) -> Result<ExitCode> {
    match resolver.handle_within(doi, budget).await {
        Ok(resolution) => {
            let response = resolution.to_response();
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
                _ => {
                    let outcomes: Vec<AttemptOutcome> =
                        resolution.trace.entries().iter().map(|e| e.outcome).collect();
                    ui::print_resolution(&response, &outcomes);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{}", serde_json::to_string(&err.to_response())?);
            Ok(exit_code(&err))
        }
    }
}

fn exit_code(err: &ResolveError) -> ExitCode {
    match err {
        ResolveError::InvalidInput(_) => ExitCode::from(2),
        ResolveError::ResolutionFailed(_) => ExitCode::from(1),
    }
}
