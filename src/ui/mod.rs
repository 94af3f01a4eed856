//! Terminal output for the CLI.
//!
//! Colored plain-text rendering of a resolution and the provider table.

use comfy_table::{Attribute, Cell, Table};
use owo_colors::OwoColorize;
use std::io::IsTerminal;

use crate::models::{AttemptOutcome, ResolutionResponse};
use crate::sources::ProviderRegistry;

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Pending,
}

/// Status icons for different outcomes.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Pending => "○",
    }
}

impl From<AttemptOutcome> for Status {
    fn from(outcome: AttemptOutcome) -> Self {
        match outcome {
            AttemptOutcome::Found => Status::Success,
            AttemptOutcome::NotFound => Status::Info,
            AttemptOutcome::Error => Status::Error,
            AttemptOutcome::Timeout => Status::Warning,
            AttemptOutcome::Abandoned => Status::Pending,
        }
    }
}

/// An icon colored for its status.
pub fn colored_icon(status: Status) -> String {
    let icon = status_icon(status);
    match status {
        Status::Success => icon.green().bold().to_string(),
        Status::Error => icon.red().bold().to_string(),
        Status::Warning => icon.yellow().bold().to_string(),
        Status::Info => icon.cyan().to_string(),
        Status::Pending => icon.white().dimmed().to_string(),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Shorten `text` to at most `max_width` characters, ending in "..."
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if text.chars().count() <= max_width {
        return text.to_string();
    }
    let keep = max_width.saturating_sub(3);
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

/// Render a resolution for a human.
///
/// `trace_outcomes` pairs each log line with its outcome so the icon can be
/// colored; when it is shorter than `response.logs` the rest print plain.
pub fn print_resolution(response: &ResolutionResponse, trace_outcomes: &[AttemptOutcome]) {
    let headline = if response.pdf_link.is_some() {
        colored_icon(Status::Success)
    } else {
        colored_icon(Status::Warning)
    };
    println!("{} {} {}", headline, response.doi.bold(), response.message);

    if let Some(link) = &response.pdf_link {
        let source = response.source.as_deref().unwrap_or("unknown");
        println!("  {} {}", "PDF:".bold(), link.blue().underline());
        println!("  {} {}", "Source:".bold(), source.green());
    }
    if let Some(landing) = &response.landing_url {
        println!("  {} {}", "Landing page:".bold(), landing);
    }

    if let Some(metadata) = &response.metadata {
        print_section("Metadata");
        if let Some(title) = &metadata.title {
            println!("  {} {}", "Title:".bold(), title);
        }
        if !metadata.authors.is_empty() {
            let names: Vec<&str> = metadata.authors.iter().map(|a| a.name.as_str()).collect();
            println!("  {} {}", "Authors:".bold(), truncate_with_ellipsis(&names.join("; "), 80));
        }
        if let Some(journal) = &metadata.journal {
            println!("  {} {}", "Journal:".bold(), journal);
        }
        if let Some(year) = metadata.year {
            println!("  {} {}", "Year:".bold(), year.yellow());
        }
        if let Some(email) = &metadata.corresponding_email {
            println!("  {} {}", "Contact:".bold(), email);
        }
    }

    if !response.logs.is_empty() {
        print_section("Trace");
        for (index, line) in response.logs.iter().enumerate() {
            match trace_outcomes.get(index) {
                Some(outcome) => println!("  {} {}", colored_icon((*outcome).into()), line),
                None => println!("  {}", line),
            }
        }
    }
}

/// Tabulate the registry in query order.
pub fn providers_table(registry: &ProviderRegistry) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec![
        "Tier",
        "Provider",
        "Name",
        "Provides",
        "Credential",
        "Timeout",
        "Base URL",
    ]);

    for tier in registry.tiers() {
        for provider in tier.providers() {
            let spec = provider.spec();
            table.add_row(vec![
                Cell::new(tier.name()),
                Cell::new(&spec.id).add_attribute(Attribute::Bold),
                Cell::new(&spec.name),
                Cell::new(provider.capabilities().describe()),
                Cell::new(spec.credential.as_str()),
                Cell::new(format!("{}ms", spec.timeout.as_millis())),
                Cell::new(truncate_with_ellipsis(&spec.base_url, 50)),
            ]);
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{MockSource, ProviderSpec, TierKind};
    use std::sync::Arc;

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("a much longer line", 10), "a much ...");
        assert_eq!(truncate_with_ellipsis("ünïcödé text", 6), "ünï...");
    }

    #[test]
    fn test_outcome_status() {
        assert_eq!(Status::from(AttemptOutcome::Found), Status::Success);
        assert_eq!(Status::from(AttemptOutcome::Timeout), Status::Warning);
        assert_eq!(status_icon(Status::from(AttemptOutcome::Error)), "✗");
    }

    #[test]
    fn test_providers_table_lists_every_provider() {
        let registry = ProviderRegistry::builder()
            .provider(
                ProviderSpec::new("alpha", TierKind::OpenAccess),
                Arc::new(MockSource::not_found("alpha")),
            )
            .provider(
                ProviderSpec::new("omega", TierKind::MetadataOnly),
                Arc::new(MockSource::not_found("omega")),
            )
            .build()
            .unwrap();

        let rendered = providers_table(&registry).to_string();
        assert!(rendered.contains("alpha"));
        assert!(rendered.contains("omega"));
        assert!(rendered.contains("open-access"));
        assert!(rendered.contains("metadata"));
        assert!(rendered.contains("full-text, metadata"));
    }
}
