//! Input validation for DOIs and provider-supplied URLs.
//!
//! Every DOI is checked here before any provider is contacted, and every
//! link a provider hands back is checked before it can reach a caller.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Validation error types
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Invalid DOI format: {0}")]
    InvalidDoi(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL contains potentially dangerous characters")]
    DangerousUrl,
}

/// Prefixes users commonly paste in front of a bare DOI.
const DOI_URL_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi.org/",
    "doi:",
];

fn doi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^10\.\d{4,9}/\S+$").expect("DOI pattern is valid"))
}

/// Validate and normalize a DOI
///
/// DOIs have the format "10.xxxx/xxxxxx" where xxxx is a registrant code
/// and xxxxxx is an item ID. The registrant prefix is case-folded; the
/// suffix keeps the caller's casing.
pub fn validate_doi(doi: &str) -> Result<String, ValidationError> {
    let mut doi = doi.trim();

    if doi.is_empty() {
        return Err(ValidationError::InvalidDoi("empty DOI".to_string()));
    }

    // Remove any URL prefix if present first
    for prefix in DOI_URL_PREFIXES {
        let matches = doi
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if matches {
            doi = doi[prefix.len()..].trim_start();
            break;
        }
    }

    // DOI must start with "10."
    if !doi.starts_with("10.") {
        return Err(ValidationError::InvalidDoi(
            "DOI must start with '10.'".to_string(),
        ));
    }

    let Some((prefix, suffix)) = doi.split_once('/') else {
        return Err(ValidationError::InvalidDoi(
            "DOI must contain a slash".to_string(),
        ));
    };

    let normalized = format!("{}/{}", prefix.to_lowercase(), suffix);

    if !doi_pattern().is_match(&normalized) {
        return Err(ValidationError::InvalidDoi(format!(
            "'{}' is not of the form 10.<registrant>/<suffix>",
            normalized
        )));
    }

    // Check for path traversal in DOI (shouldn't happen but be safe)
    if suffix.split('/').any(|segment| segment == "..") {
        return Err(ValidationError::InvalidDoi(
            "path traversal detected".to_string(),
        ));
    }

    Ok(normalized)
}

/// Validate a link returned by a provider
///
/// Only absolute HTTP and HTTPS URLs are accepted.
pub fn validate_url(url: &str) -> Result<String, ValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(ValidationError::InvalidUrl("empty URL".to_string()));
    }

    if url.contains('\0') || url.contains('\n') || url.contains('\r') {
        return Err(ValidationError::DangerousUrl);
    }

    let parsed = url::Url::parse(url).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ValidationError::InvalidUrl(format!(
                "invalid scheme: {}",
                other
            )))
        }
    }

    if parsed.host_str().is_none() {
        return Err(ValidationError::InvalidUrl("missing host".to_string()));
    }

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_doi_valid() {
        assert!(validate_doi("10.1234/abc123").is_ok());
        assert!(validate_doi("10.1038/s41586-020-2649-2").is_ok());
        assert_eq!(
            validate_doi("doi:10.1234/abc123").unwrap(),
            "10.1234/abc123"
        );
        assert_eq!(
            validate_doi("https://doi.org/10.1234/abc123").unwrap(),
            "10.1234/abc123"
        );
        assert_eq!(
            validate_doi("  HTTPS://DX.DOI.ORG/10.1234/abc123 ").unwrap(),
            "10.1234/abc123"
        );
    }

    #[test]
    fn test_validate_doi_keeps_suffix_case() {
        assert_eq!(
            validate_doi("10.48550/arXiv.2301.12345").unwrap(),
            "10.48550/arXiv.2301.12345"
        );
    }

    #[test]
    fn test_validate_doi_invalid() {
        assert!(validate_doi("").is_err());
        assert!(validate_doi("   ").is_err());
        assert!(validate_doi("not-a-doi").is_err());
        assert!(validate_doi("10.1234").is_err()); // No slash
        assert!(validate_doi("9.1234/abc").is_err()); // Doesn't start with 10
        assert!(validate_doi("10.12/abc").is_err()); // Registrant too short
        assert!(validate_doi("10.1234/").is_err()); // Empty suffix
        assert!(validate_doi("10.1234/has space").is_err());
        assert!(validate_doi("10.1234/../abc").is_err()); // Path traversal
    }

    #[test]
    fn test_validate_url_valid() {
        assert!(validate_url("https://arxiv.org/pdf/2301.12345").is_ok());
        assert!(validate_url("http://europepmc.org/articles/PMC1/pdf").is_ok());
    }

    #[test]
    fn test_validate_url_invalid() {
        assert!(validate_url("").is_err());
        assert!(validate_url("ftp://example.com/paper.pdf").is_err());
        assert!(validate_url("javascript:alert(1)").is_err());
        assert!(validate_url("/relative/paper.pdf").is_err());
        assert_eq!(
            validate_url("https://example.com/a\nb"),
            Err(ValidationError::DangerousUrl)
        );
    }
}
