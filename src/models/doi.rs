//! Validated DOI type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::{validate_doi, ValidationError};

/// A Digital Object Identifier that has passed shape validation.
///
/// Holding a `Doi` is proof that the string matches `10.<registrant>/<suffix>`;
/// nothing downstream re-validates. Equality is case-insensitive, matching
/// the DOI system's own semantics.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Doi(String);

impl Doi {
    /// Parse and normalize a raw DOI string
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        validate_doi(raw).map(Self)
    }

    /// The normalized DOI string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The registrant prefix, e.g. `10.1038`
    pub fn prefix(&self) -> &str {
        self.0.split_once('/').map(|(prefix, _)| prefix).unwrap_or(&self.0)
    }

    /// Everything after the first slash
    pub fn suffix(&self) -> &str {
        self.0.split_once('/').map(|(_, suffix)| suffix).unwrap_or_default()
    }

    /// Percent-encoded form for use as a single path segment or query value
    pub fn url_encoded(&self) -> String {
        urlencoding::encode(&self.0).into_owned()
    }

    /// The canonical resolver URL
    pub fn resolver_url(&self) -> String {
        format!("https://doi.org/{}", self.0)
    }
}

impl PartialEq for Doi {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl std::hash::Hash for Doi {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Doi {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Doi {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Doi> for String {
    fn from(doi: Doi) -> Self {
        doi.0
    }
}
