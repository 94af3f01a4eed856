//! Lenient field decoders for provider responses.
//!
//! Providers disagree on shapes (a title may be a string or a one-element
//! array, a year a number or a date string). These helpers accept the
//! plausible shapes and turn anything else into an absent value instead of
//! failing the whole response.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A string, or the first non-blank string of an array
pub fn string_or_first<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(first_string))
}

/// A string or an array of strings, blanks dropped
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(other) => scalar_string(&other).into_iter().collect(),
        None => Vec::new(),
    })
}

/// A year given as a number, a numeric string, or a date string
pub fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().and_then(|y| i32::try_from(y).ok()).filter(|y| plausible_year(*y)),
        Some(Value::String(s)) => year_from_str(&s),
        Some(Value::Array(items)) => items.first().and_then(|v| match v {
            Value::String(s) => year_from_str(s),
            Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()).filter(|y| plausible_year(*y)),
            _ => None,
        }),
        _ => None,
    })
}

/// Extract a leading four-digit year from strings like `2020`, `2020-09-16` or `2020 Sep 16`
pub fn year_from_str(value: &str) -> Option<i32> {
    let digits: String = value.trim().chars().take_while(char::is_ascii_digit).collect();
    if digits.len() != 4 {
        return None;
    }
    digits.parse().ok().filter(|y| plausible_year(*y))
}

fn plausible_year(year: i32) -> bool {
    (1000..=9999).contains(&year)
}

fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(scalar_string),
        other => scalar_string(other),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
