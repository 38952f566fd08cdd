//! Raw documents and paged results as returned by the content repository

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One page of a paged search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Continuation token (a complete URL for Prismic); `None` once exhausted
    #[serde(default, deserialize_with = "non_empty_token")]
    pub next_page: Option<String>,

    /// Entries in the order the service returned them
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Build a page, treating an empty token as "no further pages"
    pub fn new(results: Vec<T>, next_page: Option<String>) -> Self {
        Self {
            next_page: next_page.filter(|token| !token.is_empty()),
            results,
        }
    }

    /// Whether another page can be requested after this one
    pub fn has_next(&self) -> bool {
        self.next_page.is_some()
    }
}

/// Accepts a string, `null` or a missing field; empty strings become `None`
fn non_empty_token<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let token = Option::<String>::deserialize(deserializer)?;
    Ok(token.filter(|t| !t.is_empty()))
}

/// A document exactly as the repository returned it.
///
/// Accessors never fail: a missing or mistyped field reads as absent, so a
/// malformed document degrades into empty display values instead of an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawEntry(Value);

impl RawEntry {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Human readable identifier used in post URLs
    pub fn uid(&self) -> Option<&str> {
        non_empty_str(self.0.get("uid"))
    }

    /// Custom type of the document
    pub fn doc_type(&self) -> Option<&str> {
        non_empty_str(self.0.get("type"))
    }

    pub fn first_publication_date(&self) -> Option<DateTime<FixedOffset>> {
        non_empty_str(self.0.get("first_publication_date")).and_then(parse_publication_date)
    }

    /// A field inside the document's `data` object
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get("data").and_then(|data| data.get(name))
    }

    /// A `data` field read as display text (empty when absent)
    pub fn text(&self, name: &str) -> String {
        self.field(name).map(text_of).unwrap_or_default()
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Read a field as plain text.
///
/// Key-text fields are plain strings; rich-text fields are arrays of blocks,
/// whose `text` values are joined with a space.
pub fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(blocks) => blocks
            .iter()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(_) | Value::Null => String::new(),
    }
}

/// Parse a publication timestamp.
///
/// Prismic sends `2021-03-15T19:25:28+0000`, which is not RFC 3339, so both
/// forms are accepted.
pub fn parse_publication_date(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
        .map_err(|e| tracing::debug!("Unparseable publication date {:?}: {}", s, e))
        .ok()
}
