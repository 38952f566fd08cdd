//! Post models projected from raw repository documents

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entry::{text_of, RawEntry};
use super::reading_time;

/// The fields of a post shown in the listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    /// Post uid, used to build its URL
    pub id: Option<String>,

    /// First publication date
    pub publication_date: Option<DateTime<FixedOffset>>,

    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl PostSummary {
    /// Project a raw document into a summary.
    ///
    /// Missing fields become empty values; this never fails.
    pub fn project(raw: &RawEntry) -> Self {
        Self {
            id: raw.uid().map(str::to_string),
            publication_date: raw.first_publication_date(),
            title: raw.text("title"),
            subtitle: raw.text("subtitle"),
            author: raw.text("author"),
        }
    }

    /// Project every entry of a page, keeping their order
    pub fn project_all(entries: &[RawEntry]) -> Vec<Self> {
        entries.iter().map(Self::project).collect()
    }
}

/// A full post as shown on its own page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub banner_url: String,
    pub author: String,
    /// Content sections in source order
    pub sections: Vec<Section>,
}

impl PostDetail {
    /// Project a raw document into a full post.
    ///
    /// Sections map one to one, empty ones included.
    pub fn project(raw: &RawEntry) -> Self {
        let banner_url = raw
            .field("banner")
            .and_then(|banner| banner.get("url"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let sections = raw
            .field("content")
            .and_then(Value::as_array)
            .map(|sections| sections.iter().map(Section::project).collect())
            .unwrap_or_default();

        Self {
            publication_date: raw.first_publication_date(),
            title: raw.text("title"),
            banner_url,
            author: raw.text("author"),
            sections,
        }
    }

    /// Estimated minutes needed to read the post
    pub fn reading_time(&self) -> u32 {
        reading_time::estimate(&self.sections)
    }
}

/// A headed group of rich-text blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub body: Vec<RichTextBlock>,
}

impl Section {
    pub fn new(heading: impl Into<String>, body: Vec<RichTextBlock>) -> Self {
        Self {
            heading: heading.into(),
            body,
        }
    }

    fn project(value: &Value) -> Self {
        let heading = value.get("heading").map(text_of).unwrap_or_default();
        let body = value
            .get("body")
            .and_then(Value::as_array)
            .map(|blocks| blocks.iter().map(RichTextBlock::from_value).collect())
            .unwrap_or_default();
        Self { heading, body }
    }
}

/// One rich-text block (paragraph, heading, list item, image...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RichTextBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub spans: Vec<Span>,

    /// Image source or embed URL
    pub url: Option<String>,
    /// Image alternative text
    pub alt: Option<String>,
    /// Embed payload (`html`, `type`, `provider_name`, `embed_url`)
    pub oembed: Option<Value>,
}

impl RichTextBlock {
    /// A block holding plain text
    pub fn new(kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// A paragraph block
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new("paragraph", text)
    }

    /// Decode a block, keeping at least its type and text when the rest is malformed
    pub fn from_value(value: &Value) -> Self {
        match serde_json::from_value::<RichTextBlock>(value.clone()) {
            Ok(block) => block,
            Err(e) => {
                tracing::warn!("Malformed rich-text block, keeping text only: {}", e);
                Self::new(
                    value.get("type").map(text_of).unwrap_or_default(),
                    value.get("text").map(text_of).unwrap_or_default(),
                )
            }
        }
    }
}

/// Formatting applied to a range of a block's text.
///
/// `start` and `end` count UTF-16 code units, as the repository does.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Option<Value>,
}
