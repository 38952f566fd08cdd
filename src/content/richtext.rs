//! Rich-text rendering
//!
//! Turns the repository's structured text blocks into HTML. Text is escaped;
//! embed payloads come from the repository and are inserted as-is.

use serde_json::Value;

use super::post::{RichTextBlock, Span};
use crate::helpers::{html_escape, Helpers};

/// Renders rich-text blocks to HTML
pub struct RichTextRenderer<'a> {
    helpers: &'a Helpers,
}

impl<'a> RichTextRenderer<'a> {
    /// Create a renderer that resolves document links through `helpers`
    pub fn new(helpers: &'a Helpers) -> Self {
        Self { helpers }
    }

    /// Render a sequence of blocks; consecutive list items share one list
    pub fn render(&self, blocks: &[RichTextBlock]) -> String {
        let mut html = String::new();
        let mut open_list: Option<&'static str> = None;

        for block in blocks {
            let list = match block.kind.as_str() {
                "list-item" => Some("ul"),
                "o-list-item" => Some("ol"),
                _ => None,
            };

            if open_list != list {
                if let Some(tag) = open_list {
                    html.push_str(&format!("</{}>", tag));
                }
                if let Some(tag) = list {
                    html.push_str(&format!("<{}>", tag));
                }
                open_list = list;
            }

            html.push_str(&self.render_block(block));
        }

        if let Some(tag) = open_list {
            html.push_str(&format!("</{}>", tag));
        }

        html
    }

    fn render_block(&self, block: &RichTextBlock) -> String {
        let inline = || self.render_inline(&block.text, &block.spans);

        if let Some(level) = heading_level(&block.kind) {
            return format!("<h{level}>{}</h{level}>", inline());
        }

        match block.kind.as_str() {
            "paragraph" => format!("<p>{}</p>", inline()),
            "preformatted" => format!("<pre>{}</pre>", inline()),
            "list-item" | "o-list-item" => format!("<li>{}</li>", inline()),
            "image" => format!(
                r#"<p class="block-img">{}</p>"#,
                self.helpers
                    .image_tag(block.url.as_deref().unwrap_or_default(), block.alt.as_deref())
            ),
            "embed" => render_embed(block),
            other => {
                tracing::debug!("Unknown rich-text block type {:?}, rendering as paragraph", other);
                format!("<p>{}</p>", inline())
            }
        }
    }

    /// Render text with its spans.
    ///
    /// Overlapping spans are closed and reopened so the output stays
    /// well-formed. Offsets count UTF-16 code units.
    fn render_inline(&self, text: &str, spans: &[Span]) -> String {
        let mut spans: Vec<&Span> = spans.iter().filter(|s| s.end > s.start).collect();
        spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        let mut out = String::with_capacity(text.len());
        let mut open: Vec<&Span> = Vec::new();
        let mut next = 0;
        let mut pos = 0;

        for c in text.chars() {
            self.close_ended(&mut out, &mut open, pos);

            while next < spans.len() && spans[next].start <= pos {
                let span = spans[next];
                if span.end > pos {
                    out.push_str(&self.open_tag(span));
                    open.push(span);
                }
                next += 1;
            }

            match c {
                '\n' => out.push_str("<br />"),
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                _ => out.push(c),
            }
            pos += c.len_utf16();
        }

        while let Some(span) = open.pop() {
            out.push_str(close_tag(span));
        }

        out
    }

    /// Close every open span ending at or before `pos`
    fn close_ended<'s>(&self, out: &mut String, open: &mut Vec<&'s Span>, pos: usize) {
        if !open.iter().any(|s| s.end <= pos) {
            return;
        }

        let mut reopen = Vec::new();
        while let Some(span) = open.pop() {
            out.push_str(close_tag(span));
            if span.end > pos {
                reopen.push(span);
            }
            if !open.iter().any(|s| s.end <= pos) {
                break;
            }
        }

        for span in reopen.into_iter().rev() {
            out.push_str(&self.open_tag(span));
            open.push(span);
        }
    }

    fn open_tag(&self, span: &Span) -> String {
        match span.kind.as_str() {
            "strong" => "<strong>".to_string(),
            "em" => "<em>".to_string(),
            "hyperlink" => {
                let data = span.data.as_ref();
                let href = data.map(|d| self.link_href(d)).unwrap_or_default();
                let target = data
                    .and_then(|d| d.get("target"))
                    .and_then(Value::as_str)
                    .map(|t| format!(r#" target="{}" rel="noopener""#, html_escape(t)))
                    .unwrap_or_default();
                format!(r#"<a href="{}"{}>"#, html_escape(&href), target)
            }
            "label" => {
                let label = span
                    .data
                    .as_ref()
                    .and_then(|d| d.get("label"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                format!(r#"<span class="{}">"#, html_escape(label))
            }
            _ => "<span>".to_string(),
        }
    }

    fn link_href(&self, data: &Value) -> String {
        let field = |name: &str| data.get(name).and_then(Value::as_str);
        match field("link_type") {
            Some("Document") => self.helpers.resolve_document(field("type"), field("uid")),
            _ => field("url").unwrap_or_default().to_string(),
        }
    }
}

fn close_tag(span: &Span) -> &'static str {
    match span.kind.as_str() {
        "strong" => "</strong>",
        "em" => "</em>",
        "hyperlink" => "</a>",
        _ => "</span>",
    }
}

fn heading_level(kind: &str) -> Option<u8> {
    kind.strip_prefix("heading")
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| (1..=6).contains(n))
}

fn render_embed(block: &RichTextBlock) -> String {
    let oembed = block.oembed.as_ref();
    let field = |name: &str| {
        oembed
            .and_then(|o| o.get(name))
            .and_then(Value::as_str)
            .unwrap_or_default()
    };

    let embed_url = match field("embed_url") {
        "" => block.url.as_deref().unwrap_or_default(),
        url => url,
    };

    format!(
        r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
        html_escape(embed_url),
        html_escape(field("type")),
        html_escape(field("provider_name")),
        field("html")
    )
}
