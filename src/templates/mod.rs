//! Built-in blog templates using the Tera template engine
//!
//! Templates and the stylesheet are embedded in the binary. Autoescaping is
//! left on for the `.html` templates since titles and authors come straight
//! from the content repository. Fragments built by the helpers, and URLs
//! built from percent-encoded uids, are marked `safe` in the templates.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

/// Stylesheet written next to the generated pages
pub const STYLESHEET: &str = include_str!("blog/style.css");

/// Template renderer with the embedded blog theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("blog/layout.html")),
            ("index.html", include_str!("blog/index.html")),
            ("post.html", include_str!("blog/post.html")),
            ("not_found.html", include_str!("blog/not_found.html")),
        ])?;

        tera.register_filter("truncate_chars", truncate_chars_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };

    if s.chars().count() <= length {
        Ok(tera::Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(tera::Value::String(format!(
            "{}{}",
            truncated.trim_end(),
            omission
        )))
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteView {
    pub title: String,
    pub description: String,
    pub language: String,
    pub home_url: String,
    /// `<link>` tag for the stylesheet
    pub stylesheet: String,
    /// `<meta name="generator">` tag
    pub generator: String,
}

/// One entry of the listing page
#[derive(Debug, Clone, Serialize)]
pub struct SummaryView {
    pub url: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: String,
    pub datetime: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub title: String,
    /// `<img>` tag for the banner, empty without one
    pub banner: String,
    pub author: String,
    pub date: String,
    pub datetime: String,
    /// Estimated minutes to read
    pub reading_time: u32,
    pub sections: Vec<SectionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub heading: String,
    /// Fragment id derived from the heading
    pub anchor: String,
    /// Rendered body
    pub html: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteView {
        SiteView {
            title: "spacetraveling".to_string(),
            description: String::new(),
            language: "pt-BR".to_string(),
            home_url: "/".to_string(),
            stylesheet: r#"<link rel="stylesheet" href="/style.css">"#.to_string(),
            generator: String::new(),
        }
    }

    #[test]
    fn test_all_templates_load() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = Context::new();
        context.insert("site", &site());
        context.insert("uid", "missing");

        let html = renderer.render("not_found.html", &context).unwrap();
        assert!(html.contains("<code>missing</code>"));
        assert!(html.contains(r#"<link rel="stylesheet" href="/style.css">"#));
    }

    #[test]
    fn test_repository_text_is_escaped() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = Context::new();
        context.insert("site", &site());
        context.insert("open_graph", "");
        context.insert("more_url", &None::<String>);
        context.insert(
            "posts",
            &vec![SummaryView {
                url: "/post/x".to_string(),
                title: "<script>".to_string(),
                subtitle: String::new(),
                author: String::new(),
                date: String::new(),
                datetime: String::new(),
            }],
        );

        let html = renderer.render("index.html", &context).unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("Carregar mais"));
    }

    #[test]
    fn test_truncate_chars_filter() {
        let mut args = HashMap::new();
        args.insert("length".to_string(), tera::Value::from(5));
        let out = truncate_chars_filter(&tera::Value::from("hello world"), &args).unwrap();
        assert_eq!(out, tera::Value::from("hello..."));

        let short = truncate_chars_filter(&tera::Value::from("hi"), &HashMap::new()).unwrap();
        assert_eq!(short, tera::Value::from("hi"));
    }
}
