//! HTML helper functions

use super::url::url_for;
use crate::config::SiteConfig;

/// Generate a CSS link tag
///
/// # Examples
/// ```ignore
/// css(&config, "style.css") // -> <link rel="stylesheet" href="/blog/style.css">
/// ```
pub fn css(config: &SiteConfig, path: &str) -> String {
    let path = if is_absolute_url(path) {
        path.to_string()
    } else {
        let path = if path.ends_with(".css") {
            path.to_string()
        } else {
            format!("{}.css", path)
        };
        url_for(config, &path)
    };

    format!(r#"<link rel="stylesheet" href="{}">"#, path)
}

/// Generate an image tag
///
/// # Examples
/// ```ignore
/// image_tag(&config, "https://images.prismic.io/banner.png", Some("banner"))
/// ```
pub fn image_tag(config: &SiteConfig, path: &str, alt: Option<&str>) -> String {
    let src = if is_absolute_url(path) {
        path.to_string()
    } else {
        url_for(config, path)
    };

    format!(
        r#"<img src="{}" alt="{}">"#,
        html_escape(&src),
        html_escape(alt.unwrap_or(""))
    )
}

/// Generate Open Graph meta tags
pub fn open_graph(
    title: &str,
    description: &str,
    url: &str,
    image: Option<&str>,
    site_name: &str,
) -> String {
    let mut tags = vec![
        r#"<meta property="og:type" content="article">"#.to_string(),
        format!(
            r#"<meta property="og:title" content="{}">"#,
            html_escape(title)
        ),
        format!(r#"<meta property="og:url" content="{}">"#, html_escape(url)),
        format!(
            r#"<meta property="og:site_name" content="{}">"#,
            html_escape(site_name)
        ),
    ];

    if !description.is_empty() {
        tags.push(format!(
            r#"<meta property="og:description" content="{}">"#,
            html_escape(description)
        ));
    }

    if let Some(img) = image.filter(|img| !img.is_empty()) {
        tags.push(format!(
            r#"<meta property="og:image" content="{}">"#,
            html_escape(img)
        ));
    }

    tags.join("\n")
}

/// Generate meta generator tag
pub fn meta_generator() -> String {
    format!(
        r#"<meta name="generator" content="prismic-blog {}">"#,
        env!("CARGO_PKG_VERSION")
    )
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Truncate a string to a specified length
pub fn truncate(s: &str, length: usize, omission: Option<&str>) -> String {
    let omission = omission.unwrap_or("...");

    if s.chars().count() <= length {
        s.to_string()
    } else {
        let truncated: String = s
            .chars()
            .take(length.saturating_sub(omission.chars().count()))
            .collect();
        format!("{}{}", truncated.trim_end(), omission)
    }
}

fn is_absolute_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://") || path.starts_with("//")
}
