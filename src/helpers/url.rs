//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::SiteConfig;

/// Characters escaped inside a single path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/style.css") // -> "/blog/style.css"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/post/hello") // -> "https://example.com/blog/post/hello"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    format!("{}{}", base, url_for(config, path))
}

/// Percent-encode one path segment
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Path of a post page
pub fn post_url(config: &SiteConfig, uid: &str) -> String {
    url_for(config, &format!("post/{}", encode_segment(uid)))
}

/// Resolve a link to a repository document.
///
/// Documents of the post type link to their page; anything else links home.
pub fn resolve_document(config: &SiteConfig, doc_type: Option<&str>, uid: Option<&str>) -> String {
    match (doc_type, uid) {
        (Some(doc_type), Some(uid)) if doc_type == config.cms.content_type && !uid.is_empty() => {
            post_url(config, uid)
        }
        _ => url_for(config, "/"),
    }
}
