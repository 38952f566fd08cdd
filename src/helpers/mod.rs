//! Helper functions for templates
//!
//! These functions cover URL generation, HTML snippets and date display
//! for the rendered pages.

mod date;
mod html;
mod url;

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;

pub use date::*;
pub use html::*;
pub use url::*;

use crate::config::SiteConfig;

/// Helpers bound to one site configuration
#[derive(Debug, Clone)]
pub struct Helpers {
    config: SiteConfig,
    locale: DateLocale,
    timezone: Tz,
}

impl Helpers {
    /// Create a new helpers instance
    pub fn new(config: SiteConfig) -> Self {
        let locale = DateLocale::from_language(&config.language);
        let timezone = display_timezone(&config.timezone);
        Self {
            config,
            locale,
            timezone,
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Get url_for helper
    pub fn url_for(&self, path: &str) -> String {
        url_for(&self.config, path)
    }

    /// Get full_url_for helper
    pub fn full_url_for(&self, path: &str) -> String {
        full_url_for(&self.config, path)
    }

    /// Link to a post page
    pub fn post_url(&self, uid: &str) -> String {
        post_url(&self.config, uid)
    }

    /// Link to a repository document
    pub fn resolve_document(&self, doc_type: Option<&str>, uid: Option<&str>) -> String {
        resolve_document(&self.config, doc_type, uid)
    }

    /// Get css helper
    pub fn css(&self, path: &str) -> String {
        css(&self.config, path)
    }

    /// Get image_tag helper
    pub fn image_tag(&self, path: &str, alt: Option<&str>) -> String {
        image_tag(&self.config, path, alt)
    }

    /// Format a publication date in the site's timezone and language.
    ///
    /// Undated posts render as an empty string.
    pub fn date(&self, date: Option<&DateTime<FixedOffset>>) -> String {
        date.map(|d| {
            format_date(
                &d.with_timezone(&self.timezone),
                &self.config.date_format,
                self.locale,
            )
        })
        .unwrap_or_default()
    }

    /// Machine-readable publication date for `<time datetime>`
    pub fn date_xml(&self, date: Option<&DateTime<FixedOffset>>) -> String {
        date.map(|d| date_xml(&d.with_timezone(&self.timezone)))
            .unwrap_or_default()
    }
}
