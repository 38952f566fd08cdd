//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable consulted when `cms.access_token` is not set
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,

    // Date format (Moment.js style tokens)
    pub date_format: String,

    // Content repository
    #[serde(default)]
    pub cms: CmsConfig,

    // Page regeneration
    #[serde(default)]
    pub revalidate: RevalidateConfig,

    // Preview server
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            description: String::new(),
            author: String::new(),
            language: "pt-BR".to_string(),
            timezone: String::new(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),

            date_format: "DD MMM YYYY".to_string(),

            cms: CmsConfig::default(),
            revalidate: RevalidateConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut config: SiteConfig = serde_yaml::from_str(&content)?;
        config.cms.apply_env();
        Ok(config)
    }
}

/// Headless CMS connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// API root of the repository, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Custom type holding blog posts
    pub content_type: String,
    /// Posts per listing page
    pub page_size: usize,
    /// Optional Prismic orderings predicate, e.g. `[document.first_publication_date desc]`
    pub orderings: Option<String>,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            content_type: "post".to_string(),
            page_size: 1,
            orderings: None,
        }
    }
}

impl CmsConfig {
    /// Fill the access token from the environment when the file leaves it out
    fn apply_env(&mut self) {
        if self.access_token.as_deref().map_or(true, str::is_empty) {
            if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
                if !token.is_empty() {
                    tracing::debug!("Using access token from {}", ACCESS_TOKEN_ENV);
                    self.access_token = Some(token);
                }
            }
        }
    }
}

/// Page regeneration intervals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevalidateConfig {
    /// Age in seconds after which the listing's first page is refetched
    pub listing_secs: u64,
}

impl Default for RevalidateConfig {
    fn default() -> Self {
        Self {
            listing_secs: 60 * 30,
        }
    }
}

/// Preview server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listing sessions kept in memory before the oldest is dropped
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { max_sessions: 256 }
    }
}
