//! prismic-blog: a blog front-end for a Prismic content repository
//!
//! Posts are read from the repository's REST API, projected into listing
//! summaries and full posts, and rendered with embedded Tera templates,
//! either to static files or on demand by the preview server.

pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod listing;
pub mod server;
pub mod source;
pub mod templates;

use anyhow::Result;
use std::path::Path;

/// The main blog application
#[derive(Debug, Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: std::path::PathBuf,
    /// Public (output) directory
    pub public_dir: std::path::PathBuf,
}

impl Blog {
    /// Create a new Blog instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        let public_dir = base_dir.join(&config.public_dir);

        Ok(Self {
            config,
            base_dir,
            public_dir,
        })
    }

    /// Client for the configured content repository
    pub fn source(&self) -> Result<source::PrismicClient, source::ContentError> {
        source::PrismicClient::new(&self.config.cms)
    }

    /// Generate the static site
    pub async fn generate(&self, max_pages: Option<usize>) -> Result<()> {
        commands::generate::run(self, max_pages).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
