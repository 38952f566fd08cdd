//! Initialize a new blog

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::config::ACCESS_TOKEN_ENV;

/// Initialize a new blog in the given directory.
///
/// An existing `_config.yml` is left untouched.
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir.join("public"))?;

    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        tracing::warn!("{:?} already exists, keeping it", config_path);
        return Ok(());
    }

    let config_content = format!(
        r#"# Site
title: spacetraveling
description: ''
author: ''
language: pt-BR
timezone: ''

# URL
url: http://localhost:4000
root: /
public_dir: public

# Date format (moment.js style tokens)
date_format: DD MMM YYYY

# Content repository
cms:
  endpoint: https://your-repository.cdn.prismic.io/api/v2
  # Leave empty to read {env}
  access_token: ''
  content_type: post
  page_size: 1
  orderings: '[document.first_publication_date desc]'

# Preview server
revalidate:
  listing_secs: 1800
server:
  max_sessions: 256
"#,
        env = ACCESS_TOKEN_ENV
    );

    fs::write(&config_path, config_content)?;

    Ok(())
}
