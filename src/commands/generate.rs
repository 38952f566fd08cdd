//! Generate static files

use anyhow::Result;

use super::walk_listing;
use crate::content::PostDetail;
use crate::generator::Generator;
use crate::source::ContentSource;
use crate::Blog;

/// Generate the site from the configured repository
pub async fn run(blog: &Blog, max_pages: Option<usize>) -> Result<()> {
    let source = blog.source()?;
    run_with_source(blog, &source, max_pages).await
}

/// Generate the site from `source`.
///
/// Posts whose uid no longer resolves are skipped; any other failure
/// aborts the run before anything is written.
pub async fn run_with_source<S>(blog: &Blog, source: &S, max_pages: Option<usize>) -> Result<()>
where
    S: ContentSource + ?Sized,
{
    let start = std::time::Instant::now();
    let cms = &blog.config.cms;

    let listing = walk_listing(source, cms, max_pages).await?;
    tracing::info!("Loaded {} posts", listing.posts().len());

    let mut posts: Vec<(String, PostDetail)> = Vec::new();
    for summary in listing.posts() {
        let Some(uid) = summary.id.as_deref() else {
            tracing::warn!("Skipping post {:?} without uid", summary.title);
            continue;
        };
        if posts.iter().any(|(seen, _)| seen == uid) {
            continue;
        }

        match source.fetch_by_uid(&cms.content_type, uid).await {
            Ok(raw) => posts.push((uid.to_string(), PostDetail::project(&raw))),
            Err(e) if e.is_not_found() => {
                tracing::warn!("Skipping {}: {}", uid, e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    let generator = Generator::new(blog)?;
    generator.write_site(listing.posts(), &posts)?;

    tracing::info!(
        "Generated {} post pages in {:?}",
        posts.len(),
        start.elapsed()
    );
    Ok(())
}
