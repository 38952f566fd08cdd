//! CLI commands

pub mod clean;
pub mod generate;
pub mod init;
pub mod list;
pub mod show;

use anyhow::Result;

use crate::config::CmsConfig;
use crate::listing::Listing;
use crate::source::ContentSource;

/// Fetch the first page and keep loading more until the listing is
/// exhausted, or until `max_pages` further pages have been loaded
pub async fn walk_listing<S>(source: &S, cms: &CmsConfig, max_pages: Option<usize>) -> Result<Listing>
where
    S: ContentSource + ?Sized,
{
    let first = source.fetch_page(&cms.content_type, cms.page_size).await?;
    let mut listing = Listing::initialize(first);

    let mut pages = 0;
    while listing.has_more() && max_pages.map_or(true, |max| pages < max) {
        listing.load_more(source).await?;
        pages += 1;
    }

    tracing::debug!(
        "Walked {} extra pages, {} posts loaded",
        pages,
        listing.posts().len()
    );
    Ok(listing)
}
