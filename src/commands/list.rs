//! List posts from the content repository

use anyhow::Result;

use super::walk_listing;
use crate::content::PostSummary;
use crate::helpers::Helpers;
use crate::source::ContentSource;
use crate::Blog;

/// Print the posts the listing loads
pub async fn run(blog: &Blog, max_pages: Option<usize>) -> Result<()> {
    let source = blog.source()?;
    for line in lines(blog, &source, max_pages).await? {
        println!("{}", line);
    }
    Ok(())
}

async fn lines<S>(blog: &Blog, source: &S, max_pages: Option<usize>) -> Result<Vec<String>>
where
    S: ContentSource + ?Sized,
{
    let listing = walk_listing(source, &blog.config.cms, max_pages).await?;
    let helpers = Helpers::new(blog.config.clone());

    let mut lines = vec![format!("Posts ({}):", listing.posts().len())];
    lines.extend(listing.posts().iter().map(|p| format_summary(&helpers, p)));
    if let Some(next) = listing.next_page() {
        lines.push(format!("  ... more available ({})", next));
    }
    Ok(lines)
}

fn format_summary(helpers: &Helpers, post: &PostSummary) -> String {
    format!(
        "  {} - {} [{}] by {}",
        helpers.date(post.publication_date.as_ref()),
        post.title,
        post.id.as_deref().unwrap_or("-"),
        post.author
    )
}
