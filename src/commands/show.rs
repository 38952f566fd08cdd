//! Show one post

use anyhow::Result;

use crate::content::{reading_time, PostDetail};
use crate::helpers::Helpers;
use crate::source::ContentSource;
use crate::Blog;

/// Print a post's metadata and reading time
pub async fn run(blog: &Blog, uid: &str) -> Result<()> {
    let source = blog.source()?;
    for line in lines(blog, &source, uid).await? {
        println!("{}", line);
    }
    Ok(())
}

async fn lines<S>(blog: &Blog, source: &S, uid: &str) -> Result<Vec<String>>
where
    S: ContentSource + ?Sized,
{
    let raw = source.fetch_by_uid(&blog.config.cms.content_type, uid).await?;
    let post = PostDetail::project(&raw);
    Ok(describe(&Helpers::new(blog.config.clone()), &post))
}

fn describe(helpers: &Helpers, post: &PostDetail) -> Vec<String> {
    let mut lines = vec![
        format!("Title:        {}", post.title),
        format!("Author:       {}", post.author),
        format!("Published:    {}", helpers.date(post.publication_date.as_ref())),
        format!("Reading time: {} min", post.reading_time()),
        format!("Sections ({}):", post.sections.len()),
    ];
    lines.extend(post.sections.iter().map(|section| {
        format!(
            "  {} ({} words)",
            section.heading,
            reading_time::total_words(std::slice::from_ref(section))
        )
    }));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::{post, StubSource};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_show_post() {
        let temp = TempDir::new().unwrap();
        let blog = Blog::new(temp.path()).unwrap();
        let mut source = StubSource::default();
        source.documents.insert("hooks".to_string(), post("hooks", "Hooks"));

        let lines = lines(&blog, &source, "hooks").await.unwrap();
        assert_eq!(lines[0], "Title:        Hooks");
        assert_eq!(lines[3], "Reading time: 1 min");
        assert_eq!(lines[5], "  Introduction (4 words)");
    }

    #[tokio::test]
    async fn test_show_missing_post() {
        let temp = TempDir::new().unwrap();
        let blog = Blog::new(temp.path()).unwrap();
        let err = lines(&blog, &StubSource::default(), "missing")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
