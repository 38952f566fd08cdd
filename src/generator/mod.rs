//! Generator module - renders pages with the built-in Tera templates
//!
//! The same renderer backs the `generate` command, which writes the pages
//! to the public directory, and the preview server, which renders them on
//! demand.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use tera::Context;

use crate::content::{PostDetail, PostSummary, RichTextRenderer};
use crate::helpers::{encode_segment, meta_generator, open_graph, Helpers};
use crate::templates::{
    PostView, SectionView, SiteView, SummaryView, TemplateRenderer, STYLESHEET,
};
use crate::Blog;

/// Page renderer bound to one site
pub struct Generator {
    helpers: Helpers,
    renderer: TemplateRenderer,
    public_dir: PathBuf,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        Ok(Self {
            helpers: Helpers::new(blog.config.clone()),
            renderer: TemplateRenderer::new()?,
            public_dir: blog.public_dir.clone(),
        })
    }

    pub fn helpers(&self) -> &Helpers {
        &self.helpers
    }

    /// Render the listing page.
    ///
    /// The load-more link is only shown when `more_url` is given.
    pub fn render_listing(&self, posts: &[PostSummary], more_url: Option<&str>) -> Result<String> {
        let config = self.helpers.config();
        let posts: Vec<SummaryView> = posts.iter().map(|p| self.summary_view(p)).collect();

        let mut context = self.create_base_context();
        context.insert(
            "open_graph",
            &open_graph(
                &config.title,
                &config.description,
                &self.helpers.full_url_for("/"),
                None,
                &config.title,
            ),
        );
        context.insert("posts", &posts);
        context.insert("more_url", &more_url);

        self.renderer.render("index.html", &context)
    }

    /// Render a post page
    pub fn render_post(&self, post: &PostDetail, uid: &str) -> Result<String> {
        let config = self.helpers.config();
        let view = self.post_view(post);

        let mut context = self.create_base_context();
        context.insert(
            "open_graph",
            &open_graph(
                &post.title,
                "",
                &self.helpers.full_url_for(&self.helpers.post_url(uid)),
                Some(post.banner_url.as_str()),
                &config.title,
            ),
        );
        context.insert("post", &view);

        self.renderer.render("post.html", &context)
    }

    /// Render the page shown for a uid that does not resolve
    pub fn render_not_found(&self, uid: Option<&str>) -> Result<String> {
        let mut context = self.create_base_context();
        context.insert("uid", &uid);
        self.renderer.render("not_found.html", &context)
    }

    /// Write the listing, every post and the stylesheet to the public directory
    pub fn write_site(&self, listing: &[PostSummary], posts: &[(String, PostDetail)]) -> Result<()> {
        fs::create_dir_all(&self.public_dir)?;

        self.write_page(Path::new("style.css"), STYLESHEET)?;

        let index = self.render_listing(listing, None)?;
        self.write_page(Path::new("index.html"), &index)?;

        for (uid, post) in posts {
            let Some(dir) = post_dir(uid) else {
                tracing::warn!("Skipping post with unusable uid {:?}", uid);
                continue;
            };
            let html = self.render_post(post, uid)?;
            self.write_page(&dir.join("index.html"), &html)?;
        }

        Ok(())
    }

    fn write_page(&self, relative: &Path, content: &str) -> Result<()> {
        let output_path = self.public_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output_path, content)?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }

    /// Create base context shared by every page
    fn create_base_context(&self) -> Context {
        let config = self.helpers.config();
        let site = SiteView {
            title: config.title.clone(),
            description: config.description.clone(),
            language: config.language.clone(),
            home_url: self.helpers.url_for("/"),
            stylesheet: self.helpers.css("style.css"),
            generator: meta_generator(),
        };

        let mut context = Context::new();
        context.insert("site", &site);
        context
    }

    fn summary_view(&self, post: &PostSummary) -> SummaryView {
        SummaryView {
            url: post
                .id
                .as_deref()
                .map(|uid| self.helpers.post_url(uid))
                .unwrap_or_else(|| self.helpers.url_for("/")),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date: self.helpers.date(post.publication_date.as_ref()),
            datetime: self.helpers.date_xml(post.publication_date.as_ref()),
        }
    }

    fn post_view(&self, post: &PostDetail) -> PostView {
        let richtext = RichTextRenderer::new(&self.helpers);
        let sections = post
            .sections
            .iter()
            .map(|section| SectionView {
                heading: section.heading.clone(),
                anchor: slug::slugify(&section.heading),
                html: richtext.render(&section.body),
            })
            .collect();

        let banner = if post.banner_url.is_empty() {
            String::new()
        } else {
            self.helpers.image_tag(&post.banner_url, Some("banner"))
        };

        PostView {
            title: post.title.clone(),
            banner,
            author: post.author.clone(),
            date: self.helpers.date(post.publication_date.as_ref()),
            datetime: self.helpers.date_xml(post.publication_date.as_ref()),
            reading_time: post.reading_time(),
            sections,
        }
    }
}

/// Output directory of a post, relative to the public directory
fn post_dir(uid: &str) -> Option<PathBuf> {
    let segment = encode_segment(uid);
    if segment.is_empty() || segment == "." || segment == ".." {
        return None;
    }
    Some(Path::new("post").join(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::RawEntry;
    use crate::source::testing::post;
    use tempfile::TempDir;

    fn blog(dir: &Path) -> Blog {
        Blog::new(dir).unwrap()
    }

    fn summary(uid: &str, title: &str) -> PostSummary {
        PostSummary::project(&post(uid, title))
    }

    #[test]
    fn test_render_listing() {
        let temp = TempDir::new().unwrap();
        let generator = Generator::new(&blog(temp.path())).unwrap();

        let html = generator
            .render_listing(&[summary("hooks", "Como utilizar Hooks")], Some("/listing/1/more"))
            .unwrap();
        assert!(html.contains(r#"href="/post/hooks""#));
        assert!(html.contains("Como utilizar Hooks"));
        assert!(html.contains("Joseph Oliveira"));
        assert!(html.contains("15 mar 2021"));
        assert!(html.contains(r#"href="/listing/1/more""#));
        assert!(html.contains("Carregar mais"));
    }

    #[test]
    fn test_listing_without_more() {
        let temp = TempDir::new().unwrap();
        let generator = Generator::new(&blog(temp.path())).unwrap();

        let html = generator.render_listing(&[], None).unwrap();
        assert!(!html.contains("Carregar mais"));
        assert!(html.contains("Nenhum post encontrado"));
    }

    #[test]
    fn test_render_post() {
        let temp = TempDir::new().unwrap();
        let generator = Generator::new(&blog(temp.path())).unwrap();

        let detail = PostDetail::project(&post("hooks", "Como utilizar Hooks"));
        let html = generator.render_post(&detail, "hooks").unwrap();
        assert!(html.contains("<h1>Como utilizar Hooks</h1>"));
        assert!(html.contains("1 min"));
        assert!(html.contains(r#"<section id="introduction">"#));
        assert!(html.contains("<p>Some words here</p>"));
        assert!(html.contains(r#"<img src="https://images.prismic.io/banner.png" alt="banner">"#));
    }

    #[test]
    fn test_post_without_content() {
        let temp = TempDir::new().unwrap();
        let generator = Generator::new(&blog(temp.path())).unwrap();

        let detail = PostDetail::project(&RawEntry::new(serde_json::json!({ "uid": "empty" })));
        let html = generator.render_post(&detail, "empty").unwrap();
        assert!(html.contains("0 min"));
        assert!(!html.contains("<section"));
    }

    #[test]
    fn test_write_site() {
        let temp = TempDir::new().unwrap();
        let generator = Generator::new(&blog(temp.path())).unwrap();

        let detail = PostDetail::project(&post("hooks", "Hooks"));
        generator
            .write_site(
                &[summary("hooks", "Hooks")],
                &[("hooks".to_string(), detail.clone()), ("..".to_string(), detail)],
            )
            .unwrap();

        let public = temp.path().join("public");
        assert!(public.join("index.html").exists());
        assert!(public.join("style.css").exists());
        let page = fs::read_to_string(public.join("post/hooks/index.html")).unwrap();
        assert!(page.contains("Hooks"));
    }

    #[test]
    fn test_post_dir() {
        assert_eq!(post_dir("hooks"), Some(PathBuf::from("post/hooks")));
        assert_eq!(post_dir("a/b"), Some(PathBuf::from("post/a%2Fb")));
        assert_eq!(post_dir(".."), None);
        assert_eq!(post_dir(""), None);
    }
}
