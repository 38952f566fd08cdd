//! Preview server
//!
//! Renders pages on demand from the content repository:
//!
//! - `/` serves the first listing page, refetched once it is older than
//!   `revalidate.listing_secs`, and opens a listing session for it
//! - `/listing/:session/more` loads the next page into that session
//! - `/post/:uid` renders a post on first request and keeps it for the life
//!   of the process
//!
//! Anything else is served from the public directory.

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::content::{Page, PostDetail, RawEntry};
use crate::generator::Generator;
use crate::listing::{load_more_shared, Listing, ListingError};
use crate::source::{ContentError, ContentSource};
use crate::templates::STYLESHEET;
use crate::Blog;

/// First listing page and when it was fetched
struct CachedPage {
    page: Page<RawEntry>,
    fetched_at: Instant,
}

/// Server state
pub struct ServerState {
    source: Arc<dyn ContentSource>,
    generator: Generator,
    public_dir: PathBuf,
    content_type: String,
    page_size: usize,
    listing_ttl: Duration,
    max_sessions: usize,
    first_page: RwLock<Option<CachedPage>>,
    sessions: Mutex<IndexMap<u64, Arc<Mutex<Listing>>>>,
    next_session: AtomicU64,
    posts: RwLock<HashMap<String, String>>,
}

impl ServerState {
    /// Create the state for `blog`, reading posts from `source`.
    ///
    /// Pages are always linked from the server root, whatever `root` the
    /// site is configured with.
    pub fn new(blog: &Blog, source: Arc<dyn ContentSource>) -> Result<Self> {
        let mut preview = blog.clone();
        preview.config.root = "/".to_string();
        let config = &preview.config;

        Ok(Self {
            source,
            generator: Generator::new(&preview)?,
            public_dir: preview.public_dir.clone(),
            content_type: config.cms.content_type.clone(),
            page_size: config.cms.page_size,
            listing_ttl: Duration::from_secs(config.revalidate.listing_secs),
            max_sessions: config.server.max_sessions.max(1),
            first_page: RwLock::new(None),
            sessions: Mutex::new(IndexMap::new()),
            next_session: AtomicU64::new(1),
            posts: RwLock::new(HashMap::new()),
        })
    }

    /// The listing's first page, refetched when stale.
    ///
    /// A failed refetch falls back to the stale copy if there is one.
    async fn first_page(&self) -> Result<Page<RawEntry>, ContentError> {
        if let Some(cached) = self.first_page.read().await.as_ref() {
            if cached.fetched_at.elapsed() < self.listing_ttl {
                return Ok(cached.page.clone());
            }
        }

        let mut cache = self.first_page.write().await;
        // Another request may have refreshed it while we waited
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.listing_ttl {
                return Ok(cached.page.clone());
            }
        }

        match self
            .source
            .fetch_page(&self.content_type, self.page_size)
            .await
        {
            Ok(page) => {
                tracing::debug!("Revalidated listing ({} posts)", page.results.len());
                *cache = Some(CachedPage {
                    page: page.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(page)
            }
            Err(e) => match cache.as_ref() {
                Some(stale) => {
                    tracing::warn!("Revalidating listing failed, serving stale copy: {}", e);
                    Ok(stale.page.clone())
                }
                None => Err(e),
            },
        }
    }

    /// Register a new listing session, dropping the oldest ones over the cap
    fn open_session(&self, listing: Listing) -> (u64, Arc<Mutex<Listing>>) {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        let listing = Arc::new(Mutex::new(listing));

        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        while sessions.len() >= self.max_sessions {
            if let Some((evicted, _)) = sessions.shift_remove_index(0) {
                tracing::debug!("Evicted listing session {}", evicted);
            }
        }
        sessions.insert(id, listing.clone());
        (id, listing)
    }

    fn session(&self, id: u64) -> Option<Arc<Mutex<Listing>>> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Render a session's accumulated listing
    fn render_session(&self, id: u64, listing: &Mutex<Listing>) -> Response {
        let (posts, has_more) = {
            let listing = listing.lock().unwrap_or_else(PoisonError::into_inner);
            (listing.posts().to_vec(), listing.has_more())
        };
        let more_url = has_more.then(|| more_url(self, id));

        match self.generator.render_listing(&posts, more_url.as_deref()) {
            Ok(html) => Html(html).into_response(),
            Err(e) => render_failure(e),
        }
    }

    fn not_found(&self, uid: Option<&str>) -> Response {
        match self.generator.render_not_found(uid) {
            Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
            Err(e) => render_failure(e),
        }
    }
}

/// Build the router for `state`
pub fn app(state: Arc<ServerState>) -> Router {
    let static_files = ServeDir::new(&state.public_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/", get(index_handler))
        .route("/listing/:session/more", get(more_handler))
        .route("/post/:uid", get(post_handler))
        .route("/style.css", get(stylesheet_handler))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the preview server
pub async fn start(blog: &Blog, ip: &str, port: u16) -> Result<()> {
    let source: Arc<dyn ContentSource> = Arc::new(blog.source()?);
    let state = Arc::new(ServerState::new(blog, source)?);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

async fn index_handler(State(state): State<Arc<ServerState>>) -> Response {
    let page = match state.first_page().await {
        Ok(page) => page,
        Err(e) => return fetch_failure(e),
    };

    let (id, listing) = state.open_session(Listing::initialize(page));
    state.render_session(id, &listing)
}

async fn more_handler(
    State(state): State<Arc<ServerState>>,
    Path(session): Path<u64>,
) -> Response {
    let Some(listing) = state.session(session) else {
        return (StatusCode::NOT_FOUND, "Unknown listing session").into_response();
    };

    match load_more_shared(&listing, state.source.as_ref()).await {
        Ok(_) | Err(ListingError::Exhausted) => state.render_session(session, &listing),
        Err(ListingError::AlreadyLoading) => {
            (StatusCode::CONFLICT, "A page is already being loaded").into_response()
        }
        Err(ListingError::Fetch(e)) => fetch_failure(e),
        Err(e @ ListingError::NotLoading) => {
            tracing::error!("Listing session {}: {}", session, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(uid): Path<String>,
) -> Response {
    if let Some(html) = state.posts.read().await.get(&uid) {
        return Html(html.clone()).into_response();
    }

    let raw = match state.source.fetch_by_uid(&state.content_type, &uid).await {
        Ok(raw) => raw,
        Err(e) if e.is_not_found() => {
            tracing::debug!("{}", e);
            return state.not_found(Some(&uid));
        }
        Err(e) => return fetch_failure(e),
    };

    let post = PostDetail::project(&raw);
    match state.generator.render_post(&post, &uid) {
        Ok(html) => {
            tracing::info!("Generated post {}", uid);
            state.posts.write().await.insert(uid, html.clone());
            Html(html).into_response()
        }
        Err(e) => render_failure(e),
    }
}

async fn stylesheet_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}

fn more_url(state: &ServerState, session: u64) -> String {
    state
        .generator
        .helpers()
        .url_for(&format!("listing/{}/more", session))
}

fn fetch_failure(e: ContentError) -> Response {
    tracing::warn!("Content fetch failed: {}", e);
    (
        StatusCode::BAD_GATEWAY,
        "The content repository could not be reached",
    )
        .into_response()
}

fn render_failure(e: anyhow::Error) -> Response {
    tracing::error!("Rendering failed: {:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::{page, post, StubSource};
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct Harness {
        _temp: TempDir,
        source: Arc<StubSource>,
        state: Arc<ServerState>,
    }

    fn harness(source: StubSource, configure: impl FnOnce(&mut Blog)) -> Harness {
        let temp = TempDir::new().unwrap();
        let mut blog = Blog::new(temp.path()).unwrap();
        configure(&mut blog);

        let source = Arc::new(source);
        let dyn_source: Arc<dyn ContentSource> = source.clone();
        let state = Arc::new(ServerState::new(&blog, dyn_source).unwrap());
        Harness {
            _temp: temp,
            source,
            state,
        }
    }

    fn two_pages() -> StubSource {
        StubSource::with_pages(
            page(vec![post("a", "Post A")], Some("T1")),
            vec![Ok(page(vec![post("b", "Post B")], None))],
        )
    }

    async fn get(state: &Arc<ServerState>, uri: &str) -> (StatusCode, String) {
        let response = app(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_index_opens_session() {
        let h = harness(two_pages(), |_| {});

        let (status, body) = get(&h.state, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Post A"));
        assert!(body.contains(r#"href="/listing/1/more""#));

        let (_, body) = get(&h.state, "/").await;
        assert!(body.contains(r#"href="/listing/2/more""#));
        // Second request is served from the cached first page
        assert_eq!(h.source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_listing_served_when_refetch_fails() {
        let h = harness(two_pages(), |blog| blog.config.revalidate.listing_secs = 0);

        get(&h.state, "/").await;
        *h.source.first.lock().unwrap() = None;

        let (status, body) = get(&h.state, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Post A"));
        assert_eq!(h.source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_index_without_repository() {
        let h = harness(StubSource::default(), |_| {});
        let (status, _) = get(&h.state, "/").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_load_more() {
        let h = harness(two_pages(), |_| {});
        get(&h.state, "/").await;

        let (status, body) = get(&h.state, "/listing/1/more").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Post A"));
        assert!(body.contains("Post B"));
        assert!(!body.contains("Carregar mais"));

        // Exhausted: rendered unchanged without fetching
        let (status, again) = get(&h.state, "/listing/1/more").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again, body);
        assert_eq!(h.source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_load_more_unknown_session() {
        let h = harness(two_pages(), |_| {});
        let (status, _) = get(&h.state, "/listing/42/more").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_load_more_while_loading_conflicts() {
        let h = harness(two_pages(), |_| {});
        get(&h.state, "/").await;

        let listing = h.state.session(1).unwrap();
        let ticket = listing.lock().unwrap().begin_load().unwrap();

        let (status, _) = get(&h.state, "/listing/1/more").await;
        assert_eq!(status, StatusCode::CONFLICT);

        listing.lock().unwrap().abandon_load(ticket);
        let (status, body) = get(&h.state, "/listing/1/more").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Post B"));
    }

    #[tokio::test]
    async fn test_load_more_failure_keeps_session() {
        let source = StubSource::with_pages(
            page(vec![post("a", "Post A")], Some("T1")),
            vec![
                Err(ContentError::Service {
                    status: 500,
                    message: "boom".to_string(),
                }),
                Ok(page(vec![post("b", "Post B")], None)),
            ],
        );
        let h = harness(source, |_| {});
        get(&h.state, "/").await;

        let (status, _) = get(&h.state, "/listing/1/more").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        {
            let listing = h.state.session(1).unwrap();
            let listing = listing.lock().unwrap();
            assert_eq!(listing.posts().len(), 1);
            assert_eq!(listing.next_page(), Some("T1"));
        }

        let (status, body) = get(&h.state, "/listing/1/more").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Post B"));
    }

    #[tokio::test]
    async fn test_sessions_are_capped() {
        let h = harness(two_pages(), |blog| blog.config.server.max_sessions = 2);
        for _ in 0..3 {
            get(&h.state, "/").await;
        }

        assert!(h.state.session(1).is_none());
        assert!(h.state.session(2).is_some());
        assert!(h.state.session(3).is_some());
        let (status, _) = get(&h.state, "/listing/1/more").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_post_is_cached() {
        let mut source = two_pages();
        source
            .documents
            .insert("hooks".to_string(), post("hooks", "Como utilizar Hooks"));
        let h = harness(source, |_| {});

        let (status, body) = get(&h.state, "/post/hooks").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<h1>Como utilizar Hooks</h1>"));
        assert!(body.contains("1 min"));

        let (_, again) = get(&h.state, "/post/hooks").await;
        assert_eq!(again, body);
        assert_eq!(h.source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_post_is_not_cached() {
        let h = harness(two_pages(), |_| {});

        let (status, body) = get(&h.state, "/post/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Post não encontrado"));

        get(&h.state, "/post/missing").await;
        assert_eq!(h.source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_post_links_ignore_site_root() {
        let mut source = two_pages();
        source.documents.insert("a".to_string(), post("a", "Post A"));
        let h = harness(source, |blog| blog.config.root = "/blog/".to_string());

        let (_, body) = get(&h.state, "/").await;
        assert!(body.contains(r#"href="/post/a""#));
        assert!(body.contains(r#"href="/style.css""#));
    }

    #[tokio::test]
    async fn test_stylesheet_and_static_files() {
        let h = harness(two_pages(), |_| {});

        let (status, css) = get(&h.state, "/style.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(css, STYLESHEET);

        std::fs::create_dir_all(&h.state.public_dir).unwrap();
        std::fs::write(h.state.public_dir.join("robots.txt"), "User-agent: *\n").unwrap();
        let (status, body) = get(&h.state, "/robots.txt").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "User-agent: *\n");

        let (status, _) = get(&h.state, "/nope.txt").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
