//! Listing accumulator
//!
//! Holds the summaries loaded so far for one listing session and the token
//! of the next page. Loading more is an explicit two-phase transition
//! (Idle -> Loading -> Idle) so a second load can never race the first one
//! and clobber the token.

use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::content::{Page, PostSummary, RawEntry};
use crate::source::{ContentError, ContentSource};

/// Why a load was not performed or did not succeed
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("no further pages to load")]
    Exhausted,

    #[error("a page is already being loaded")]
    AlreadyLoading,

    #[error("no page load is in flight")]
    NotLoading,

    #[error("failed to load the next page: {0}")]
    Fetch(#[from] ContentError),
}

/// Loaded summaries and where to continue from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingState {
    /// Summaries in fetch order; only ever appended to
    pub loaded: Vec<PostSummary>,
    /// Token of the next page, `None` when every page has been loaded
    pub next_page: Option<String>,
}

/// Whether a page fetch is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
}

/// Proof that a load was started; hands the token to the fetch and is
/// consumed when the load completes or is abandoned
#[derive(Debug)]
#[must_use = "a started load must be completed or abandoned"]
pub struct LoadTicket {
    token: String,
}

impl LoadTicket {
    /// Continuation token to fetch
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// One session's listing
#[derive(Debug, Clone)]
pub struct Listing {
    state: ListingState,
    phase: Phase,
}

impl Listing {
    /// Start a listing from an already fetched first page
    pub fn initialize(first_page: Page<RawEntry>) -> Self {
        let loaded = PostSummary::project_all(&first_page.results);
        tracing::debug!(
            "Listing initialized with {} posts (more: {})",
            loaded.len(),
            first_page.has_next()
        );
        Self {
            state: ListingState {
                loaded,
                next_page: first_page.next_page,
            },
            phase: Phase::Idle,
        }
    }

    pub fn state(&self) -> &ListingState {
        &self.state
    }

    /// Summaries loaded so far
    pub fn posts(&self) -> &[PostSummary] {
        &self.state.loaded
    }

    pub fn next_page(&self) -> Option<&str> {
        self.state.next_page.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether another page exists
    pub fn has_more(&self) -> bool {
        self.state.next_page.is_some()
    }

    /// Idle -> Loading.
    ///
    /// Rejected while another load is in flight or when no page is left.
    pub fn begin_load(&mut self) -> Result<LoadTicket, ListingError> {
        if self.phase == Phase::Loading {
            return Err(ListingError::AlreadyLoading);
        }
        let token = self
            .state
            .next_page
            .clone()
            .ok_or(ListingError::Exhausted)?;
        self.phase = Phase::Loading;
        Ok(LoadTicket { token })
    }

    /// Loading -> Idle with the fetch outcome.
    ///
    /// On success the page's summaries are appended and its token replaces
    /// the current one; the number of appended summaries is returned. On
    /// failure the state is left as it was.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Page<RawEntry>, ContentError>,
    ) -> Result<usize, ListingError> {
        if self.phase != Phase::Loading {
            return Err(ListingError::NotLoading);
        }
        self.phase = Phase::Idle;

        let page = result.map_err(|e| {
            tracing::warn!("Loading page {} failed: {}", ticket.token, e);
            ListingError::Fetch(e)
        })?;

        let added = PostSummary::project_all(&page.results);
        let count = added.len();
        self.state.loaded.extend(added);
        self.state.next_page = page.next_page;

        tracing::debug!(
            "Loaded {} more posts ({} total, more: {})",
            count,
            self.state.loaded.len(),
            self.has_more()
        );
        Ok(count)
    }

    /// Loading -> Idle without touching the state
    pub fn abandon_load(&mut self, ticket: LoadTicket) {
        if self.phase == Phase::Loading {
            tracing::debug!("Abandoned load of {}", ticket.token);
            self.phase = Phase::Idle;
        }
    }

    /// Fetch the next page from `source` and append it
    pub async fn load_more<S>(&mut self, source: &S) -> Result<usize, ListingError>
    where
        S: ContentSource + ?Sized,
    {
        let ticket = self.begin_load()?;
        let result = source.fetch_next(ticket.token()).await;
        self.complete_load(ticket, result)
    }
}

/// Load the next page into a listing shared between requests.
///
/// The lock is only held for the state transitions, not across the fetch;
/// a concurrent call sees the Loading phase and is rejected. If the returned
/// future is dropped mid-fetch the listing goes back to Idle unchanged.
pub async fn load_more_shared<S>(listing: &Mutex<Listing>, source: &S) -> Result<usize, ListingError>
where
    S: ContentSource + ?Sized,
{
    let ticket = lock(listing).begin_load()?;
    let mut pending = PendingLoad {
        listing,
        ticket: Some(ticket),
    };

    let token = pending
        .ticket
        .as_ref()
        .map(|t| t.token().to_string())
        .unwrap_or_default();
    let result = source.fetch_next(&token).await;

    match pending.ticket.take() {
        Some(ticket) => lock(listing).complete_load(ticket, result),
        None => Err(ListingError::NotLoading),
    }
}

/// Returns the listing to Idle if a shared load never completes
struct PendingLoad<'a> {
    listing: &'a Mutex<Listing>,
    ticket: Option<LoadTicket>,
}

impl Drop for PendingLoad<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            lock(self.listing).abandon_load(ticket);
        }
    }
}

fn lock(listing: &Mutex<Listing>) -> std::sync::MutexGuard<'_, Listing> {
    listing.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::{page, post, StubSource};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn titles(listing: &Listing) -> Vec<&str> {
        listing.posts().iter().map(|p| p.title.as_str()).collect()
    }

    #[test]
    fn test_initialize() {
        let listing = Listing::initialize(page(vec![post("a", "A"), post("b", "B")], Some("T1")));
        assert_eq!(titles(&listing), vec!["A", "B"]);
        assert_eq!(listing.next_page(), Some("T1"));
        assert_eq!(listing.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_load_more_appends_in_order() {
        let source = StubSource::with_pages(
            page(vec![], None),
            vec![
                Ok(page(vec![post("b", "B"), post("c", "C")], Some("T2"))),
                Ok(page(vec![post("d", "D")], Some("T3"))),
            ],
        );
        let mut listing = Listing::initialize(page(vec![post("a", "A")], Some("T1")));

        assert_eq!(listing.load_more(&source).await.unwrap(), 2);
        assert_eq!(titles(&listing), vec!["A", "B", "C"]);
        assert_eq!(listing.next_page(), Some("T2"));

        assert_eq!(listing.load_more(&source).await.unwrap(), 1);
        assert_eq!(titles(&listing), vec!["A", "B", "C", "D"]);
        assert_eq!(listing.next_page(), Some("T3"));

        assert_eq!(*source.requested_tokens.lock().unwrap(), vec!["T1", "T2"]);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let source = StubSource::with_pages(
            page(vec![], None),
            vec![Ok(page(vec![post("a", "A")], None))],
        );
        let mut listing = Listing::initialize(page(vec![post("a", "A")], Some("T1")));

        listing.load_more(&source).await.unwrap();
        assert_eq!(titles(&listing), vec!["A", "A"]);
    }

    #[tokio::test]
    async fn test_end_to_end_single_post_pages() {
        let source = StubSource::with_pages(
            page(vec![], None),
            vec![Ok(page(vec![post("b", "B")], Some("")))],
        );
        let mut listing = Listing::initialize(page(vec![post("a", "A")], Some("T1")));

        listing.load_more(&source).await.unwrap();
        assert_eq!(listing.posts().len(), 2);
        assert_eq!(listing.next_page(), None);

        let before = listing.state().clone();
        assert!(matches!(
            listing.load_more(&source).await,
            Err(ListingError::Exhausted)
        ));
        assert_eq!(listing.state(), &before);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_listing_does_not_fetch() {
        let source = StubSource::default();
        let mut listing = Listing::initialize(page(vec![post("a", "A")], None));

        assert!(matches!(
            listing.load_more(&source).await,
            Err(ListingError::Exhausted)
        ));
        assert_eq!(source.fetch_count(), 0);
        assert_eq!(listing.posts().len(), 1);
        assert_eq!(listing.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_failed_load_leaves_state_unchanged() {
        let source = StubSource::with_pages(
            page(vec![], None),
            vec![
                Err(ContentError::Service {
                    status: 503,
                    message: "unavailable".to_string(),
                }),
                Ok(page(vec![post("b", "B")], None)),
            ],
        );
        let mut listing = Listing::initialize(page(vec![post("a", "A")], Some("T1")));
        let before = listing.state().clone();

        let err = listing.load_more(&source).await.unwrap_err();
        assert!(matches!(err, ListingError::Fetch(ContentError::Service { .. })));
        assert_eq!(listing.state(), &before);
        assert_eq!(listing.phase(), Phase::Idle);

        // Retrying uses the same token
        listing.load_more(&source).await.unwrap();
        assert_eq!(titles(&listing), vec!["A", "B"]);
        assert_eq!(*source.requested_tokens.lock().unwrap(), vec!["T1", "T1"]);
    }

    #[test]
    fn test_begin_load_rejects_second_load() {
        let mut listing = Listing::initialize(page(vec![post("a", "A")], Some("T1")));

        let ticket = listing.begin_load().unwrap();
        assert_eq!(ticket.token(), "T1");
        assert_eq!(listing.phase(), Phase::Loading);
        assert!(matches!(
            listing.begin_load(),
            Err(ListingError::AlreadyLoading)
        ));

        listing.abandon_load(ticket);
        assert_eq!(listing.phase(), Phase::Idle);
        assert_eq!(listing.next_page(), Some("T1"));
    }

    #[test]
    fn test_complete_replaces_token() {
        let mut listing = Listing::initialize(page(vec![], Some("T1")));
        let ticket = listing.begin_load().unwrap();
        listing
            .complete_load(ticket, Ok(page(vec![post("b", "B")], Some("T9"))))
            .unwrap();
        assert_eq!(listing.next_page(), Some("T9"));
    }

    /// Holds every fetch until released
    struct GatedSource {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ContentSource for GatedSource {
        async fn fetch_page(&self, _: &str, _: usize) -> Result<Page<RawEntry>, ContentError> {
            unreachable!()
        }

        async fn fetch_next(&self, _: &str) -> Result<Page<RawEntry>, ContentError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(page(vec![post("b", "B")], None))
        }

        async fn fetch_by_uid(&self, _: &str, _: &str) -> Result<RawEntry, ContentError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_shared_load_rejects_concurrent_call() {
        let listing = Arc::new(Mutex::new(Listing::initialize(page(
            vec![post("a", "A")],
            Some("T1"),
        ))));
        let source = Arc::new(GatedSource {
            entered: Notify::new(),
            release: Notify::new(),
        });

        let first = {
            let listing = listing.clone();
            let source = source.clone();
            tokio::spawn(async move { load_more_shared(&listing, source.as_ref()).await })
        };
        source.entered.notified().await;

        let second = load_more_shared(&listing, source.as_ref()).await;
        assert!(matches!(second, Err(ListingError::AlreadyLoading)));

        source.release.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), 1);

        let listing = listing.lock().unwrap();
        assert_eq!(titles(&listing), vec!["A", "B"]);
        assert_eq!(listing.next_page(), None);
        assert_eq!(listing.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_dropped_shared_load_returns_to_idle() {
        let listing = Mutex::new(Listing::initialize(page(vec![post("a", "A")], Some("T1"))));
        let source = GatedSource {
            entered: Notify::new(),
            release: Notify::new(),
        };

        {
            let load = load_more_shared(&listing, &source);
            tokio::pin!(load);
            tokio::select! {
                _ = &mut load => panic!("gated fetch finished"),
                _ = source.entered.notified() => {}
            }
            assert_eq!(listing.lock().unwrap().phase(), Phase::Loading);
        }

        let listing = listing.lock().unwrap();
        assert_eq!(listing.phase(), Phase::Idle);
        assert_eq!(listing.posts().len(), 1);
        assert_eq!(listing.next_page(), Some("T1"));
    }
}
