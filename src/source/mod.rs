//! Content sources - where posts come from
//!
//! A [`ContentSource`] answers three questions: the first page of documents
//! of a type, the page behind a continuation token, and the document with a
//! given uid. [`PrismicClient`] answers them over the Prismic REST API.

mod prismic;

use async_trait::async_trait;
use thiserror::Error;

use crate::content::{Page, RawEntry};

pub use prismic::PrismicClient;

/// Failures while talking to the content repository
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("no {content_type} document with uid {uid:?}")]
    NotFound { content_type: String, uid: String },

    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error("content service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("malformed response from content service: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("repository did not advertise a master ref")]
    MissingMasterRef,

    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ContentError {
    /// The requested document does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// A failed exchange that may succeed if tried again later
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::MalformedResponse(_) | Self::MissingMasterRef => true,
            Self::Service { status, .. } => *status == 429 || *status >= 500,
            Self::NotFound { .. } | Self::InvalidUrl { .. } => false,
        }
    }
}

/// Read-only access to paged documents.
///
/// Implementations never retry; the caller decides what to do with a failure.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// First page of documents of `content_type`
    async fn fetch_page(
        &self,
        content_type: &str,
        page_size: usize,
    ) -> Result<Page<RawEntry>, ContentError>;

    /// Page identified by a continuation token from a previous page
    async fn fetch_next(&self, next_page: &str) -> Result<Page<RawEntry>, ContentError>;

    /// Document of `content_type` whose uid is `uid`
    async fn fetch_by_uid(&self, content_type: &str, uid: &str)
        -> Result<RawEntry, ContentError>;
}
