//! Prismic REST API client
//!
//! Every search is pinned to the repository's current master ref, read from
//! the API root before the search runs.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{ContentError, ContentSource};
use crate::config::CmsConfig;
use crate::content::{Page, RawEntry};
use crate::helpers::truncate;

/// API root response; only the refs are needed
#[derive(Debug, Deserialize)]
struct ApiInfo {
    #[serde(default)]
    refs: Vec<RefInfo>,
}

#[derive(Debug, Deserialize)]
struct RefInfo {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// A thin wrapper around reqwest for one Prismic repository
#[derive(Clone)]
pub struct PrismicClient {
    http: Client,
    endpoint: String,
    access_token: Option<String>,
    orderings: Option<String>,
}

impl PrismicClient {
    /// Creates a client for the repository at `config.endpoint` (the `/api/v2` root)
    pub fn new(config: &CmsConfig) -> Result<Self, ContentError> {
        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        Url::parse(&endpoint).map_err(|e| ContentError::InvalidUrl {
            url: endpoint.clone(),
            reason: e.to_string(),
        })?;

        let http = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
            orderings: config.orderings.clone().filter(|o| !o.is_empty()),
        })
    }

    /// Reads the ref every search must be pinned to
    async fn master_ref(&self) -> Result<String, ContentError> {
        let info: ApiInfo = self
            .send(self.authorized(self.http.get(&self.endpoint)))
            .await?;
        info.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or(ContentError::MissingMasterRef)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.query(&[("access_token", token)]),
            None => request,
        }
    }

    /// Runs a predicate query against the documents search endpoint
    async fn search(
        &self,
        predicate: String,
        page_size: usize,
    ) -> Result<Page<RawEntry>, ContentError> {
        let master_ref = self.master_ref().await?;

        let mut query = vec![
            ("ref", master_ref),
            ("q", predicate),
            ("pageSize", page_size.to_string()),
        ];
        if let Some(orderings) = &self.orderings {
            query.push(("orderings", orderings.clone()));
        }

        let url = format!("{}/documents/search", self.endpoint);
        self.send(self.authorized(self.http.get(url).query(&query)))
            .await
    }

    /// Sends a request and decodes a successful JSON body
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ContentError> {
        let response = request.send().await?;
        let status = response.status();
        // The query may carry the access token, so only the path is logged
        let path = response.url().path().to_string();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!("GET {} failed with {}", path, status);
            return Err(ContentError::Service {
                status: status.as_u16(),
                message: service_message(&body),
            });
        }

        tracing::debug!("GET {} ({})", path, status);
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn fetch_page(
        &self,
        content_type: &str,
        page_size: usize,
    ) -> Result<Page<RawEntry>, ContentError> {
        let predicate = format!(r#"[[at(document.type,"{}")]]"#, quote(content_type));
        let page = self.search(predicate, page_size).await?;
        tracing::debug!(
            "Fetched {} {} documents (more: {})",
            page.results.len(),
            content_type,
            page.has_next()
        );
        Ok(page)
    }

    async fn fetch_next(&self, next_page: &str) -> Result<Page<RawEntry>, ContentError> {
        let mut url = Url::parse(next_page).map_err(|e| ContentError::InvalidUrl {
            url: next_page.to_string(),
            reason: e.to_string(),
        })?;

        if let Some(token) = &self.access_token {
            if !url.query_pairs().any(|(key, _)| key == "access_token") {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }

        let page: Page<RawEntry> = self.send(self.http.get(url)).await?;
        tracing::debug!(
            "Fetched next page with {} documents (more: {})",
            page.results.len(),
            page.has_next()
        );
        Ok(page)
    }

    async fn fetch_by_uid(
        &self,
        content_type: &str,
        uid: &str,
    ) -> Result<RawEntry, ContentError> {
        let predicate = format!(
            r#"[[at(my.{}.uid,"{}")]]"#,
            content_type,
            quote(uid)
        );
        let page = self.search(predicate, 1).await?;
        page.results
            .into_iter()
            .next()
            .ok_or_else(|| ContentError::NotFound {
                content_type: content_type.to_string(),
                uid: uid.to_string(),
            })
    }
}

/// Escape a value placed inside a double-quoted predicate argument
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Pull a readable message out of an error body
fn service_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            ["message", "error"]
                .iter()
                .find_map(|key| json.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| truncate(body.trim(), 200, None))
}
