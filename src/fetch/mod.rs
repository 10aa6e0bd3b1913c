//! Feed client: one asynchronous GET per call, yielding the raw body text.
//!
//! No retries and no timeout policy live here; both belong to the transport.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;

/// Fetches a feed body by URL.
///
/// Invocations are independent of each other, so implementations must not
/// share mutable per-request state.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// [`FeedClient`] backed by any [`HttpClient`].
pub struct HttpFeedClient<C> {
    inner: C,
}

impl<C: HttpClient> HttpFeedClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl Default for HttpFeedClient<BasicClient> {
    fn default() -> Self {
        Self::new(BasicClient::new())
    }
}

#[async_trait]
impl<C: HttpClient> FeedClient for HttpFeedClient<C> {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        fetch_text(&self.inner, url).await
    }
}

/// Issues a GET for `url` and returns the body as text.
///
/// Non-2xx responses are reported as [`FetchError::Status`].
pub async fn fetch_text<C: HttpClient>(client: &C, url: &str) -> Result<String, FetchError> {
    let parsed = url
        .parse::<reqwest::Url>()
        .map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    let body = resp.text().await?;
    debug!(bytes = body.len(), "Feed body received");
    Ok(body)
}
