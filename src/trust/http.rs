//! HTTP client trait for talking to the trust list authority.

use async_trait::async_trait;

/// HTTP GET request to be sent by an HTTP client.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The URL to send the request to.
    pub url: String,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// HTTP response from an HTTP client.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers. The authority pages certificates through them.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// First value of a header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Low-level HTTP client trait.
///
/// This trait provides a pure HTTP interface with no knowledge of trust list
/// semantics. Pagination, timeouts and caching are layered on top by
/// [`TrustAuthority`](super::TrustAuthority) and
/// [`TrustListResolver`](super::TrustListResolver).
// TODO: Remove async_trait once edition is upgraded to one with async fn in
// dyn-compatible traits.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// The error type returned by this HTTP client.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send an HTTP request and return the response.
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, Self::Error>;
}

/// Error returned when using `()` as an HTTP client (offline mode).
#[derive(Debug, thiserror::Error)]
#[error("trust list download is disabled (no HTTP client configured)")]
pub struct NoHttpClientError;

/// Implementation of [`HttpClient`] for `()` that always returns an error.
///
/// With `()` the resolver runs on whatever cache is already on disk.
#[async_trait]
impl HttpClient for () {
    type Error = NoHttpClientError;

    async fn request(&self, _request: HttpRequest) -> Result<HttpResponse, Self::Error> {
        Err(NoHttpClientError)
    }
}

#[async_trait]
impl<T: HttpClient + ?Sized> HttpClient for std::sync::Arc<T> {
    type Error = T::Error;

    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, Self::Error> {
        (**self).request(request).await
    }
}
