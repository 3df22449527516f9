//! Reqwest-based HTTP client for the trust list authority.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use super::{HttpClient, HttpRequest, HttpResponse};

/// Simple HTTP client implementation using reqwest.
///
/// ```ignore
/// use greenpass::trust::{ReqwestClient, TrustListResolver};
///
/// let http_client = ReqwestClient::new()?;
/// let resolver = TrustListResolver::open(http_client, &settings.trust);
/// ```
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a new ReqwestClient with default settings.
    ///
    /// Default timeout: 30 seconds
    pub fn new() -> anyhow::Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    type Error = reqwest::Error;

    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, Self::Error> {
        let mut req_builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            req_builder = req_builder.header(name, value);
        }

        let response = req_builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
