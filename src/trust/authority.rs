//! Client for the remote trust list authority.
//!
//! The authority serves two documents:
//! - a status list, a JSON array of the base64 key ids currently valid;
//! - the signer certificates, one per response, paged with the
//!   `X-RESUME-TOKEN` header and keyed by the `X-KID` response header. A
//!   non-200 answer after the first page means there is nothing left.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use tracing::debug;

use super::{
    error::FetchError,
    http::{HttpClient, HttpRequest, HttpResponse},
};
use crate::settings::TrustSettings;

pub const KID_HEADER: &str = "X-KID";
pub const RESUME_TOKEN_HEADER: &str = "X-RESUME-TOKEN";

pub struct TrustAuthority<C> {
    client: C,
    status_url: String,
    update_url: String,
    timeout: Duration,
    max_pages: usize,
}

impl<C: HttpClient> TrustAuthority<C> {
    pub fn new(client: C, settings: &TrustSettings) -> Self {
        Self {
            client,
            status_url: settings.status_url.clone(),
            update_url: settings.update_url.clone(),
            timeout: settings.request_timeout(),
            max_pages: settings.max_pages,
        }
    }

    /// Base64 key ids the authority currently considers valid.
    pub async fn fetch_status(&self) -> Result<BTreeSet<String>, FetchError> {
        let response = self.send(HttpRequest::get(&self.status_url)).await?;
        if response.status != 200 {
            return Err(FetchError::Status {
                url: self.status_url.clone(),
                status: response.status,
            });
        }
        serde_json::from_slice(&response.body).map_err(|e| FetchError::Body {
            url: self.status_url.clone(),
            reason: e.to_string(),
        })
    }

    /// Every signer certificate, as base64 DER keyed by base64 key id.
    pub async fn fetch_certificates(&self) -> Result<BTreeMap<String, String>, FetchError> {
        let mut certificates = BTreeMap::new();
        let mut resume_token: Option<String> = None;

        for page in 0..self.max_pages {
            let mut request = HttpRequest::get(&self.update_url);
            if let Some(token) = &resume_token {
                request = request.with_header(RESUME_TOKEN_HEADER, token.clone());
            }

            let response = self.send(request).await?;
            if response.status != 200 {
                if page == 0 {
                    return Err(FetchError::Status {
                        url: self.update_url.clone(),
                        status: response.status,
                    });
                }
                debug!(
                    "certificate list complete after {page} pages (HTTP {})",
                    response.status
                );
                return Ok(certificates);
            }

            let (kid, certificate) = self.certificate_page(&response)?;
            certificates.insert(kid, certificate);

            match response.header(RESUME_TOKEN_HEADER) {
                Some(token) => resume_token = Some(token.to_string()),
                None => {
                    debug!("certificate list complete after {} pages", page + 1);
                    return Ok(certificates);
                }
            }
        }

        Err(FetchError::PageLimit(self.max_pages))
    }

    fn certificate_page(&self, response: &HttpResponse) -> Result<(String, String), FetchError> {
        let kid = response
            .header(KID_HEADER)
            .ok_or_else(|| FetchError::MissingHeader {
                url: self.update_url.clone(),
                header: KID_HEADER,
            })?;
        let certificate =
            std::str::from_utf8(&response.body).map_err(|e| FetchError::Body {
                url: self.update_url.clone(),
                reason: e.to_string(),
            })?;
        Ok((kid.to_string(), certificate.trim().to_string()))
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        let url = request.url.clone();
        match tokio::time::timeout(self.timeout, self.client.request(request)).await {
            Err(_) => Err(FetchError::Timeout { url }),
            Ok(Err(e)) => Err(FetchError::Http {
                url,
                source: Box::new(e),
            }),
            Ok(Ok(response)) => Ok(response),
        }
    }
}
