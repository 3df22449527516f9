//! Trust list error types.

/// Why a key identifier could not be resolved to a trust anchor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrustError {
    /// The key is not in the authority's list of currently valid keys.
    #[error("key id {key_id} is not authorized")]
    NotAuthorized { key_id: String },
    /// The key is authorized but no certificate is known for it.
    #[error("no certificate for key id {key_id}")]
    UnknownKey { key_id: String },
    /// The trust list could not be downloaded and nothing is cached.
    #[error("trust list refresh failed: {0}")]
    RefreshFailed(String),
    #[error("no key id in the headers")]
    MissingKeyId,
    #[error("certificate for key id {key_id} is unusable: {reason}")]
    InvalidCertificate { key_id: String, reason: String },
}

/// Errors talking to the trust list authority.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{url} answered with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The authority kept handing out resume tokens.
    #[error("certificate list still incomplete after {0} pages")]
    PageLimit(usize),

    #[error("response from {url} has no {header} header")]
    MissingHeader { url: String, header: &'static str },

    #[error("unexpected response body from {url}: {reason}")]
    Body { url: String, reason: String },
}
