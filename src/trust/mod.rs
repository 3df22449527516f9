//! Resolution of key identifiers to trusted signer certificates.
//!
//! [`TrustListResolver`] keeps a local copy of the authority's trust list in
//! two tiers, each refreshed on its own TTL:
//! - the status list of key ids currently authorized;
//! - the certificate map from key id to signer certificate.
//!
//! A key id must be in both to resolve. Refreshes are serialized; while one
//! is running, other callers keep using the last snapshot if there is one.
//! When a refresh fails the last good copy keeps being served.

mod authority;
mod cache;
mod error;
mod http;
#[cfg(feature = "reqwest")]
mod reqwest_client;

pub use authority::{TrustAuthority, KID_HEADER, RESUME_TOKEN_HEADER};
pub use cache::{Cached, TrustCache};
pub use error::{FetchError, TrustError};
pub use http::{HttpClient, HttpRequest, HttpResponse, NoHttpClientError};
#[cfg(feature = "reqwest")]
pub use reqwest_client::ReqwestClient;

use std::{
    collections::{BTreeMap, BTreeSet},
    io,
    sync::{Arc, PoisonError, RwLock},
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::{
    definitions::x509::{CertificateWithDer, TrustAnchor, TrustAnchorRegistry},
    settings::TrustSettings,
};

/// Anything able to map a key identifier to a trust anchor.
#[async_trait]
pub trait TrustAnchorSource: Send + Sync {
    async fn resolve(&self, key_id: &[u8]) -> Result<TrustAnchor, TrustError>;
}

#[async_trait]
impl TrustAnchorSource for TrustAnchorRegistry {
    async fn resolve(&self, key_id: &[u8]) -> Result<TrustAnchor, TrustError> {
        self.get(key_id)
            .cloned()
            .ok_or_else(|| TrustError::UnknownKey {
                key_id: base64::encode(key_id),
            })
    }
}

type StatusList = BTreeSet<String>;
type CertificateMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Default)]
struct Snapshot {
    status: Option<Arc<Cached<StatusList>>>,
    certificates: Option<Arc<Cached<CertificateMap>>>,
}

impl Snapshot {
    fn is_fresh(&self, ttl: Duration) -> bool {
        is_fresh(&self.status, ttl) && is_fresh(&self.certificates, ttl)
    }

    fn is_usable(&self) -> bool {
        self.status.is_some() && self.certificates.is_some()
    }

    fn lookup(&self, key_id: &[u8]) -> Result<TrustAnchor, TrustError> {
        let (Some(status), Some(certificates)) = (&self.status, &self.certificates) else {
            return Err(TrustError::RefreshFailed(
                "no trust list has been downloaded".into(),
            ));
        };

        let kid = base64::encode(key_id);
        if !status.data.contains(&kid) {
            return Err(TrustError::NotAuthorized { key_id: kid });
        }
        let encoded = certificates
            .data
            .get(&kid)
            .ok_or_else(|| TrustError::UnknownKey {
                key_id: kid.clone(),
            })?;
        let certificate =
            CertificateWithDer::from_base64(encoded).map_err(|e| TrustError::InvalidCertificate {
                key_id: kid,
                reason: e.to_string(),
            })?;
        TrustAnchor::new(key_id.to_vec(), certificate)
    }
}

fn is_fresh<T>(tier: &Option<Arc<Cached<T>>>, ttl: Duration) -> bool {
    tier.as_ref().is_some_and(|cached| cached.is_fresh(ttl))
}

/// Trust anchors backed by the remote authority and a local cache.
pub struct TrustListResolver<C> {
    authority: TrustAuthority<C>,
    cache: TrustCache,
    ttl: Duration,
    snapshot: RwLock<Snapshot>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl<C: HttpClient> TrustListResolver<C> {
    /// Load whatever is cached on disk. Nothing is downloaded until the first
    /// lookup or [`refresh`](Self::refresh).
    pub fn open(client: C, settings: &TrustSettings) -> Self {
        let cache = TrustCache::new(&settings.cache_dir, &settings.country);
        let snapshot = Snapshot {
            status: load_tier(cache.load_status(), "status list"),
            certificates: load_tier(cache.load_certificates(), "certificate map"),
        };
        debug!(
            "opened trust cache in {} (usable: {})",
            settings.cache_dir.display(),
            snapshot.is_usable()
        );

        Self {
            authority: TrustAuthority::new(client, settings),
            cache,
            ttl: settings.ttl(),
            snapshot: RwLock::new(snapshot),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub async fn resolve(&self, key_id: &[u8]) -> Result<TrustAnchor, TrustError> {
        self.ensure_fresh().await?;
        self.snapshot().lookup(key_id)
    }

    /// Download both tiers regardless of their age. Unlike [`resolve`](Self::resolve),
    /// a failed download is reported even when a cached tier remains in use.
    pub async fn refresh(&self) -> Result<(), TrustError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked(true).await
    }

    /// Number of authorized key ids and of known certificates.
    pub fn counts(&self) -> (usize, usize) {
        let snapshot = self.snapshot();
        (
            snapshot.status.as_ref().map_or(0, |s| s.data.len()),
            snapshot.certificates.as_ref().map_or(0, |c| c.data.len()),
        )
    }

    pub fn cache(&self) -> &TrustCache {
        &self.cache
    }

    fn snapshot(&self) -> Snapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, snapshot: Snapshot) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    async fn ensure_fresh(&self) -> Result<(), TrustError> {
        if self.snapshot().is_fresh(self.ttl) {
            debug!("trust list cache hit");
            return Ok(());
        }

        match self.refresh_lock.try_lock() {
            Ok(_guard) => self.refresh_locked(false).await,
            Err(_) if self.snapshot().is_usable() => {
                debug!("trust list refresh in flight, using last snapshot");
                Ok(())
            }
            Err(_) => {
                let _guard = self.refresh_lock.lock().await;
                self.refresh_locked(false).await
            }
        }
    }

    /// Must be called with `refresh_lock` held.
    async fn refresh_locked(&self, force: bool) -> Result<(), TrustError> {
        let mut snapshot = self.snapshot();
        let mut failures = Vec::new();

        if force || !is_fresh(&snapshot.status, self.ttl) {
            debug!("trust list status stale, fetching");
            match self.authority.fetch_status().await {
                Ok(status) => {
                    let fetched_at = self.persist(self.cache.store_status(&status));
                    info!("fetched {} authorized key ids", status.len());
                    snapshot.status = Some(Arc::new(Cached {
                        data: status,
                        fetched_at,
                    }));
                    self.publish(snapshot.clone());
                }
                Err(e) if snapshot.status.is_some() => {
                    warn!("status list refresh failed, using cached list: {e}");
                    failures.push(format!("status list: {e}"));
                }
                Err(e) => {
                    error!("status list refresh failed and nothing is cached: {e}");
                    return Err(TrustError::RefreshFailed(e.to_string()));
                }
            }
        }

        if force || !is_fresh(&snapshot.certificates, self.ttl) {
            debug!("trust list certificates stale, fetching");
            match self.authority.fetch_certificates().await {
                Ok(certificates) => {
                    let fetched_at = self.persist(self.cache.store_certificates(&certificates));
                    info!("fetched {} signer certificates", certificates.len());
                    snapshot.certificates = Some(Arc::new(Cached {
                        data: certificates,
                        fetched_at,
                    }));
                    self.publish(snapshot);
                }
                Err(e) if snapshot.certificates.is_some() => {
                    warn!("certificate refresh failed, using cached certificates: {e}");
                    failures.push(format!("certificates: {e}"));
                }
                Err(e) => {
                    error!("certificate refresh failed and nothing is cached: {e}");
                    return Err(TrustError::RefreshFailed(e.to_string()));
                }
            }
        }

        if force && !failures.is_empty() {
            return Err(TrustError::RefreshFailed(failures.join("; ")));
        }
        Ok(())
    }

    /// A write failure keeps the fresh data in memory only.
    fn persist(&self, written: io::Result<SystemTime>) -> SystemTime {
        written.unwrap_or_else(|e| {
            warn!(
                "could not write trust cache in {}: {e}",
                self.cache.dir().display()
            );
            SystemTime::now()
        })
    }
}

fn load_tier<T>(loaded: io::Result<Option<Cached<T>>>, name: &str) -> Option<Arc<Cached<T>>> {
    match loaded {
        Ok(cached) => cached.map(Arc::new),
        Err(e) => {
            warn!("could not read cached {name}: {e}");
            None
        }
    }
}

#[async_trait]
impl<C: HttpClient> TrustAnchorSource for TrustListResolver<C> {
    async fn resolve(&self, key_id: &[u8]) -> Result<TrustAnchor, TrustError> {
        TrustListResolver::resolve(self, key_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::definitions::x509::test;

    const STATUS_URL: &str = "http://authority.test/status";
    const UPDATE_URL: &str = "http://authority.test/update";

    #[derive(Default)]
    struct MockAuthority {
        status: Vec<String>,
        pages: Vec<(String, String)>,
        endless: bool,
        offline: AtomicBool,
        status_calls: AtomicUsize,
        update_calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpClient for MockAuthority {
        type Error = io::Error;

        async fn request(&self, request: HttpRequest) -> Result<HttpResponse, Self::Error> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if self.offline.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "offline"));
            }

            if request.url == STATUS_URL {
                self.status_calls.fetch_add(1, Ordering::SeqCst);
                return Ok(HttpResponse {
                    status: 200,
                    headers: vec![],
                    body: serde_json::to_vec(&self.status).unwrap(),
                });
            }

            self.update_calls.fetch_add(1, Ordering::SeqCst);
            let index: usize = request
                .headers
                .iter()
                .find(|(name, _)| name == RESUME_TOKEN_HEADER)
                .map(|(_, token)| token.parse().unwrap())
                .unwrap_or(0);
            let page = if self.endless {
                Some((format!("kid{index}"), "MIIB".to_string()))
            } else {
                self.pages.get(index).cloned()
            };
            Ok(match page {
                Some((kid, certificate)) => HttpResponse {
                    status: 200,
                    headers: vec![
                        (KID_HEADER.into(), kid),
                        (RESUME_TOKEN_HEADER.into(), (index + 1).to_string()),
                    ],
                    body: certificate.into_bytes(),
                },
                None => HttpResponse {
                    status: 204,
                    headers: vec![],
                    body: vec![],
                },
            })
        }
    }

    fn settings(dir: &std::path::Path, ttl_hours: u64) -> TrustSettings {
        TrustSettings {
            status_url: STATUS_URL.into(),
            update_url: UPDATE_URL.into(),
            cache_dir: dir.to_path_buf(),
            ttl_hours,
            max_pages: 5,
            ..Default::default()
        }
    }

    fn certificate() -> String {
        base64::encode(test::p256_certificate().1.der())
    }

    /// `kid-1` authorized with a certificate, `kid-2` only has a certificate,
    /// `kid-3` is only authorized.
    fn authority() -> Arc<MockAuthority> {
        Arc::new(MockAuthority {
            status: vec![base64::encode(b"kid-1"), base64::encode(b"kid-3")],
            pages: vec![
                (base64::encode(b"kid-1"), certificate()),
                (base64::encode(b"kid-2"), certificate()),
            ],
            ..Default::default()
        })
    }

    #[test_log::test(tokio::test)]
    async fn warm_cache_resolves_without_remote_calls() {
        let dir = tempfile::tempdir().unwrap();
        let authority = authority();
        let resolver = TrustListResolver::open(authority.clone(), &settings(dir.path(), 24));

        let anchor = resolver.resolve(b"kid-1").await.unwrap();
        assert_eq!(anchor.key_id, b"kid-1");
        assert_eq!(authority.status_calls.load(Ordering::SeqCst), 1);
        assert_eq!(authority.update_calls.load(Ordering::SeqCst), 3);

        resolver.resolve(b"kid-1").await.unwrap();
        assert_eq!(authority.status_calls.load(Ordering::SeqCst), 1);
        assert_eq!(authority.update_calls.load(Ordering::SeqCst), 3);

        // A second process finds the files on disk.
        let reopened = TrustListResolver::open(authority.clone(), &settings(dir.path(), 24));
        reopened.resolve(b"kid-1").await.unwrap();
        assert_eq!(authority.status_calls.load(Ordering::SeqCst), 1);
        assert_eq!(reopened.counts(), (2, 2));
    }

    #[test_log::test(tokio::test)]
    async fn certificate_without_status_is_not_authorized() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = TrustListResolver::open(authority(), &settings(dir.path(), 24));
        assert_eq!(
            resolver.resolve(b"kid-2").await,
            Err(TrustError::NotAuthorized {
                key_id: base64::encode(b"kid-2")
            })
        );
    }

    #[test_log::test(tokio::test)]
    async fn status_without_certificate_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = TrustListResolver::open(authority(), &settings(dir.path(), 24));
        assert_eq!(
            resolver.resolve(b"kid-3").await,
            Err(TrustError::UnknownKey {
                key_id: base64::encode(b"kid-3")
            })
        );
    }

    #[test_log::test(tokio::test)]
    async fn refresh_fails_without_authority_or_cache() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = TrustListResolver::open((), &settings(dir.path(), 24));
        assert!(matches!(
            resolver.resolve(b"kid-1").await,
            Err(TrustError::RefreshFailed(_))
        ));
    }

    #[test_log::test(tokio::test)]
    async fn failed_refresh_falls_back_to_last_good_cache() {
        let dir = tempfile::tempdir().unwrap();
        let authority = authority();
        TrustListResolver::open(authority.clone(), &settings(dir.path(), 24))
            .refresh()
            .await
            .unwrap();
        let cache = TrustCache::new(dir.path(), "IT");
        let status = std::fs::read(cache.status_path()).unwrap();
        let certificates = std::fs::read(cache.certificates_path()).unwrap();

        authority.offline.store(true, Ordering::SeqCst);
        let stale = TrustListResolver::open(authority.clone(), &settings(dir.path(), 0));
        stale.resolve(b"kid-1").await.unwrap();

        // An explicit refresh reports the outage but keeps serving the cache.
        assert!(matches!(
            stale.refresh().await,
            Err(TrustError::RefreshFailed(_))
        ));
        stale.resolve(b"kid-1").await.unwrap();
        assert_eq!(stale.counts(), (2, 2));

        assert_eq!(std::fs::read(cache.status_path()).unwrap(), status);
        assert_eq!(std::fs::read(cache.certificates_path()).unwrap(), certificates);
    }

    #[test_log::test(tokio::test)]
    async fn endless_pagination_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let authority = Arc::new(MockAuthority {
            status: vec![base64::encode(b"kid-1")],
            endless: true,
            ..Default::default()
        });
        let resolver = TrustListResolver::open(authority.clone(), &settings(dir.path(), 24));

        assert!(matches!(
            resolver.resolve(b"kid-1").await,
            Err(TrustError::RefreshFailed(_))
        ));
        assert_eq!(authority.update_calls.load(Ordering::SeqCst), 5);
        assert!(!TrustCache::new(dir.path(), "IT").certificates_path().exists());
    }

    #[test_log::test(tokio::test)]
    async fn concurrent_lookups_share_one_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let authority = authority();
        let resolver = Arc::new(TrustListResolver::open(
            authority.clone(),
            &settings(dir.path(), 24),
        ));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let resolver = resolver.clone();
                tokio::spawn(async move { resolver.resolve(b"kid-1").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(authority.status_calls.load(Ordering::SeqCst), 1);
        assert_eq!(authority.update_calls.load(Ordering::SeqCst), 3);
    }

    #[test_log::test(tokio::test)]
    async fn static_registry_resolves_known_keys() {
        let (_, certificate) = test::p256_certificate();
        let registry =
            TrustAnchorRegistry::new([TrustAnchor::new(b"kid".to_vec(), certificate).unwrap()]);
        assert!(TrustAnchorSource::resolve(&registry, b"kid").await.is_ok());
        assert!(matches!(
            TrustAnchorSource::resolve(&registry, b"other").await,
            Err(TrustError::UnknownKey { .. })
        ));
    }
}
