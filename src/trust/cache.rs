//! On-disk copy of the trust list.
//!
//! Each tier lives in its own JSON file and its age is the file's
//! modification time. Files are replaced atomically, so a failed download or
//! a crash mid-write leaves the previous copy intact.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

/// Cached data with the time it was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cached<T> {
    pub data: T,
    pub fetched_at: SystemTime,
}

impl<T> Cached<T> {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        match SystemTime::now().duration_since(self.fetched_at) {
            Ok(age) => age <= ttl,
            // Modified in the future, e.g. after a clock change.
            Err(_) => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrustCache {
    dir: PathBuf,
    country: String,
}

impl TrustCache {
    pub fn new(dir: impl Into<PathBuf>, country: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            country: country.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn status_path(&self) -> PathBuf {
        self.dir.join(format!("{}-gov-dgc-status.json", self.country))
    }

    pub fn certificates_path(&self) -> PathBuf {
        self.dir.join(format!("{}-gov-dgc-certs.json", self.country))
    }

    pub fn load_status(&self) -> io::Result<Option<Cached<BTreeSet<String>>>> {
        load(&self.status_path())
    }

    pub fn load_certificates(&self) -> io::Result<Option<Cached<BTreeMap<String, String>>>> {
        load(&self.certificates_path())
    }

    /// Returns the modification time of the written file.
    pub fn store_status(&self, status: &BTreeSet<String>) -> io::Result<SystemTime> {
        self.store(&self.status_path(), status)
    }

    pub fn store_certificates(
        &self,
        certificates: &BTreeMap<String, String>,
    ) -> io::Result<SystemTime> {
        self.store(&self.certificates_path(), certificates)
    }

    fn store<T: Serialize>(&self, path: &Path, data: &T) -> io::Result<SystemTime> {
        fs::create_dir_all(&self.dir)?;
        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        file.write_all(&serde_json::to_vec(data)?)?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| e.error)?;
        fs::metadata(path)?.modified()
    }
}

fn load<T: DeserializeOwned>(path: &Path) -> io::Result<Option<Cached<T>>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let fetched_at = fs::metadata(path)?.modified()?;
    match serde_json::from_slice(&bytes) {
        Ok(data) => Ok(Some(Cached { data, fetched_at })),
        Err(e) => {
            warn!("ignoring unreadable trust cache {}: {e}", path.display());
            Ok(None)
        }
    }
}
