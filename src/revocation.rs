//! Revoked certificate identifiers.
//!
//! The rule engine only needs [`RevocationList::is_revoked`]. [`RevocationStore`]
//! is an in-memory keyed set for callers without their own store; writes hold
//! an exclusive lock, so readers never see a bulk insert half applied.

use std::{
    collections::BTreeSet,
    sync::{PoisonError, RwLock},
};

use tracing::{debug, warn};

/// Lookup of revoked certificate identifiers.
pub trait RevocationList: Send + Sync {
    fn is_revoked(&self, certificate_id: &str) -> bool;
}

/// Implementation of [`RevocationList`] for `()` where nothing is revoked.
impl RevocationList for () {
    fn is_revoked(&self, _certificate_id: &str) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RevocationError {
    #[error("empty certificate identifier")]
    EmptyIdentifier,
}

fn checked(id: String) -> Result<String, RevocationError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(RevocationError::EmptyIdentifier);
    }
    Ok(if trimmed.len() == id.len() {
        id
    } else {
        trimmed.to_string()
    })
}

#[derive(Debug, Default)]
pub struct RevocationStore {
    revoked: RwLock<BTreeSet<String>>,
}

impl RevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert if absent. Returns whether the identifier was new.
    pub fn insert(&self, id: impl Into<String>) -> Result<bool, RevocationError> {
        let id = checked(id.into())?;
        Ok(self.write().insert(id))
    }

    /// Insert every valid identifier, ignoring duplicates. Empty identifiers
    /// are skipped. Returns how many were new.
    pub fn insert_all<I, S>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut revoked = self.write();
        let mut added = 0;
        for id in ids {
            match checked(id.into()) {
                Ok(id) => added += usize::from(revoked.insert(id)),
                Err(e) => warn!("skipping revocation entry: {e}"),
            }
        }
        debug!("added {added} revoked certificate ids");
        added
    }

    /// Insert all identifiers or none of them.
    pub fn insert_all_atomic<I, S>(&self, ids: I) -> Result<usize, RevocationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids = ids
            .into_iter()
            .map(|id| checked(id.into()))
            .collect::<Result<Vec<_>, _>>()?;
        let mut revoked = self.write();
        Ok(ids.into_iter().filter(|id| revoked.insert(id.clone())).count())
    }

    /// Returns whether the identifier was present.
    pub fn remove(&self, id: &str) -> bool {
        self.write().remove(id.trim())
    }

    pub fn list(&self) -> Vec<String> {
        self.read().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.write().clear()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeSet<String>> {
        self.revoked.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeSet<String>> {
        self.revoked.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RevocationList for RevocationStore {
    fn is_revoked(&self, certificate_id: &str) -> bool {
        self.read().contains(certificate_id.trim())
    }
}
