use std::collections::BTreeMap;

use coset::iana;
use serde::{Deserialize, Serialize};

use super::{util::key_algorithm, CertificateWithDer};
use crate::trust::TrustError;

/// Signing algorithm bound to an issuer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// ECDSA over P-256 with SHA-256.
    Es256,
    /// RSASSA-PSS with SHA-256.
    Ps256,
}

impl KeyAlgorithm {
    pub fn cose_algorithm(&self) -> iana::Algorithm {
        match self {
            KeyAlgorithm::Es256 => iana::Algorithm::ES256,
            KeyAlgorithm::Ps256 => iana::Algorithm::PS256,
        }
    }
}

/// An issuer certificate trusted to sign health certificates under `key_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    pub key_id: Vec<u8>,
    pub algorithm: KeyAlgorithm,
    pub certificate: CertificateWithDer,
}

impl TrustAnchor {
    /// Bind a certificate to a key identifier, deriving the algorithm from its key.
    pub fn new(key_id: Vec<u8>, certificate: CertificateWithDer) -> Result<Self, TrustError> {
        let algorithm =
            key_algorithm(&certificate.inner).ok_or_else(|| TrustError::InvalidCertificate {
                key_id: base64::encode(&key_id),
                reason: "unsupported public key type".into(),
            })?;
        Ok(Self {
            key_id,
            algorithm,
            certificate,
        })
    }
}

/// A fixed set of trust anchors, looked up by key identifier.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchorRegistry {
    anchors: BTreeMap<Vec<u8>, TrustAnchor>,
}

impl TrustAnchorRegistry {
    pub fn new(anchors: impl IntoIterator<Item = TrustAnchor>) -> Self {
        Self {
            anchors: anchors
                .into_iter()
                .map(|anchor| (anchor.key_id.clone(), anchor))
                .collect(),
        }
    }

    pub fn insert(&mut self, anchor: TrustAnchor) -> Option<TrustAnchor> {
        self.anchors.insert(anchor.key_id.clone(), anchor)
    }

    pub fn get(&self, key_id: &[u8]) -> Option<&TrustAnchor> {
        self.anchors.get(key_id)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}
