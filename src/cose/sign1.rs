use ciborium::Value;
use coset::{AsCborValue, TaggedCborSerializable};
use serde::{Deserialize, Serialize};

use crate::cbor;
use crate::decoder::DecodeError;

/// CBOR tag of a COSE_Sign1 structure.
pub const COSE_SIGN1_TAG: u64 = 18;

/// Which header map may supply the algorithm and key identifier.
///
/// The protected header is covered by the signature, the unprotected one is not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderPolicy {
    /// Protected value if present, else the unprotected one.
    #[default]
    PreferProtected,
    /// Unprotected values are ignored.
    ProtectedOnly,
}

/// A decoded COSE_Sign1 with its payload claims.
///
/// The protected header and payload keep their original byte spans, so the
/// signed data is rebuilt from exactly what was received.
#[derive(Clone, Debug, PartialEq)]
pub struct SignedStructure {
    pub(crate) inner: coset::CoseSign1,
    claims: Vec<(Value, Value)>,
}

impl SignedStructure {
    /// Parse an encoded COSE_Sign1, optionally wrapped in tag 18.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = cbor::from_slice(bytes)?;
        let value = match value {
            Value::Tag(COSE_SIGN1_TAG, inner) => *inner,
            Value::Tag(tag, _) => {
                return Err(DecodeError::MalformedStructure(format!(
                    "unexpected tag {tag}, want {COSE_SIGN1_TAG}"
                )))
            }
            other => other,
        };

        match &value {
            Value::Array(items) if items.len() == 4 => {
                if !matches!(items[2], Value::Bytes(_)) {
                    return Err(DecodeError::MalformedStructure(
                        "payload is not a byte string".into(),
                    ));
                }
                if !matches!(items[3], Value::Bytes(_)) {
                    return Err(DecodeError::MalformedStructure(
                        "signature is not a byte string".into(),
                    ));
                }
            }
            Value::Array(items) => {
                return Err(DecodeError::MalformedStructure(format!(
                    "expected 4 elements, found {}",
                    items.len()
                )))
            }
            _ => {
                return Err(DecodeError::MalformedStructure(
                    "signed structure is not an array".into(),
                ))
            }
        }

        let inner = coset::CoseSign1::from_cbor_value(value)?;
        let payload = inner.payload.as_deref().unwrap_or_default();
        let claims = match cbor::from_slice::<Value>(payload)? {
            Value::Map(claims) => claims,
            _ => {
                return Err(DecodeError::MalformedStructure(
                    "payload is not a map".into(),
                ))
            }
        };

        Ok(Self { inner, claims })
    }

    /// Encode as a tagged COSE_Sign1.
    pub fn to_vec(&self) -> Result<Vec<u8>, cbor::CborError> {
        Ok(self.inner.clone().to_tagged_vec()?)
    }

    pub fn protected_bytes(&self) -> &[u8] {
        self.inner.protected.original_data.as_deref().unwrap_or_default()
    }

    pub fn unprotected(&self) -> &coset::Header {
        &self.inner.unprotected
    }

    pub fn payload_bytes(&self) -> &[u8] {
        self.inner.payload.as_deref().unwrap_or_default()
    }

    pub fn signature(&self) -> &[u8] {
        &self.inner.signature
    }

    /// The decoded payload map.
    pub fn claims(&self) -> &[(Value, Value)] {
        &self.claims
    }

    /// Header key `1`.
    pub fn algorithm(&self, policy: HeaderPolicy) -> Option<&coset::Algorithm> {
        let protected = self.inner.protected.header.alg.as_ref();
        let unprotected = self.inner.unprotected.alg.as_ref();
        if let (Some(p), Some(u)) = (protected, unprotected) {
            if p != u {
                tracing::warn!("conflicting algorithm in headers, protected {p:?} wins over {u:?}");
            }
        }
        match policy {
            HeaderPolicy::PreferProtected => protected.or(unprotected),
            HeaderPolicy::ProtectedOnly => protected,
        }
    }

    /// Header key `4`.
    pub fn key_id(&self, policy: HeaderPolicy) -> Option<&[u8]> {
        fn non_empty(kid: &Vec<u8>) -> Option<&[u8]> {
            (!kid.is_empty()).then_some(kid.as_slice())
        }
        let protected = non_empty(&self.inner.protected.header.key_id);
        let unprotected = non_empty(&self.inner.unprotected.key_id);
        if let (Some(p), Some(u)) = (protected, unprotected) {
            if p != u {
                tracing::warn!("conflicting key id in headers, protected one wins");
            }
        }
        match policy {
            HeaderPolicy::PreferProtected => protected.or(unprotected),
            HeaderPolicy::ProtectedOnly => protected,
        }
    }

    /// The `Sig_structure` that was signed:
    /// `["Signature1", protected, h'', payload]`.
    pub fn signed_bytes(&self) -> Vec<u8> {
        self.inner.tbs_data(&[])
    }
}
