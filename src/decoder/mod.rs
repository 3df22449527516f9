//! Token decoding: scheme marker, base45, zlib, then COSE_Sign1.
//!
//! Each stage fails closed and hands nothing to the next stage on error.

pub mod base45;
mod error;
pub mod zlib;

pub use error::DecodeError;

use serde::{Deserialize, Serialize};

use crate::cose::sign1::SignedStructure;

/// Scheme marker of a version 1 health certificate.
pub const PREFIX: &str = "HC1:";

/// Default cap on the inflated COSE structure.
pub const DEFAULT_MAX_DECOMPRESSED_LEN: usize = 1 << 20;

/// How a token without the [`PREFIX`] is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefixPolicy {
    /// The marker is stripped when present; bare base45 is accepted.
    #[default]
    Optional,
    /// A token without the marker is rejected.
    Required,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    pub prefix: PrefixPolicy,
    pub max_decompressed_len: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            prefix: PrefixPolicy::default(),
            max_decompressed_len: DEFAULT_MAX_DECOMPRESSED_LEN,
        }
    }
}

/// Decode a scanned token into its signed structure.
pub fn decode(token: &str, options: &DecodeOptions) -> Result<SignedStructure, DecodeError> {
    let body = strip_prefix(token.trim_end_matches(['\r', '\n']), options.prefix)?;
    let compressed = base45::decode(body)?;
    let cose = zlib::decompress(&compressed, options.max_decompressed_len)?;
    SignedStructure::from_slice(&cose)
}

/// Produce a token from encoded COSE_Sign1 bytes.
pub fn encode(cose: &[u8]) -> std::io::Result<String> {
    let compressed = zlib::compress(cose)?;
    Ok(format!("{PREFIX}{}", base45::encode(&compressed)))
}

fn strip_prefix(token: &str, policy: PrefixPolicy) -> Result<&str, DecodeError> {
    if let Some(body) = token.strip_prefix(PREFIX) {
        return Ok(body);
    }
    if looks_like_marker(token) {
        return Err(DecodeError::InvalidEncoding(format!(
            "unknown scheme marker {:?}",
            &token[..PREFIX.len()]
        )));
    }
    match policy {
        PrefixPolicy::Optional => Ok(token),
        PrefixPolicy::Required => Err(DecodeError::InvalidEncoding(format!(
            "missing {PREFIX} scheme marker"
        ))),
    }
}

// "HC<digit>:" in any case.
fn looks_like_marker(token: &str) -> bool {
    match token.as_bytes() {
        [h, c, d, b':', ..] => {
            h.eq_ignore_ascii_case(&b'H') && c.eq_ignore_ascii_case(&b'C') && d.is_ascii_digit()
        }
        _ => false,
    }
}
