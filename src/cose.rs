pub mod algorithm;
pub mod sign1;
mod verify;

pub use verify::{SignatureError, SignatureVerifier};

use coset::iana;
use x509_cert::Certificate;

use algorithm::PublicKey;

/// A COSE signature algorithm able to verify signatures made by the holder of
/// an issuer certificate.
///
/// Implementations are registered with a [`SignatureVerifier`] under
/// [`algorithm`](Self::algorithm).
pub trait SignatureAlgorithm: Send + Sync {
    fn algorithm(&self) -> iana::Algorithm;

    /// Pull the verification key for this algorithm out of a certificate.
    fn extract_key(&self, certificate: &Certificate) -> Result<PublicKey, SignatureError>;

    fn verify(&self, key: &PublicKey, signed: &[u8], signature: &[u8])
        -> Result<(), SignatureError>;
}
