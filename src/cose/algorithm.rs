//! The two signature algorithms health certificates are issued with.

use coset::iana;
use p256::NistP256;
use rsa::RsaPublicKey;
use sha2::Sha256;
use signature::Verifier;
use x509_cert::Certificate;

use super::{SignatureAlgorithm, SignatureError};
use crate::definitions::x509::{
    util::{key_algorithm, public_key, rsa_public_key},
    KeyAlgorithm,
};

/// Verification key pulled out of an issuer certificate.
#[derive(Debug, Clone)]
pub enum PublicKey {
    P256(p256::ecdsa::VerifyingKey),
    Rsa(RsaPublicKey),
}

fn expect_key(certificate: &Certificate, expected: KeyAlgorithm) -> Result<(), SignatureError> {
    match key_algorithm(certificate) {
        Some(found) if found == expected => Ok(()),
        found => Err(SignatureError::AlgorithmMismatch {
            header: format!("{:?}", expected.cose_algorithm()),
            key: found
                .map(|alg| format!("{:?}", alg.cose_algorithm()))
                .unwrap_or_else(|| "unsupported".into()),
        }),
    }
}

/// ECDSA on P-256 with SHA-256, signature as the raw `r || s` pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct Es256;

impl SignatureAlgorithm for Es256 {
    fn algorithm(&self) -> iana::Algorithm {
        iana::Algorithm::ES256
    }

    fn extract_key(&self, certificate: &Certificate) -> Result<PublicKey, SignatureError> {
        expect_key(certificate, KeyAlgorithm::Es256)?;
        public_key::<NistP256>(certificate)
            .map(PublicKey::P256)
            .map_err(|e| SignatureError::PublicKey(e.to_string()))
    }

    fn verify(
        &self,
        key: &PublicKey,
        signed: &[u8],
        signature: &[u8],
    ) -> Result<(), SignatureError> {
        let PublicKey::P256(key) = key else {
            return Err(SignatureError::PublicKey("expected a P-256 key".into()));
        };
        let signature = p256::ecdsa::Signature::from_slice(signature)
            .map_err(|_| SignatureError::InvalidSignature)?;
        key.verify(signed, &signature)
            .map_err(|_| SignatureError::InvalidSignature)
    }
}

/// RSASSA-PSS with SHA-256 and MGF1-SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ps256;

impl SignatureAlgorithm for Ps256 {
    fn algorithm(&self) -> iana::Algorithm {
        iana::Algorithm::PS256
    }

    fn extract_key(&self, certificate: &Certificate) -> Result<PublicKey, SignatureError> {
        expect_key(certificate, KeyAlgorithm::Ps256)?;
        rsa_public_key(certificate)
            .map(PublicKey::Rsa)
            .map_err(|e| SignatureError::PublicKey(e.to_string()))
    }

    fn verify(
        &self,
        key: &PublicKey,
        signed: &[u8],
        signature: &[u8],
    ) -> Result<(), SignatureError> {
        let PublicKey::Rsa(key) = key else {
            return Err(SignatureError::PublicKey("expected an RSA key".into()));
        };
        let verifying_key = rsa::pss::VerifyingKey::<Sha256>::new(key.clone());
        let signature = rsa::pss::Signature::try_from(signature)
            .map_err(|_| SignatureError::InvalidSignature)?;
        verifying_key
            .verify(signed, &signature)
            .map_err(|_| SignatureError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::x509::test;

    #[test]
    fn keys_only_come_from_matching_certificates() {
        let (_, ec) = test::p256_certificate();
        let (_, rsa) = test::rsa_certificate();

        assert!(matches!(Es256.extract_key(&ec.inner), Ok(PublicKey::P256(_))));
        assert!(matches!(Ps256.extract_key(&rsa.inner), Ok(PublicKey::Rsa(_))));
        assert!(matches!(
            Es256.extract_key(&rsa.inner),
            Err(SignatureError::AlgorithmMismatch { .. })
        ));
        assert!(matches!(
            Ps256.extract_key(&ec.inner),
            Err(SignatureError::AlgorithmMismatch { .. })
        ));
    }

    #[test]
    fn short_signature_is_invalid() {
        let (_, ec) = test::p256_certificate();
        let key = Es256.extract_key(&ec.inner).unwrap();
        assert_eq!(
            Es256.verify(&key, b"data", &[0u8; 10]),
            Err(SignatureError::InvalidSignature)
        );
    }
}
