use std::collections::BTreeMap;

use coset::iana::{self, EnumI64};

use super::{
    algorithm::{Es256, Ps256},
    sign1::{HeaderPolicy, SignedStructure},
    SignatureAlgorithm,
};
use crate::definitions::x509::TrustAnchor;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("no signature algorithm in the headers")]
    MissingAlgorithm,
    #[error("header algorithm {header} does not match the {key} issuer key")]
    AlgorithmMismatch { header: String, key: String },
    #[error("unable to get public key from issuer certificate: {0}")]
    PublicKey(String),
    #[error("signature does not match")]
    InvalidSignature,
}

/// Verifies COSE_Sign1 signatures with a registry of algorithms, keyed by
/// their COSE identifier.
pub struct SignatureVerifier {
    algorithms: BTreeMap<i64, Box<dyn SignatureAlgorithm>>,
    policy: HeaderPolicy,
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self::new(HeaderPolicy::default())
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("algorithms", &self.algorithms.keys().collect::<Vec<_>>())
            .field("policy", &self.policy)
            .finish()
    }
}

impl SignatureVerifier {
    /// A verifier for ES256 and PS256.
    pub fn new(policy: HeaderPolicy) -> Self {
        let mut verifier = Self {
            algorithms: BTreeMap::new(),
            policy,
        };
        verifier.register(Es256);
        verifier.register(Ps256);
        verifier
    }

    /// Add an algorithm, replacing any registered under the same identifier.
    pub fn register(&mut self, algorithm: impl SignatureAlgorithm + 'static) {
        self.algorithms
            .insert(algorithm.algorithm().to_i64(), Box::new(algorithm));
    }

    pub fn supports(&self, algorithm: iana::Algorithm) -> bool {
        self.algorithms.contains_key(&algorithm.to_i64())
    }

    pub fn policy(&self) -> HeaderPolicy {
        self.policy
    }

    pub fn verify(
        &self,
        structure: &SignedStructure,
        anchor: &TrustAnchor,
    ) -> Result<(), SignatureError> {
        let algorithm = match structure.algorithm(self.policy) {
            Some(coset::Algorithm::Assigned(alg)) => *alg,
            Some(other) => return Err(SignatureError::UnsupportedAlgorithm(format!("{other:?}"))),
            None => return Err(SignatureError::MissingAlgorithm),
        };
        let implementation = self
            .algorithms
            .get(&algorithm.to_i64())
            .ok_or_else(|| SignatureError::UnsupportedAlgorithm(format!("{algorithm:?}")))?;

        let bound = anchor.algorithm.cose_algorithm();
        if algorithm != bound {
            return Err(SignatureError::AlgorithmMismatch {
                header: format!("{algorithm:?}"),
                key: format!("{bound:?}"),
            });
        }
        let key = implementation.extract_key(&anchor.certificate.inner)?;
        implementation
            .verify(&key, &structure.signed_bytes(), structure.signature())
            .inspect_err(|_| {
                tracing::warn!(
                    "signature verification failed for key id {}",
                    base64::encode(&anchor.key_id)
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cose::sign1::tests::payload;
    use crate::definitions::x509::{test, CertificateWithDer, KeyAlgorithm};
    use coset::{CoseSign1Builder, HeaderBuilder, TaggedCborSerializable};
    use rand::Rng;
    use sha2::Sha256;
    use signature::{RandomizedSigner, SignatureEncoding, Signer};

    fn es256_structure() -> (Vec<u8>, TrustAnchor) {
        let (key, certificate) = test::p256_certificate();
        let anchor = TrustAnchor::new(b"ec-kid".to_vec(), certificate).unwrap();
        let bytes = CoseSign1Builder::new()
            .protected(
                HeaderBuilder::new()
                    .algorithm(iana::Algorithm::ES256)
                    .key_id(anchor.key_id.clone())
                    .build(),
            )
            .payload(payload())
            .create_signature(&[], |data| {
                let signature: p256::ecdsa::Signature = key.sign(data);
                signature.to_vec()
            })
            .build()
            .to_tagged_vec()
            .unwrap();
        (bytes, anchor)
    }

    fn ps256_structure() -> (Vec<u8>, TrustAnchor) {
        ps256_structure_for(test::rsa_certificate())
    }

    fn ps256_structure_for(
        (key, certificate): (rsa::RsaPrivateKey, CertificateWithDer),
    ) -> (Vec<u8>, TrustAnchor) {
        let anchor = TrustAnchor::new(b"rsa-kid".to_vec(), certificate).unwrap();
        let signer = rsa::pss::BlindedSigningKey::<Sha256>::new(key);
        let bytes = CoseSign1Builder::new()
            .protected(
                HeaderBuilder::new()
                    .algorithm(iana::Algorithm::PS256)
                    .key_id(anchor.key_id.clone())
                    .build(),
            )
            .payload(payload())
            .create_signature(&[], |data| {
                signer
                    .sign_with_rng(&mut rand::thread_rng(), data)
                    .to_vec()
            })
            .build()
            .to_tagged_vec()
            .unwrap();
        (bytes, anchor)
    }

    fn flip_bit(bytes: &mut [u8]) {
        let mut rng = rand::thread_rng();
        let index = rng.gen_range(0..bytes.len());
        bytes[index] ^= 1 << rng.gen_range(0..8);
    }

    #[test]
    fn valid_signatures_verify() {
        let verifier = SignatureVerifier::default();
        for (bytes, anchor) in [es256_structure(), ps256_structure()] {
            let structure = SignedStructure::from_slice(&bytes).unwrap();
            verifier.verify(&structure, &anchor).unwrap();
        }
    }

    #[test]
    fn any_flipped_bit_invalidates_the_signature() {
        let verifier = SignatureVerifier::default();
        for (bytes, anchor) in [es256_structure(), ps256_structure()] {
            let original = SignedStructure::from_slice(&bytes).unwrap();

            let mut tampered = original.clone();
            flip_bit(&mut tampered.inner.signature);
            assert_eq!(
                verifier.verify(&tampered, &anchor),
                Err(SignatureError::InvalidSignature)
            );

            // The algorithm is read from the decoded header, so only the
            // signed bytes change.
            let mut tampered = original.clone();
            flip_bit(tampered.inner.protected.original_data.as_mut().unwrap());
            assert_eq!(
                verifier.verify(&tampered, &anchor),
                Err(SignatureError::InvalidSignature)
            );

            let mut tampered = original.clone();
            flip_bit(tampered.inner.payload.as_mut().unwrap());
            assert_eq!(
                verifier.verify(&tampered, &anchor),
                Err(SignatureError::InvalidSignature)
            );
        }
    }

    #[test]
    fn unknown_algorithm_is_unsupported() {
        let (_, certificate) = test::p256_certificate();
        let anchor = TrustAnchor::new(b"kid".to_vec(), certificate).unwrap();
        let bytes = CoseSign1Builder::new()
            .protected(HeaderBuilder::new().algorithm(iana::Algorithm::EdDSA).build())
            .payload(payload())
            .signature(vec![0; 64])
            .build()
            .to_tagged_vec()
            .unwrap();
        let structure = SignedStructure::from_slice(&bytes).unwrap();
        assert!(matches!(
            SignatureVerifier::default().verify(&structure, &anchor),
            Err(SignatureError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn missing_algorithm() {
        let (_, certificate) = test::p256_certificate();
        let anchor = TrustAnchor::new(b"kid".to_vec(), certificate).unwrap();
        let bytes = CoseSign1Builder::new()
            .payload(payload())
            .signature(vec![0; 64])
            .build()
            .to_tagged_vec()
            .unwrap();
        let structure = SignedStructure::from_slice(&bytes).unwrap();
        assert_eq!(
            SignatureVerifier::default().verify(&structure, &anchor),
            Err(SignatureError::MissingAlgorithm)
        );
    }

    #[test]
    fn header_algorithm_must_match_the_anchor() {
        let (bytes, _) = es256_structure();
        let (_, rsa) = test::rsa_certificate();
        let anchor = TrustAnchor::new(b"ec-kid".to_vec(), rsa).unwrap();
        let structure = SignedStructure::from_slice(&bytes).unwrap();
        assert!(matches!(
            SignatureVerifier::default().verify(&structure, &anchor),
            Err(SignatureError::AlgorithmMismatch { .. })
        ));
    }

    #[test]
    fn anchor_algorithm_binds_the_key() {
        let (bytes, anchor) = es256_structure();
        let structure = SignedStructure::from_slice(&bytes).unwrap();
        let rebound = TrustAnchor {
            algorithm: KeyAlgorithm::Ps256,
            ..anchor
        };
        assert_eq!(
            SignatureVerifier::default().verify(&structure, &rebound),
            Err(SignatureError::AlgorithmMismatch {
                header: "ES256".into(),
                key: "PS256".into(),
            })
        );
    }

    #[test]
    fn pss_keyed_issuer_verifies() {
        let (bytes, anchor) = ps256_structure_for(test::rsa_pss_certificate());
        assert_eq!(anchor.algorithm, KeyAlgorithm::Ps256);
        let structure = SignedStructure::from_slice(&bytes).unwrap();
        SignatureVerifier::default()
            .verify(&structure, &anchor)
            .unwrap();
    }

    #[test]
    fn protected_only_ignores_unprotected_algorithm() {
        let (key, certificate) = test::p256_certificate();
        let anchor = TrustAnchor::new(b"kid".to_vec(), certificate).unwrap();
        let bytes = CoseSign1Builder::new()
            .unprotected(HeaderBuilder::new().algorithm(iana::Algorithm::ES256).build())
            .payload(payload())
            .create_signature(&[], |data| {
                let signature: p256::ecdsa::Signature = key.sign(data);
                signature.to_vec()
            })
            .build()
            .to_tagged_vec()
            .unwrap();
        let structure = SignedStructure::from_slice(&bytes).unwrap();

        SignatureVerifier::new(HeaderPolicy::PreferProtected)
            .verify(&structure, &anchor)
            .unwrap();
        assert_eq!(
            SignatureVerifier::new(HeaderPolicy::ProtectedOnly).verify(&structure, &anchor),
            Err(SignatureError::MissingAlgorithm)
        );
        assert!(SignatureVerifier::default().supports(iana::Algorithm::PS256));
    }
}
