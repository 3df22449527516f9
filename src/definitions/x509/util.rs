use anyhow::{Context, Error};
use const_oid::{
    db::rfc5912::{ID_EC_PUBLIC_KEY, ID_RSASSA_PSS, RSA_ENCRYPTION, SECP_256_R_1},
    AssociatedOid, ObjectIdentifier,
};
use der::{referenced::OwnedToRef, Encode};
use ecdsa::{PrimeCurve, VerifyingKey};
use elliptic_curve::{
    sec1::{FromEncodedPoint, ToEncodedPoint},
    AffinePoint, CurveArithmetic, FieldBytesSize, PublicKey,
};
use rsa::{pkcs1::DecodeRsaPublicKey, pkcs8::DecodePublicKey, RsaPublicKey};
use sec1::point::ModulusSize;
use x509_cert::Certificate;

use super::trust_anchor::KeyAlgorithm;

/// Get the elliptic curve public key from a certificate for verification.
pub fn public_key<C>(certificate: &Certificate) -> Result<VerifyingKey<C>, Error>
where
    C: AssociatedOid + CurveArithmetic + PrimeCurve,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    certificate
        .tbs_certificate
        .subject_public_key_info
        .owned_to_ref()
        .try_into()
        .map(|key: PublicKey<C>| key.into())
        .context("could not parse public key from PKCS8 SPKI")
}

/// Get the RSA modulus and exponent from a certificate for verification.
pub fn rsa_public_key(certificate: &Certificate) -> Result<RsaPublicKey, Error> {
    let spki = &certificate.tbs_certificate.subject_public_key_info;
    if spki.algorithm.oid == ID_RSASSA_PSS {
        // Same PKCS#1 key body, under the RSASSA-PSS identifier.
        return RsaPublicKey::from_pkcs1_der(spki.subject_public_key.raw_bytes())
            .context("could not parse RSASSA-PSS public key from SPKI");
    }
    let der = spki.to_der().context("could not encode SPKI")?;
    RsaPublicKey::from_public_key_der(&der).context("could not parse RSA public key from SPKI")
}

/// The signing algorithm a certificate's key is meant for, from its SPKI.
pub fn key_algorithm(certificate: &Certificate) -> Option<KeyAlgorithm> {
    let spki = &certificate.tbs_certificate.subject_public_key_info;
    let oid = spki.algorithm.oid;
    if oid == ID_EC_PUBLIC_KEY {
        let curve = spki
            .algorithm
            .parameters
            .as_ref()
            .and_then(|p| p.decode_as::<ObjectIdentifier>().ok());
        (curve == Some(SECP_256_R_1)).then_some(KeyAlgorithm::Es256)
    } else if oid == RSA_ENCRYPTION || oid == ID_RSASSA_PSS {
        Some(KeyAlgorithm::Ps256)
    } else {
        None
    }
}
