use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use ciborium::Value;
use coset::{iana, CoseSign1Builder, HeaderBuilder, TaggedCborSerializable};
use p256::NistP256;
use signature::Signer;
use x509_cert::{
    builder::{Builder, CertificateBuilder, Profile},
    der::Encode,
    serial_number::SerialNumber,
    spki::{SignatureBitStringEncoding, SubjectPublicKeyInfoOwned},
    time::Validity,
};

use greenpass::definitions::x509::{CertificateWithDer, TrustAnchor};

#[allow(dead_code)]
fn main() {}

/// A document signer with a self-issued certificate.
#[allow(dead_code)]
pub struct Issuer {
    pub key_id: Vec<u8>,
    pub key: p256::ecdsa::SigningKey,
    pub certificate: CertificateWithDer,
}

#[allow(dead_code)]
impl Issuer {
    pub fn new(key_id: &[u8]) -> Result<Self> {
        let key = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let spki = SubjectPublicKeyInfoOwned::from_key(p256::ecdsa::VerifyingKey::from(&key))
            .context("could not encode public key")?;
        let mut builder = CertificateBuilder::new(
            Profile::Root,
            SerialNumber::from(rand::random::<u64>()),
            Validity::from_now(Duration::from_secs(3600))?,
            "CN=DSC,O=Ministero della Salute,C=IT".parse()?,
            spki,
            &key,
        )
        .context("could not prepare certificate")?;
        let tbs = builder.finalize()?;
        let signature: ecdsa::Signature<NistP256> = key.sign(&tbs);
        let certificate = builder
            .assemble(signature.to_der().to_bitstring()?)
            .context("could not assemble certificate")?;
        let certificate = CertificateWithDer::from_der(&certificate.to_der()?)?;
        Ok(Self {
            key_id: key_id.to_vec(),
            key,
            certificate,
        })
    }

    pub fn anchor(&self) -> Result<TrustAnchor> {
        TrustAnchor::new(self.key_id.clone(), self.certificate.clone())
            .map_err(|e| anyhow!("could not build trust anchor: {e}"))
    }

    /// Base64 key id, as the trust list authority names it.
    pub fn kid(&self) -> String {
        base64::encode(&self.key_id)
    }

    /// Base64 DER, as the trust list authority serves it.
    pub fn certificate_base64(&self) -> String {
        base64::encode(self.certificate.der())
    }

    /// Sign `hcert` and encode it as an `HC1:` token.
    pub fn token(&self, hcert: Value) -> Result<String> {
        let cose = self
            .sign(hcert)?
            .to_tagged_vec()
            .map_err(|e| anyhow!("could not encode COSE_Sign1: {e:?}"))?;
        Ok(greenpass::decoder::encode(&cose)?)
    }

    pub fn sign(&self, hcert: Value) -> Result<coset::CoseSign1> {
        let payload = greenpass::cbor::to_vec(&claims(hcert))?;
        Ok(CoseSign1Builder::new()
            .protected(
                HeaderBuilder::new()
                    .algorithm(iana::Algorithm::ES256)
                    .key_id(self.key_id.clone())
                    .build(),
            )
            .payload(payload)
            .create_signature(&[], |data| {
                let signature: p256::ecdsa::Signature = self.key.sign(data);
                signature.to_bytes().to_vec()
            })
            .build())
    }
}

/// The CWT claims wrapping an EU DCC v1 health certificate.
#[allow(dead_code)]
pub fn claims(hcert: Value) -> Value {
    Value::Map(vec![
        (Value::Integer(1.into()), Value::Text("IT".into())),
        (Value::Integer(4.into()), Value::Integer(1_900_000_000.into())),
        (Value::Integer(6.into()), Value::Integer(1_620_000_000.into())),
        (
            Value::Integer((-260).into()),
            Value::Map(vec![(Value::Integer(1.into()), hcert)]),
        ),
    ])
}

/// A single vaccination entry for an adult holder.
#[allow(dead_code)]
pub fn vaccination(product: &str, dose_given: u32, total_doses: u32, date: &str) -> Value {
    vaccination_entry(product, "840539006", dose_given, total_doses, date)
}

#[allow(dead_code)]
pub fn vaccination_entry(
    product: &str,
    disease: &str,
    dose_given: u32,
    total_doses: u32,
    date: &str,
) -> Value {
    Value::Map(vec![
        ("ver".into(), "1.3.0".into()),
        (
            "nam".into(),
            Value::Map(vec![
                ("fn".into(), "Rossi".into()),
                ("fnt".into(), "ROSSI".into()),
                ("gn".into(), "Mario".into()),
                ("gnt".into(), "MARIO".into()),
            ]),
        ),
        ("dob".into(), "1980-03-14".into()),
        (
            "v".into(),
            Value::Array(vec![Value::Map(vec![
                ("ci".into(), "URN:UVCI:01:IT:8F5C0A#2".into()),
                ("tg".into(), disease.into()),
                ("co".into(), "IT".into()),
                ("is".into(), "Ministero della Salute".into()),
                ("vp".into(), "1119349007".into()),
                ("mp".into(), product.into()),
                ("ma".into(), "ORG-100030215".into()),
                ("dn".into(), dose_given.into()),
                ("sd".into(), total_doses.into()),
                ("dt".into(), date.into()),
            ])]),
        ),
    ])
}

/// A test (not vaccination) certificate.
#[allow(dead_code)]
pub fn test_result() -> Value {
    Value::Map(vec![
        ("ver".into(), "1.3.0".into()),
        ("nam".into(), Value::Map(vec![("fnt".into(), "ROSSI".into())])),
        ("dob".into(), "1980-03-14".into()),
        (
            "t".into(),
            Value::Array(vec![Value::Map(vec![
                ("tg".into(), "840539006".into()),
                ("tt".into(), "LP6464-4".into()),
                ("tr".into(), "260415000".into()),
            ])]),
        ),
    ])
}

/// Encode an arbitrary CBOR value as a token, bypassing COSE.
#[allow(dead_code)]
pub fn raw_token(value: &Value) -> Result<String> {
    let bytes = greenpass::cbor::to_vec(value)?;
    Ok(greenpass::decoder::encode(&bytes)?)
}
