use anyhow::{anyhow, Context, Result};
use x509_cert::{certificate::Certificate, der::Decode};

/// X.509 certificate with the DER representation held in memory for ease of serialization.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CertificateWithDer {
    pub inner: Certificate,
    der: Vec<u8>,
}

impl CertificateWithDer {
    pub fn from_pem(bytes: &[u8]) -> Result<Self> {
        let (label, der) = x509_cert::der::pem::decode_vec(bytes)
            .map_err(|e| anyhow!("unable to parse certificate from PEM encoding: {e}"))?;
        if label != "CERTIFICATE" {
            return Err(anyhow!("unexpected PEM label {label}"));
        }
        CertificateWithDer::from_der(&der)
    }

    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let inner = Certificate::from_der(bytes)
            .context("unable to parse certificate from DER encoding")?;
        Ok(Self {
            inner,
            der: bytes.to_vec(),
        })
    }

    /// Parse the base64 DER body served by the trust list authority.
    pub fn from_base64(text: &str) -> Result<Self> {
        let cleaned: String = text.split_whitespace().collect();
        let der = base64::decode(cleaned).context("certificate is not valid base64")?;
        CertificateWithDer::from_der(&der)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }
}
