//! Projection of an authenticated payload into a typed health certificate.
//!
//! The payload is a CWT claims map. The health certificate sits under claim
//! `-260`, key `1`, and holds exactly one vaccination, test or recovery entry.

use ciborium::Value;
use serde::Deserialize;
use time::OffsetDateTime;

use super::{
    fulldate::BirthDate,
    holder::{Holder, Names},
    vaccination::VaccinationDose,
};
use crate::cbor;

pub const ISSUER_CLAIM: i128 = 1;
pub const EXPIRATION_CLAIM: i128 = 4;
pub const ISSUED_AT_CLAIM: i128 = 6;
pub const HEALTH_CERTIFICATE_CLAIM: i128 = -260;
pub const EU_DCC_V1: i128 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectionError {
    #[error("payload carries no health certificate")]
    MissingHealthCertificate,
    #[error("invalid health certificate: {0}")]
    InvalidPayload(String),
}

/// Which kind of event the certificate attests.
///
/// Only vaccinations are typed; tests and recoveries are kept as raw CBOR.
#[derive(Debug, Clone, PartialEq)]
pub enum CertificateType {
    Vaccination(VaccinationDose),
    Test(Value),
    Recovery(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GreenPass {
    /// Issuing country, claim `1`.
    pub issuer: Option<String>,
    pub issued_at: Option<OffsetDateTime>,
    pub expires_at: Option<OffsetDateTime>,
    /// Schema version, e.g. `1.3.0`.
    pub version: String,
    pub holder: Holder,
    pub certificate: CertificateType,
}

#[derive(Deserialize)]
struct RawHealthCertificate {
    #[serde(default)]
    ver: String,
    #[serde(default)]
    nam: Names,
    #[serde(default)]
    dob: String,
    #[serde(default)]
    v: Vec<VaccinationDose>,
    #[serde(default)]
    t: Vec<Value>,
    #[serde(default)]
    r: Vec<Value>,
}

fn claim(claims: &[(Value, Value)], key: i128) -> Option<&Value> {
    claims
        .iter()
        .find(|(k, _)| k.as_integer().map(i128::from) == Some(key))
        .map(|(_, v)| v)
}

fn timestamp(value: Option<&Value>) -> Option<OffsetDateTime> {
    let seconds = i64::try_from(value?.as_integer()?).ok()?;
    OffsetDateTime::from_unix_timestamp(seconds).ok()
}

impl GreenPass {
    pub fn from_claims(claims: &[(Value, Value)]) -> Result<Self, ProjectionError> {
        let hcert = claim(claims, HEALTH_CERTIFICATE_CLAIM)
            .and_then(Value::as_map)
            .and_then(|versions| claim(versions, EU_DCC_V1))
            .ok_or(ProjectionError::MissingHealthCertificate)?;
        let raw: RawHealthCertificate = cbor::from_value(hcert.clone())
            .map_err(|e| ProjectionError::InvalidPayload(e.to_string()))?;

        let date_of_birth = match raw.dob.trim() {
            "" => None,
            dob => Some(
                dob.parse::<BirthDate>()
                    .map_err(|e| ProjectionError::InvalidPayload(format!("dob: {e}")))?,
            ),
        };

        let certificate = if let Some(dose) = raw.v.into_iter().next() {
            CertificateType::Vaccination(dose)
        } else if let Some(test) = raw.t.into_iter().next() {
            CertificateType::Test(test)
        } else if let Some(recovery) = raw.r.into_iter().next() {
            CertificateType::Recovery(recovery)
        } else {
            return Err(ProjectionError::InvalidPayload(
                "no vaccination, test or recovery entry".into(),
            ));
        };

        Ok(Self {
            issuer: claim(claims, ISSUER_CLAIM)
                .and_then(Value::as_text)
                .map(str::to_string),
            issued_at: timestamp(claim(claims, ISSUED_AT_CLAIM)),
            expires_at: timestamp(claim(claims, EXPIRATION_CLAIM)),
            version: raw.ver,
            holder: Holder {
                names: raw.nam,
                date_of_birth,
            },
            certificate,
        })
    }

    pub fn vaccination(&self) -> Option<&VaccinationDose> {
        match &self.certificate {
            CertificateType::Vaccination(dose) => Some(dose),
            _ => None,
        }
    }
}
