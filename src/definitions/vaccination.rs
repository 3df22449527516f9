use serde::{Deserialize, Serialize};
use time::Date;

use super::fulldate::FullDate;
use crate::validation::products;

/// SNOMED CT code of COVID-19, the only disease target evaluated.
pub const COVID_19: &str = "840539006";

/// One vaccination event, as carried in the `v` entry of a certificate.
///
/// Completeness and booster status are derived from the dose counters on
/// every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccinationDose {
    #[serde(rename = "ci")]
    certificate_id: String,
    #[serde(rename = "tg")]
    disease_target: String,
    #[serde(rename = "co")]
    country: String,
    #[serde(rename = "is", default)]
    issuer: String,
    #[serde(rename = "vp", default)]
    vaccine_type: String,
    #[serde(rename = "mp")]
    product: String,
    #[serde(rename = "ma", default)]
    manufacturer: String,
    #[serde(rename = "dn", default)]
    dose_given: u32,
    #[serde(rename = "sd", default)]
    total_doses: u32,
    #[serde(rename = "dt")]
    date: FullDate,
}

impl VaccinationDose {
    /// A COVID-19 dose with the fields the rules look at.
    pub fn new(
        certificate_id: impl Into<String>,
        product: impl Into<String>,
        country: impl Into<String>,
        dose_given: u32,
        total_doses: u32,
        date: Date,
    ) -> Self {
        Self {
            certificate_id: certificate_id.into(),
            disease_target: COVID_19.into(),
            country: country.into(),
            issuer: String::new(),
            vaccine_type: String::new(),
            product: product.into(),
            manufacturer: String::new(),
            dose_given,
            total_doses,
            date: date.into(),
        }
    }

    pub fn with_disease_target(mut self, target: impl Into<String>) -> Self {
        self.disease_target = target.into();
        self
    }

    pub fn certificate_id(&self) -> &str {
        &self.certificate_id
    }

    pub fn disease_target(&self) -> &str {
        &self.disease_target
    }

    /// ISO 3166 code of the vaccinating country.
    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn vaccine_type(&self) -> &str {
        &self.vaccine_type
    }

    /// EU authorisation number of the medicinal product, e.g. `EU/1/20/1528`.
    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn dose_given(&self) -> u32 {
        self.dose_given
    }

    pub fn total_doses(&self) -> u32 {
        self.total_doses
    }

    pub fn date(&self) -> Date {
        self.date.date()
    }

    pub fn is_complete(&self) -> bool {
        self.dose_given >= self.total_doses
    }

    pub fn is_booster(&self) -> bool {
        self.is_complete()
            && (self.dose_given > self.total_doses
                || self.dose_given >= products::booster_threshold(&self.product))
    }
}
