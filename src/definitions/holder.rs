use serde::{Deserialize, Serialize};

use super::fulldate::BirthDate;

/// The holder's names as printed on the certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Names {
    #[serde(rename = "fn", default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// ICAO 9303 transliteration of the family name.
    #[serde(rename = "fnt", default, skip_serializing_if = "Option::is_none")]
    pub family_name_transliterated: Option<String>,
    #[serde(rename = "gn", default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(rename = "gnt", default, skip_serializing_if = "Option::is_none")]
    pub given_name_transliterated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holder {
    pub names: Names,
    /// `None` when the certificate leaves the date of birth empty.
    pub date_of_birth: Option<BirthDate>,
}

impl Holder {
    /// Age on `on`, if the date of birth is known.
    pub fn age_on(&self, on: time::Date) -> Option<i32> {
        self.date_of_birth.map(|dob| dob.age_on(on))
    }
}
