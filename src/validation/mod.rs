//! Admission rules for authenticated vaccination certificates.
//!
//! A [`VaccineChecker`] evaluates a dose against a [`ScanMode`], the day
//! offsets in [`ValidationRules`] and the [`MedicinalProducts`] accepted
//! without further testing.

pub mod checker;
pub mod products;
pub mod rules;

pub use checker::{ValidityWindow, VaccineChecker};
pub use products::MedicinalProducts;
pub use rules::{Boundary, Cycle, DayWindow, Region, RuleError, RuleSetting, ValidationRules};

use serde::{Deserialize, Serialize};

/// Final outcome of an evaluation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Valid,
    NotValid,
    NotValidYet,
    Expired,
    TestNeeded,
    /// Not a certificate this mode applies to.
    NotEuDcc,
    Revoked,
}

/// The policy a certificate is checked under.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
pub enum ScanMode {
    /// Base pass.
    #[strum(serialize = "3G")]
    #[serde(rename = "3G")]
    Standard,
    /// Reinforced pass: vaccinated or recovered only.
    #[strum(serialize = "2G")]
    #[serde(rename = "2G")]
    Strengthened,
    #[strum(serialize = "BOOSTED")]
    #[serde(rename = "BOOSTED")]
    Booster,
    #[strum(serialize = "SCHOOL")]
    #[serde(rename = "SCHOOL")]
    School,
    /// Standard or strengthened depending on the holder's age.
    #[strum(serialize = "WORK")]
    #[serde(rename = "WORK")]
    Work,
    /// Entry into the home country.
    #[strum(serialize = "ENTRY_IT")]
    #[serde(rename = "ENTRY_IT")]
    Entry,
}
