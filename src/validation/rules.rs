//! Day offsets that bound the validity of a vaccination.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::products::JOHNSON;

/// Country whose own rows and strategies apply at home.
pub const HOME_COUNTRY: &str = "IT";

/// `type` of settings that apply to every product.
pub const GENERIC: &str = "GENERIC";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Boundary {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cycle {
    Complete,
    Booster,
}

/// Rule row: vaccinated at home or abroad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Region {
    Home,
    Abroad,
}

impl Region {
    pub fn of(country: &str) -> Self {
        if country == HOME_COUNTRY {
            Region::Home
        } else {
            Region::Abroad
        }
    }
}

/// Days after the dose at which validity starts and ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start: u32,
    pub end: u32,
}

/// One entry of the authority's settings list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetting {
    pub name: String,
    /// A product code, or [`GENERIC`].
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("rule {name} has a non-numeric value {value:?}")]
    InvalidValue { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRules {
    pub complete_home: DayWindow,
    pub complete_abroad: DayWindow,
    pub booster_home: DayWindow,
    pub booster_abroad: DayWindow,
    /// Extra start days for a completed primary cycle of a given product.
    pub complete_start_extra: BTreeMap<String, u32>,
    /// Window of a cycle still in progress, unless the product has its own.
    pub not_complete: DayWindow,
    pub not_complete_by_product: BTreeMap<String, DayWindow>,
    /// End of a completed, non-booster cycle in school mode.
    pub school_end: u32,
    /// End of the extension granted abroad in strengthened mode.
    pub extended_ema_end: u32,
    /// Age from which work mode applies the strengthened strategy.
    pub mandatory_age: i32,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            complete_home: DayWindow { start: 0, end: 180 },
            complete_abroad: DayWindow { start: 0, end: 270 },
            booster_home: DayWindow { start: 0, end: 180 },
            booster_abroad: DayWindow { start: 0, end: 270 },
            complete_start_extra: BTreeMap::from([(JOHNSON.to_string(), 15)]),
            not_complete: DayWindow { start: 15, end: 42 },
            not_complete_by_product: BTreeMap::new(),
            school_end: 120,
            extended_ema_end: 270,
            mandatory_age: 50,
        }
    }
}

impl ValidationRules {
    /// The defaults, overridden by the authority's settings list. Unknown
    /// settings are skipped.
    pub fn from_settings(settings: &[RuleSetting]) -> Result<Self, RuleError> {
        let mut rules = Self::default();
        for setting in settings {
            rules.apply(setting)?;
        }
        Ok(rules)
    }

    pub fn offset(&self, boundary: Boundary, cycle: Cycle, region: Region) -> u32 {
        let window = match (cycle, region) {
            (Cycle::Complete, Region::Home) => self.complete_home,
            (Cycle::Complete, Region::Abroad) => self.complete_abroad,
            (Cycle::Booster, Region::Home) => self.booster_home,
            (Cycle::Booster, Region::Abroad) => self.booster_abroad,
        };
        match boundary {
            Boundary::Start => window.start,
            Boundary::End => window.end,
        }
    }

    pub fn complete_start_extra(&self, product: &str) -> u32 {
        self.complete_start_extra
            .get(product)
            .copied()
            .unwrap_or_default()
    }

    pub fn not_complete(&self, product: &str) -> DayWindow {
        self.not_complete_by_product
            .get(product)
            .copied()
            .unwrap_or(self.not_complete)
    }

    fn apply(&mut self, setting: &RuleSetting) -> Result<(), RuleError> {
        let days = || {
            setting
                .value
                .trim()
                .parse::<u32>()
                .map_err(|_| RuleError::InvalidValue {
                    name: setting.name.clone(),
                    value: setting.value.clone(),
                })
        };
        let generic = setting.kind == GENERIC;

        match setting.name.as_str() {
            "vaccine_start_day_complete_IT" => self.complete_home.start = days()?,
            "vaccine_end_day_complete_IT" => self.complete_home.end = days()?,
            "vaccine_start_day_complete_NOT_IT" => self.complete_abroad.start = days()?,
            "vaccine_end_day_complete_NOT_IT" => self.complete_abroad.end = days()?,
            "vaccine_start_day_booster_IT" => self.booster_home.start = days()?,
            "vaccine_end_day_booster_IT" => self.booster_home.end = days()?,
            "vaccine_start_day_booster_NOT_IT" => self.booster_abroad.start = days()?,
            "vaccine_end_day_booster_NOT_IT" => self.booster_abroad.end = days()?,
            "vaccine_start_day_complete" if !generic => {
                self.complete_start_extra
                    .insert(setting.kind.clone(), days()?);
            }
            "vaccine_start_day_not_complete" if generic => self.not_complete.start = days()?,
            "vaccine_end_day_not_complete" if generic => self.not_complete.end = days()?,
            "vaccine_start_day_not_complete" => {
                let days = days()?;
                self.not_complete_entry(&setting.kind).start = days;
            }
            "vaccine_end_day_not_complete" => {
                let days = days()?;
                self.not_complete_entry(&setting.kind).end = days;
            }
            "vaccine_end_day_school" => self.school_end = days()?,
            "vaccine_end_day_complete_extended_EMA" => self.extended_ema_end = days()?,
            _ => trace!("ignoring rule setting {} ({})", setting.name, setting.kind),
        }
        Ok(())
    }

    fn not_complete_entry(&mut self, product: &str) -> &mut DayWindow {
        let fallback = self.not_complete;
        self.not_complete_by_product
            .entry(product.to_string())
            .or_insert(fallback)
    }
}
