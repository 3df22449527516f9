//! Vaccine products and the EMA authorisation table.

use std::collections::{BTreeMap, BTreeSet};

pub const PFIZER: &str = "EU/1/20/1528";
pub const MODERNA: &str = "EU/1/20/1507";
pub const ASTRAZENECA: &str = "EU/1/21/1529";
pub const JOHNSON: &str = "EU/1/20/1525";
pub const NOVAVAX: &str = "EU/1/21/1618";
pub const SPUTNIK_V: &str = "Sputnik-V";

/// Doses of a completed cycle from which it counts as a booster.
///
/// The single-dose product reaches its booster at the second dose.
pub fn booster_threshold(product: &str) -> u32 {
    if product == JOHNSON {
        2
    } else {
        3
    }
}

/// Products recognised without additional testing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicinalProducts {
    authorized: BTreeSet<String>,
    /// Products accepted only when administered in a given country.
    by_country: BTreeMap<String, BTreeSet<String>>,
}

impl Default for MedicinalProducts {
    fn default() -> Self {
        Self::new([PFIZER, MODERNA, ASTRAZENECA, JOHNSON, NOVAVAX]).allow_in("SM", SPUTNIK_V)
    }
}

impl MedicinalProducts {
    pub fn new<I, S>(authorized: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            authorized: authorized.into_iter().map(Into::into).collect(),
            by_country: BTreeMap::new(),
        }
    }

    /// Accept `product` for doses administered in `country`.
    pub fn allow_in(mut self, country: impl Into<String>, product: impl Into<String>) -> Self {
        self.by_country
            .entry(country.into())
            .or_default()
            .insert(product.into());
        self
    }

    pub fn is_ema(&self, product: &str, country: &str) -> bool {
        self.authorized.contains(product)
            || self
                .by_country
                .get(country)
                .is_some_and(|products| products.contains(product))
    }
}
