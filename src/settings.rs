//! Configuration for the verifier.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    cose::sign1::HeaderPolicy,
    decoder::DecodeOptions,
    validation::{RuleError, RuleSetting, ValidationRules},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub trust: TrustSettings,
    pub decoder: DecodeOptions,
    /// Which header map may supply the algorithm and key id.
    pub header_policy: HeaderPolicy,
    /// Overrides of the default rule table, in the authority's settings
    /// format.
    pub rules: Vec<RuleSetting>,
}

impl Settings {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn validation_rules(&self) -> Result<ValidationRules, RuleError> {
        ValidationRules::from_settings(&self.rules)
    }
}

/// Where the trust list comes from and how long it is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustSettings {
    /// JSON array of authorized key ids.
    pub status_url: String,
    /// Paged signer certificates.
    pub update_url: String,
    pub cache_dir: PathBuf,
    /// Prefix of the cache file names.
    pub country: String,
    pub ttl_hours: u64,
    pub request_timeout_secs: u64,
    /// Upper bound on certificate pages per refresh.
    pub max_pages: usize,
}

impl Default for TrustSettings {
    fn default() -> Self {
        Self {
            status_url: "https://get.dgc.gov.it/v1/dgc/signercertificate/status".into(),
            update_url: "https://get.dgc.gov.it/v1/dgc/signercertificate/update".into(),
            cache_dir: std::env::temp_dir().join("greenpass"),
            country: "IT".into(),
            ttl_hours: 24,
            request_timeout_secs: 30,
            max_pages: 1000,
        }
    }
}

impl TrustSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(60 * 60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::PrefixPolicy;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = Settings::from_json(
            r#"{
                "trust": { "ttl_hours": 1, "cache_dir": "/var/cache/greenpass" },
                "decoder": { "prefix": "required" },
                "header_policy": "protected_only",
                "rules": [{ "name": "vaccine_end_day_school", "type": "GENERIC", "value": "90" }]
            }"#,
        )
        .unwrap();

        assert_eq!(settings.trust.ttl(), Duration::from_secs(3600));
        assert_eq!(settings.trust.country, "IT");
        assert_eq!(settings.trust.max_pages, 1000);
        assert_eq!(settings.decoder.prefix, PrefixPolicy::Required);
        assert_eq!(settings.header_policy, HeaderPolicy::ProtectedOnly);
        assert_eq!(settings.validation_rules().unwrap().school_end, 90);
    }
}
