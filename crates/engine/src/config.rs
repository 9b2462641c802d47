//! Runtime guardrail configuration owned by the policy engine.

use aegis_config::GuardrailSettings;
use aegis_core::{Error, Result, normalize_address};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Limits and address lists in effect for evaluations.
///
/// Addresses are stored normalized. An evaluation works on a snapshot, so
/// administrative changes apply to the next evaluation, never to one in
/// flight.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardrailConfig {
    pub max_tx_value: f64,
    pub daily_limit: f64,
    pub high_value_threshold: f64,
    pub daily_window: Duration,
    pub blacklist: BTreeSet<String>,
    pub whitelist: BTreeSet<String>,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        let settings = GuardrailSettings::default();
        Self {
            max_tx_value: settings.max_tx_value,
            daily_limit: settings.daily_limit,
            high_value_threshold: settings.high_value_threshold,
            daily_window: Duration::hours(i64::from(settings.daily_window_hours)),
            blacklist: normalize_all(&settings.blacklist),
            whitelist: normalize_all(&settings.whitelist),
        }
    }
}

fn normalize_all(addresses: &[String]) -> BTreeSet<String> {
    addresses
        .iter()
        .map(|a| normalize_address(a))
        .filter(|a| !a.is_empty())
        .collect()
}

impl GuardrailConfig {
    /// Build from file settings, rejecting invalid thresholds.
    pub fn from_settings(settings: &GuardrailSettings) -> Result<Self> {
        GuardrailSettings::check_thresholds(
            settings.max_tx_value,
            settings.daily_limit,
            settings.high_value_threshold,
        )?;
        if settings.daily_window_hours == 0 {
            return Err(Error::config("daily_window_hours must be at least 1"));
        }
        Ok(Self {
            max_tx_value: settings.max_tx_value,
            daily_limit: settings.daily_limit,
            high_value_threshold: settings.high_value_threshold,
            daily_window: Duration::hours(i64::from(settings.daily_window_hours)),
            blacklist: normalize_all(&settings.blacklist),
            whitelist: normalize_all(&settings.whitelist),
        })
    }

    pub fn is_blacklisted(&self, address: &str) -> bool {
        self.blacklist.contains(&normalize_address(address))
    }

    pub fn is_whitelisted(&self, address: &str) -> bool {
        self.whitelist.contains(&normalize_address(address))
    }

    /// A copy with `update` applied. The result is validated as a whole.
    pub fn with_update(&self, update: &ThresholdUpdate) -> Result<Self> {
        let mut next = self.clone();
        if let Some(v) = update.max_tx_value {
            next.max_tx_value = v;
        }
        if let Some(v) = update.daily_limit {
            next.daily_limit = v;
        }
        if let Some(v) = update.high_value_threshold {
            next.high_value_threshold = v;
        }
        GuardrailSettings::check_thresholds(
            next.max_tx_value,
            next.daily_limit,
            next.high_value_threshold,
        )?;
        Ok(next)
    }

    /// One-line summary for audit descriptions.
    pub fn describe_thresholds(&self) -> String {
        format!(
            "max_tx_value={}, daily_limit={}, high_value_threshold={}",
            self.max_tx_value, self.daily_limit, self.high_value_threshold
        )
    }
}

/// Partial threshold change; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tx_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_value_threshold: Option<f64>,
}

impl ThresholdUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_tx_value(mut self, value: f64) -> Self {
        self.max_tx_value = Some(value);
        self
    }

    pub fn daily_limit(mut self, value: f64) -> Self {
        self.daily_limit = Some(value);
        self
    }

    pub fn high_value_threshold(mut self, value: f64) -> Self {
        self.high_value_threshold = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.max_tx_value.is_none() && self.daily_limit.is_none() && self.high_value_threshold.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_settings() {
        let config = GuardrailConfig::default();
        assert_eq!(config.max_tx_value, 1.0);
        assert_eq!(config.daily_window, Duration::hours(24));
        assert!(config.is_whitelisted("0x7A250D5630B4CF539739DF2C5DACB4C659F2488D"));
        assert!(config.is_blacklisted("0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef"));
    }

    #[test]
    fn from_settings_normalizes_lists() {
        let settings = GuardrailSettings {
            blacklist: vec![" 0xABC ".into(), "".into()],
            whitelist: vec![],
            ..GuardrailSettings::default()
        };
        let config = GuardrailConfig::from_settings(&settings).unwrap();
        assert_eq!(config.blacklist.len(), 1);
        assert!(config.is_blacklisted("0xabc"));
        assert!(config.whitelist.is_empty());
    }

    #[test]
    fn update_applies_partially() {
        let config = GuardrailConfig::default();
        let next = config
            .with_update(&ThresholdUpdate::new().daily_limit(10.0))
            .unwrap();
        assert_eq!(next.daily_limit, 10.0);
        assert_eq!(next.max_tx_value, config.max_tx_value);
    }

    #[test]
    fn invalid_update_rejected_not_clamped() {
        let config = GuardrailConfig::default();
        for update in [
            ThresholdUpdate::new().daily_limit(-1.0),
            ThresholdUpdate::new().max_tx_value(f64::INFINITY),
            ThresholdUpdate::new().high_value_threshold(0.0),
        ] {
            assert!(matches!(config.with_update(&update), Err(Error::Config { .. })));
        }
    }
}
