//! Configuration loading, validation, and management for Aegis.
//!
//! Loads configuration from `~/.aegis/config.toml` (or `AEGIS_CONFIG`) with
//! environment variable overrides. Validates all settings at startup; invalid
//! values are rejected, never clamped.

use aegis_core::RiskBands;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.aegis/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Spend limits and address lists
    #[serde(default)]
    pub guardrail: GuardrailSettings,

    /// Risk scoring weights and bands
    #[serde(default)]
    pub risk: RiskWeights,

    /// Trust score policy
    #[serde(default)]
    pub trust: TrustPolicy,

    /// Audit trail storage
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Deterministic policy limits. All values share one unit (ETH by default).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailSettings {
    #[serde(default = "default_max_tx_value")]
    pub max_tx_value: f64,

    #[serde(default = "default_daily_limit")]
    pub daily_limit: f64,

    #[serde(default = "default_high_value_threshold")]
    pub high_value_threshold: f64,

    /// Length of the sliding spend window.
    #[serde(default = "default_window_hours")]
    pub daily_window_hours: u32,

    /// Denied target addresses
    #[serde(default = "default_blacklist")]
    pub blacklist: Vec<String>,

    /// Trusted protocol destinations (bypass the per-transaction ceiling only)
    #[serde(default = "default_whitelist")]
    pub whitelist: Vec<String>,
}

fn default_max_tx_value() -> f64 {
    1.0
}
fn default_daily_limit() -> f64 {
    5.0
}
fn default_high_value_threshold() -> f64 {
    0.5
}
fn default_window_hours() -> u32 {
    24
}
fn default_blacklist() -> Vec<String> {
    vec!["0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef".into()]
}
fn default_whitelist() -> Vec<String> {
    vec![
        // Uniswap V2 Router
        "0x7a250d5630b4cf539739df2c5dacb4c659f2488d".into(),
        // Uniswap V3 Router
        "0xe592427a0aece92de3edee1f18e0157c05861564".into(),
    ]
}

impl Default for GuardrailSettings {
    fn default() -> Self {
        Self {
            max_tx_value: default_max_tx_value(),
            daily_limit: default_daily_limit(),
            high_value_threshold: default_high_value_threshold(),
            daily_window_hours: default_window_hours(),
            blacklist: default_blacklist(),
            whitelist: default_whitelist(),
        }
    }
}

impl GuardrailSettings {
    /// Validate a threshold triple. Shared by startup validation and the
    /// engine's `update_thresholds`.
    pub fn check_thresholds(
        max_tx_value: f64,
        daily_limit: f64,
        high_value_threshold: f64,
    ) -> Result<(), ConfigError> {
        for (name, value) in [
            ("max_tx_value", max_tx_value),
            ("daily_limit", daily_limit),
            ("high_value_threshold", high_value_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be a finite, non-negative number (got {value})"
                )));
            }
        }
        if high_value_threshold <= 0.0 {
            return Err(ConfigError::ValidationError(
                "high_value_threshold must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        Self::check_thresholds(self.max_tx_value, self.daily_limit, self.high_value_threshold)?;
        if self.daily_window_hours == 0 {
            return Err(ConfigError::ValidationError(
                "daily_window_hours must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Risk-score contribution of each factor, in score points (0–100).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskWeights {
    /// Contribution at or above `high_value_threshold`, scaled linearly below it
    #[serde(default = "default_value_weight")]
    pub value: u8,

    /// Contribution of a zero-trust agent, scaled by the trust deficit
    #[serde(default = "default_trust_weight")]
    pub trust_deficit: u8,

    #[serde(default = "default_injection_weight")]
    pub injection: u8,

    #[serde(default = "default_drain_weight")]
    pub drain_pattern: u8,

    #[serde(default = "default_mismatch_weight")]
    pub intent_target_mismatch: u8,

    #[serde(default = "default_ambiguous_weight")]
    pub ambiguous_recipient: u8,

    #[serde(default = "default_amount_weight")]
    pub amount_mismatch: u8,

    #[serde(default = "default_function_weight")]
    pub risky_function: u8,

    #[serde(default = "default_protocol_weight")]
    pub unknown_protocol: u8,

    /// Added when the transaction would push daily usage past `daily_usage_ratio`
    #[serde(default = "default_daily_usage_weight")]
    pub daily_usage: u8,

    #[serde(default = "default_daily_usage_ratio")]
    pub daily_usage_ratio: f64,

    /// Subtracted for whitelisted targets
    #[serde(default = "default_whitelist_discount")]
    pub whitelist_discount: u8,

    #[serde(default)]
    pub bands: RiskBands,
}

fn default_value_weight() -> u8 {
    35
}
fn default_trust_weight() -> u8 {
    20
}
fn default_injection_weight() -> u8 {
    80
}
fn default_drain_weight() -> u8 {
    75
}
fn default_mismatch_weight() -> u8 {
    35
}
fn default_ambiguous_weight() -> u8 {
    20
}
fn default_amount_weight() -> u8 {
    15
}
fn default_function_weight() -> u8 {
    10
}
fn default_protocol_weight() -> u8 {
    10
}
fn default_daily_usage_weight() -> u8 {
    10
}
fn default_daily_usage_ratio() -> f64 {
    0.8
}
fn default_whitelist_discount() -> u8 {
    10
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            value: default_value_weight(),
            trust_deficit: default_trust_weight(),
            injection: default_injection_weight(),
            drain_pattern: default_drain_weight(),
            intent_target_mismatch: default_mismatch_weight(),
            ambiguous_recipient: default_ambiguous_weight(),
            amount_mismatch: default_amount_weight(),
            risky_function: default_function_weight(),
            unknown_protocol: default_protocol_weight(),
            daily_usage: default_daily_usage_weight(),
            daily_usage_ratio: default_daily_usage_ratio(),
            whitelist_discount: default_whitelist_discount(),
            bands: RiskBands::default(),
        }
    }
}

impl RiskWeights {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.bands.is_valid() {
            return Err(ConfigError::ValidationError(
                "risk bands must be strictly ascending within 1..=100".into(),
            ));
        }
        // Each of these alone must reach the critical band.
        if self.injection < self.bands.critical || self.drain_pattern < self.bands.critical {
            return Err(ConfigError::ValidationError(format!(
                "injection and drain_pattern weights must be >= critical band ({})",
                self.bands.critical
            )));
        }
        if !(self.daily_usage_ratio > 0.0 && self.daily_usage_ratio <= 1.0) {
            return Err(ConfigError::ValidationError(
                "daily_usage_ratio must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Trust score drift policy.
///
/// Drift is monotone: approvals never lower trust, blocks never raise it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustPolicy {
    /// Score assigned on registration
    #[serde(default = "default_trust_score")]
    pub default_score: u8,

    /// Agents below this score are not trusted
    #[serde(default = "default_min_trusted")]
    pub min_trusted_score: u8,

    /// Added per approved transaction
    #[serde(default = "default_approval_reward")]
    pub approval_reward: u8,

    /// Subtracted per blocked transaction
    #[serde(default = "default_block_penalty")]
    pub block_penalty: u8,
}

fn default_trust_score() -> u8 {
    50
}
fn default_min_trusted() -> u8 {
    1
}
fn default_approval_reward() -> u8 {
    1
}
fn default_block_penalty() -> u8 {
    5
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            default_score: default_trust_score(),
            min_trusted_score: default_min_trusted(),
            approval_reward: default_approval_reward(),
            block_penalty: default_block_penalty(),
        }
    }
}

impl TrustPolicy {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_score > 100 || self.min_trusted_score > 100 {
            return Err(ConfigError::ValidationError(
                "trust scores must be within 0..=100".into(),
            ));
        }
        if self.min_trusted_score == 0 {
            return Err(ConfigError::ValidationError(
                "min_trusted_score must be at least 1 (zero-trust agents are never trusted)".into(),
            ));
        }
        Ok(())
    }
}

/// Where audit events are durably recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditBackend {
    /// Process memory only (tests, demos)
    #[default]
    Memory,
    /// Append-only JSON-lines file
    Jsonl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub backend: AuditBackend,

    /// File path for the `jsonl` backend (default: ~/.aegis/audit.jsonl)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Mirror each event to `tracing`
    #[serde(default = "default_true")]
    pub tracing: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            backend: AuditBackend::default(),
            path: None,
            tracing: true,
        }
    }
}

impl AuditConfig {
    /// Resolved path of the JSON-lines file.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("audit.jsonl"))
    }
}

impl AppConfig {
    /// Load configuration from `AEGIS_CONFIG` or the default path
    /// (`~/.aegis/config.toml`), then apply environment overrides:
    /// - `AEGIS_MAX_TX_VALUE`
    /// - `AEGIS_DAILY_LIMIT`
    /// - `AEGIS_HIGH_VALUE_THRESHOLD`
    /// - `AEGIS_AUDIT_PATH` (also selects the `jsonl` backend)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("AEGIS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the environment in production).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |key: &str| -> Result<Option<f64>, ConfigError> {
            match lookup(key) {
                Some(raw) => raw.trim().parse::<f64>().map(Some).map_err(|_| {
                    ConfigError::ValidationError(format!("{key}='{raw}' is not a number"))
                }),
                None => Ok(None),
            }
        };

        if let Some(v) = parse("AEGIS_MAX_TX_VALUE")? {
            self.guardrail.max_tx_value = v;
        }
        if let Some(v) = parse("AEGIS_DAILY_LIMIT")? {
            self.guardrail.daily_limit = v;
        }
        if let Some(v) = parse("AEGIS_HIGH_VALUE_THRESHOLD")? {
            self.guardrail.high_value_threshold = v;
        }
        if let Some(path) = lookup("AEGIS_AUDIT_PATH") {
            self.audit.backend = AuditBackend::Jsonl;
            self.audit.path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".aegis")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.guardrail.validate()?;
        self.risk.validate()?;
        self.trust.validate()?;
        Ok(())
    }

    /// Generate a default config TOML string (for `aegis config`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for aegis_core::Error {
    fn from(e: ConfigError) -> Self {
        aegis_core::Error::config(e.to_string())
    }
}
