//! Risk vocabulary — analyzer signals and score banding.

use serde::{Deserialize, Serialize};

/// Risk band derived from a 0–100 risk score.
///
/// Ordering follows severity, so `RiskLevel::High > RiskLevel::Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Lower bounds (inclusive) of each band above LOW.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskBands {
    #[serde(default = "default_medium")]
    pub medium: u8,
    #[serde(default = "default_high")]
    pub high: u8,
    #[serde(default = "default_critical")]
    pub critical: u8,
}

fn default_medium() -> u8 {
    25
}
fn default_high() -> u8 {
    50
}
fn default_critical() -> u8 {
    75
}

impl Default for RiskBands {
    fn default() -> Self {
        Self {
            medium: default_medium(),
            high: default_high(),
            critical: default_critical(),
        }
    }
}

impl RiskBands {
    /// Map a score onto its band. Monotone in `score`.
    pub fn level(&self, score: u8) -> RiskLevel {
        if score >= self.critical {
            RiskLevel::Critical
        } else if score >= self.high {
            RiskLevel::High
        } else if score >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Bands must be strictly ascending and within `1..=100`.
    pub fn is_valid(&self) -> bool {
        self.medium >= 1
            && self.medium < self.high
            && self.high < self.critical
            && self.critical <= 100
    }
}

/// Evidence produced by the intent consistency analyzer.
///
/// The analyzer never decides; it only reports what it saw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSignals {
    /// Intent text matches a known prompt-injection phrase.
    pub injection_detected: bool,

    /// Intent names a recipient informally with no resolvable address.
    pub ambiguous_recipient: bool,

    /// Intent references an address or protocol the target does not match.
    pub intent_target_mismatch: bool,

    /// Intent states an amount that differs from the request value.
    pub amount_mismatch: bool,

    /// Target is a canonical null or burn address.
    pub is_zero_or_burn_address: bool,

    /// Call selector belongs to the "withdraw everything" class.
    pub is_drain_pattern: bool,

    /// Name of a flagged (non-drain) call selector, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risky_function: Option<String>,

    /// A protocol label was supplied but is not a known audited protocol.
    pub unknown_protocol: bool,

    /// Injection phrases that matched, in catalogue order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub injection_patterns: Vec<String>,

    /// Human-readable findings, one per fired signal.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<String>,
}

impl RiskSignals {
    /// Signals that warrant a THREAT_DETECTED audit event.
    pub fn is_threat(&self) -> bool {
        self.injection_detected || self.is_drain_pattern
    }

    /// True when no signal fired.
    pub fn is_clean(&self) -> bool {
        !self.injection_detected
            && !self.ambiguous_recipient
            && !self.intent_target_mismatch
            && !self.amount_mismatch
            && !self.is_zero_or_burn_address
            && !self.is_drain_pattern
            && self.risky_function.is_none()
            && !self.unknown_protocol
    }
}
