//! Transaction requests and the decisions rendered on them.

use crate::error::Error;
use crate::risk::{RiskLevel, RiskSignals};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An outbound value transfer an agent wants to make.
///
/// Immutable once submitted to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub agent_address: String,
    pub target_address: String,

    /// Transfer value; must be finite and non-negative.
    pub value: f64,

    /// Opaque 4-byte call selector, e.g. `0xa9059cbb`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_sig: Option<String>,

    /// What the agent believes it is doing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    /// Protocol label, e.g. `Uniswap`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

impl TransactionRequest {
    /// Create a plain transfer request.
    pub fn new(agent_address: impl Into<String>, target_address: impl Into<String>, value: f64) -> Self {
        Self {
            agent_address: agent_address.into(),
            target_address: target_address.into(),
            value,
            function_sig: None,
            intent: None,
            protocol: None,
        }
    }

    pub fn with_function_sig(mut self, sig: impl Into<String>) -> Self {
        self.function_sig = Some(sig.into());
        self
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// A value the engine can reason about: finite and not negative.
    pub fn has_valid_value(&self) -> bool {
        self.value.is_finite() && self.value >= 0.0
    }
}

/// Terminal classification of a transaction request.
///
/// Ordinals are stable; external systems branch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum TxDecision {
    Approved = 0,
    Blocked = 1,
    Pending = 2,
}

impl TxDecision {
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for TxDecision {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Approved),
            1 => Ok(Self::Blocked),
            2 => Ok(Self::Pending),
            other => Err(Error::Internal(format!("unknown decision ordinal {other}"))),
        }
    }
}

impl std::fmt::Display for TxDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "APPROVED"),
            Self::Blocked => write!(f, "BLOCKED"),
            Self::Pending => write!(f, "PENDING"),
        }
    }
}

/// Why a request was blocked (or held).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    /// The agent address has never been registered.
    UnknownAgent,
    /// Registered, but deactivated or below the trust floor.
    AgentNotTrusted,
    Blacklisted,
    BurnAddress,
    MaxValueExceeded,
    DailyLimitExceeded,
    /// Risk score reached the critical band.
    RiskThreshold,
    /// High value in the HIGH band; held for a human.
    ManualReviewRequired,
    /// Malformed request (e.g. negative value).
    InvalidRequest,
    /// Scoring failed; the engine failed closed.
    InternalError,
}

impl Violation {
    /// The canonical block reason for deterministic checks.
    pub fn reason(self) -> &'static str {
        match self {
            Self::UnknownAgent => "agent not registered",
            Self::AgentNotTrusted => "agent not trusted",
            Self::Blacklisted => "target address blacklisted",
            Self::BurnAddress => "target is a zero or burn address",
            Self::MaxValueExceeded => "value exceeds maximum per-transaction limit",
            Self::DailyLimitExceeded => "exceeds daily spending limit",
            Self::RiskThreshold => "risk score exceeds critical threshold",
            Self::ManualReviewRequired => "high risk and high value requires manual approval",
            Self::InvalidRequest => "invalid transaction request",
            Self::InternalError => "internal evaluation error",
        }
    }
}

/// The engine's verdict on one request. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// `0x`-prefixed identifier for the evaluated transaction.
    pub tx_id: String,
    pub decision: TxDecision,
    pub risk_score: u8,
    pub risk_level: RiskLevel,

    /// Present iff `decision` is BLOCKED.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,

    /// Machine-readable cause for BLOCKED and PENDING decisions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation: Option<Violation>,

    /// Human-readable rationale; always present.
    pub explanation: String,

    /// Check identifiers in evaluation order.
    pub checks_passed: Vec<String>,
    pub checks_failed: Vec<String>,

    /// Analyzer evidence, when scoring ran.
    #[serde(default)]
    pub signals: RiskSignals,

    pub timestamp: DateTime<Utc>,
}

impl Decision {
    pub fn is_approved(&self) -> bool {
        self.decision == TxDecision::Approved
    }

    pub fn is_blocked(&self) -> bool {
        self.decision == TxDecision::Blocked
    }

    pub fn is_pending(&self) -> bool {
        self.decision == TxDecision::Pending
    }

    /// Gate downstream execution: `Ok` only for APPROVED decisions.
    pub fn into_result(self) -> Result<Decision, Error> {
        match self.decision {
            TxDecision::Approved => Ok(self),
            TxDecision::Blocked => Err(Error::PolicyViolation {
                reason: self
                    .block_reason
                    .unwrap_or_else(|| Violation::InternalError.reason().to_string()),
            }),
            TxDecision::Pending => Err(Error::PolicyViolation {
                reason: Violation::ManualReviewRequired.reason().to_string(),
            }),
        }
    }
}

/// A human resolution of a PENDING transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub approved: bool,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// Everything known about one evaluated transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub request: TransactionRequest,
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_override: Option<ManualOverride>,
    /// On-chain hash reported after broadcast.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast_hash: Option<String>,
}

impl TransactionRecord {
    pub fn new(request: TransactionRequest, decision: Decision) -> Self {
        Self {
            request,
            decision,
            manual_override: None,
            broadcast_hash: None,
        }
    }

    pub fn tx_id(&self) -> &str {
        &self.decision.tx_id
    }

    /// Still waiting on a human.
    pub fn is_awaiting_review(&self) -> bool {
        self.decision.is_pending() && self.manual_override.is_none()
    }

    /// Cleared for broadcast, by the engine or by an operator.
    pub fn is_cleared(&self) -> bool {
        self.decision.is_approved()
            || self
                .manual_override
                .as_ref()
                .is_some_and(|o| o.approved)
    }
}
