//! Agent identity — who is allowed to submit transaction requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest trust score an agent can hold.
pub const MAX_TRUST_SCORE: u8 = 100;

/// A registered agent and its reputation state.
///
/// Agents are never deleted, only deactivated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Agent {
    /// Identity key (normalized address).
    pub address: String,

    /// Display name.
    pub name: String,

    /// Reputation, always within `0..=100`.
    pub trust_score: u8,

    /// Inactive agents are never trusted.
    pub is_active: bool,

    /// Every evaluated transaction.
    pub tx_count: u64,

    /// Transactions that were not approved.
    pub blocked_count: u64,

    /// Created by auto-registration rather than an explicit call.
    #[serde(default)]
    pub auto_registered: bool,

    pub registered_at: DateTime<Utc>,
}

impl Agent {
    /// Create a fresh, active agent with zeroed counters.
    pub fn new(address: impl Into<String>, name: impl Into<String>, trust_score: u8) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            trust_score: trust_score.min(MAX_TRUST_SCORE),
            is_active: true,
            tx_count: 0,
            blocked_count: 0,
            auto_registered: false,
            registered_at: Utc::now(),
        }
    }

    /// Transactions that went through (approved or held for review).
    pub fn cleared_count(&self) -> u64 {
        self.tx_count.saturating_sub(self.blocked_count)
    }
}

/// The outcome reported back to the registry after each decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Approved,
    Blocked,
    /// Held for manual review; counted but neither rewarded nor penalized.
    Held,
}

impl From<bool> for Outcome {
    fn from(approved: bool) -> Self {
        if approved {
            Outcome::Approved
        } else {
            Outcome::Blocked
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_agent_clamps_trust_score() {
        let agent = Agent::new("0xabc", "tester", 250);
        assert_eq!(agent.trust_score, MAX_TRUST_SCORE);
        assert!(agent.is_active);
        assert_eq!(agent.tx_count, 0);
    }

    #[test]
    fn outcome_from_bool() {
        assert_eq!(Outcome::from(true), Outcome::Approved);
        assert_eq!(Outcome::from(false), Outcome::Blocked);
    }

    #[test]
    fn cleared_count_excludes_blocked() {
        let mut agent = Agent::new("0xabc", "tester", 50);
        agent.tx_count = 10;
        agent.blocked_count = 3;
        assert_eq!(agent.cleared_count(), 7);
    }
}
