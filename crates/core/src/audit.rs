//! Audit records — the compliance record of every consequential change.
//!
//! Events are append-only. There is deliberately no update or delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Types of auditable events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    TxApproved,
    TxBlocked,
    /// A PENDING decision was recorded (held for manual review).
    TxPending,
    TxBroadcast,
    AgentRegistered,
    AgentAutoRegistered,
    ThreatDetected,
    ManualOverride,
    BlacklistAdded,
    BlacklistRemoved,
    WhitelistAdded,
    WhitelistRemoved,
    ThresholdsUpdated,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TxApproved => "TX_APPROVED",
            Self::TxBlocked => "TX_BLOCKED",
            Self::TxPending => "TX_PENDING",
            Self::TxBroadcast => "TX_BROADCAST",
            Self::AgentRegistered => "AGENT_REGISTERED",
            Self::AgentAutoRegistered => "AGENT_AUTO_REGISTERED",
            Self::ThreatDetected => "THREAT_DETECTED",
            Self::ManualOverride => "MANUAL_OVERRIDE",
            Self::BlacklistAdded => "BLACKLIST_ADDED",
            Self::BlacklistRemoved => "BLACKLIST_REMOVED",
            Self::WhitelistAdded => "WHITELIST_ADDED",
            Self::WhitelistRemoved => "WHITELIST_REMOVED",
            Self::ThresholdsUpdated => "THRESHOLDS_UPDATED",
        }
    }

    /// All variants, for CLI parsing and help text.
    pub const ALL: [AuditEventType; 13] = [
        Self::TxApproved,
        Self::TxBlocked,
        Self::TxPending,
        Self::TxBroadcast,
        Self::AgentRegistered,
        Self::AgentAutoRegistered,
        Self::ThreatDetected,
        Self::ManualOverride,
        Self::BlacklistAdded,
        Self::BlacklistRemoved,
        Self::WhitelistAdded,
        Self::WhitelistRemoved,
        Self::ThresholdsUpdated,
    ];
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for AuditEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown audit event type '{s}'"))
    }
}

/// A recorded audit event. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Strictly increasing in creation order.
    pub id: u64,
    pub event_type: AuditEventType,
    pub agent_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Transaction this event refers to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    pub description: String,
    pub risk_score: u8,
    pub timestamp: DateTime<Utc>,
}

/// The caller-supplied part of an audit event; the trail assigns
/// `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEvent {
    pub event_type: AuditEventType,
    pub agent_address: String,
    pub target_address: Option<String>,
    pub value: Option<f64>,
    pub tx_id: Option<String>,
    pub description: String,
    pub risk_score: u8,
}

impl NewAuditEvent {
    pub fn new(
        event_type: AuditEventType,
        agent_address: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            agent_address: agent_address.into(),
            target_address: None,
            value: None,
            tx_id: None,
            description: description.into(),
            risk_score: 0,
        }
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target_address = Some(target.into());
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn tx_id(mut self, tx_id: impl Into<String>) -> Self {
        self.tx_id = Some(tx_id.into());
        self
    }

    pub fn risk_score(mut self, score: u8) -> Self {
        self.risk_score = score;
        self
    }

    /// Stamp the draft with its sequence id and time.
    pub fn into_event(self, id: u64, timestamp: DateTime<Utc>) -> AuditEvent {
        AuditEvent {
            id,
            event_type: self.event_type,
            agent_address: self.agent_address,
            target_address: self.target_address,
            value: self.value,
            tx_id: self.tx_id,
            description: self.description,
            risk_score: self.risk_score,
            timestamp,
        }
    }
}

/// Query filter for audit reads. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_types: Vec<AuditEventType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_type(mut self, event_type: AuditEventType) -> Self {
        self.event_types.push(event_type);
        self
    }

    pub fn agent(mut self, address: impl Into<String>) -> Self {
        self.agent_address = Some(crate::normalize_address(&address.into()));
        self
    }

    pub fn tx_id(mut self, tx_id: impl Into<String>) -> Self {
        self.tx_id = Some(tx_id.into().to_lowercase());
        self
    }

    pub fn since(mut self, at: DateTime<Utc>) -> Self {
        self.since = Some(at);
        self
    }

    pub fn until(mut self, at: DateTime<Utc>) -> Self {
        self.until = Some(at);
        self
    }

    pub fn matches(&self, event: &AuditEvent) -> bool {
        if !self.event_types.is_empty() && !self.event_types.contains(&event.event_type) {
            return false;
        }
        if let Some(agent) = &self.agent_address {
            if crate::normalize_address(&event.agent_address) != *agent {
                return false;
            }
        }
        if let Some(tx_id) = &self.tx_id {
            if event.tx_id.as_deref() != Some(tx_id.as_str()) {
                return false;
            }
        }
        if self.since.is_some_and(|since| event.timestamp < since) {
            return false;
        }
        if self.until.is_some_and(|until| event.timestamp > until) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(id: u64, event_type: AuditEventType, agent: &str) -> AuditEvent {
        NewAuditEvent::new(event_type, agent, "test").into_event(id, Utc::now())
    }

    #[test]
    fn event_type_parses_case_insensitively() {
        assert_eq!(
            "tx_blocked".parse::<AuditEventType>().unwrap(),
            AuditEventType::TxBlocked
        );
        assert_eq!(
            "threat-detected".parse::<AuditEventType>().unwrap(),
            AuditEventType::ThreatDetected
        );
        assert!("nonsense".parse::<AuditEventType>().is_err());
    }

    #[test]
    fn event_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&AuditEventType::AgentAutoRegistered).unwrap();
        assert_eq!(json, "\"AGENT_AUTO_REGISTERED\"");
        for t in AuditEventType::ALL {
            assert_eq!(serde_json::to_string(&t).unwrap(), format!("\"{t}\""));
        }
    }

    #[test]
    fn filter_by_type_and_agent() {
        let filter = AuditFilter::new()
            .event_type(AuditEventType::TxBlocked)
            .agent("0xABC");

        assert!(filter.matches(&event(1, AuditEventType::TxBlocked, "0xabc")));
        assert!(!filter.matches(&event(2, AuditEventType::TxApproved, "0xabc")));
        assert!(!filter.matches(&event(3, AuditEventType::TxBlocked, "0xdef")));
    }

    #[test]
    fn filter_by_tx_id() {
        let e = NewAuditEvent::new(AuditEventType::TxBlocked, "0xa", "blocked")
            .tx_id("0xfeed")
            .into_event(1, Utc::now());
        assert!(AuditFilter::new().tx_id("0xFEED").matches(&e));
        assert!(!AuditFilter::new().tx_id("0xbeef").matches(&e));
        assert!(!AuditFilter::new()
            .tx_id("0xfeed")
            .matches(&event(2, AuditEventType::TxBlocked, "0xa")));
    }

    #[test]
    fn filter_by_time_range() {
        let now = Utc::now();
        let e = NewAuditEvent::new(AuditEventType::TxApproved, "0xabc", "ok").into_event(1, now);

        assert!(AuditFilter::new().since(now - Duration::minutes(1)).matches(&e));
        assert!(!AuditFilter::new().since(now + Duration::minutes(1)).matches(&e));
        assert!(!AuditFilter::new().until(now - Duration::minutes(1)).matches(&e));
    }

    #[test]
    fn draft_builder_sets_optional_fields() {
        let e = NewAuditEvent::new(AuditEventType::TxApproved, "0xa", "approved")
            .target("0xb")
            .value(0.25)
            .tx_id("0x99")
            .risk_score(12)
            .into_event(7, Utc::now());
        assert_eq!(e.id, 7);
        assert_eq!(e.target_address.as_deref(), Some("0xb"));
        assert_eq!(e.value, Some(0.25));
        assert_eq!(e.tx_id.as_deref(), Some("0x99"));
        assert_eq!(e.risk_score, 12);
    }
}
