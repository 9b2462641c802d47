//! Domain event bus — fire-and-forget notifications for observers.
//!
//! Dashboards, broadcasters and alerting hooks subscribe here instead of
//! being called from the decision path. Publishing never blocks and never
//! fails the caller.

use crate::risk::RiskLevel;
use crate::transaction::TxDecision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A transaction request was evaluated.
    DecisionMade {
        tx_id: String,
        agent_address: String,
        decision: TxDecision,
        risk_score: u8,
        risk_level: RiskLevel,
        timestamp: DateTime<Utc>,
    },

    /// Injection or drain evidence was seen.
    ThreatDetected {
        tx_id: String,
        agent_address: String,
        findings: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// An approved transaction was broadcast by the caller.
    TransactionBroadcast {
        tx_id: String,
        tx_hash: String,
        timestamp: DateTime<Utc>,
    },

    /// A new agent entered the registry.
    AgentRegistered {
        address: String,
        auto: bool,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub. Slow
/// subscribers lag and drop events; publishers are never held up.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        if self.sender.send(Arc::new(event)).is_err() {
            tracing::trace!("Domain event dropped: no subscribers");
        }
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}
