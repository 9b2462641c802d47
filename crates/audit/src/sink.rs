//! Audit sinks — secondary destinations notified after an event is stored.

use aegis_core::AuditEvent;

/// Observer of committed audit events.
///
/// Sinks are best-effort: they run after the store accepted the event and
/// cannot fail the operation.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Mirrors each committed event into the `tracing` stream under the
/// `audit` target.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, event: &AuditEvent) {
        tracing::info!(
            target: "audit",
            id = event.id,
            event_type = %event.event_type,
            agent = %event.agent_address,
            target_address = ?event.target_address,
            tx_id = ?event.tx_id,
            risk_score = event.risk_score,
            "{}",
            event.description
        );
    }
}
