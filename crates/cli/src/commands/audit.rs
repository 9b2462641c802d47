//! `aegis audit` — List persisted audit events.

use std::path::Path;

use aegis_audit::{AuditStore, JsonlStore};
use aegis_core::{AuditEvent, AuditEventType, AuditFilter};

pub fn build_filter(
    event_type: Option<AuditEventType>,
    agent: Option<String>,
    tx: Option<String>,
) -> AuditFilter {
    let mut filter = AuditFilter::new();
    if let Some(event_type) = event_type {
        filter = filter.event_type(event_type);
    }
    if let Some(agent) = agent {
        filter = filter.agent(agent);
    }
    if let Some(tx) = tx {
        filter = filter.tx_id(tx);
    }
    filter
}

/// Read matching events from a JSON-lines log, newest first.
pub fn read_events(
    path: &Path,
    filter: &AuditFilter,
    limit: usize,
) -> Result<Vec<AuditEvent>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let store = JsonlStore::open(path)?;
    Ok(store.query(filter, limit))
}

pub async fn run(
    config_path: Option<&Path>,
    filter: &AuditFilter,
    limit: usize,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let path = config.audit.resolved_path();
    let events = read_events(&path, filter, limit)?;

    if json {
        for event in &events {
            println!("{}", serde_json::to_string(event)?);
        }
        return Ok(());
    }

    println!("📜 Audit Log ({})", path.display());
    println!("─────────────────────────────────────");
    if events.is_empty() {
        println!("  (no matching events)");
        return Ok(());
    }
    for event in &events {
        println!(
            "  #{:<5} {}  {:<22} risk {:>3}  {}",
            event.id,
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.event_type,
            event.risk_score,
            event.description
        );
        if let Some(tx_id) = &event.tx_id {
            println!("         tx {tx_id}");
        }
    }

    Ok(())
}
