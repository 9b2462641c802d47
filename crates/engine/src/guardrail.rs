//! The composition root — wires audit trail, registry, analyzer and policy
//! engine together and exposes the caller-facing API.

use crate::config::{GuardrailConfig, ThresholdUpdate};
use crate::ledger::Stats;
use crate::policy::PolicyEngine;
use crate::scoring::RiskScorer;
use aegis_analyzer::{IntentAnalyzer, SignalAnalyzer};
use aegis_audit::{AuditTrail, JsonlStore};
use aegis_config::{AppConfig, AuditBackend, AuditConfig};
use aegis_core::{
    Agent, AuditEvent, AuditFilter, Decision, DomainEvent, EventBus, Result, TransactionRecord,
    TransactionRequest,
};
use aegis_registry::AgentRegistry;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Open the audit trail described by `config`.
pub fn open_audit_trail(config: &AuditConfig) -> Result<AuditTrail> {
    let trail = match config.backend {
        AuditBackend::Memory => AuditTrail::in_memory(),
        AuditBackend::Jsonl => {
            AuditTrail::new(Box::new(JsonlStore::open(config.resolved_path())?))
        }
    };
    Ok(if config.tracing { trail.traced() } else { trail })
}

/// Builder for [`Guardrail`], for callers that bring their own audit trail,
/// analyzer or event bus.
pub struct GuardrailBuilder {
    config: AppConfig,
    audit: Option<AuditTrail>,
    analyzer: Option<Box<dyn SignalAnalyzer>>,
    events: Option<Arc<EventBus>>,
}

impl GuardrailBuilder {
    pub fn audit_trail(mut self, trail: AuditTrail) -> Self {
        self.audit = Some(trail);
        self
    }

    pub fn analyzer(mut self, analyzer: Box<dyn SignalAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn build(self) -> Result<Guardrail> {
        self.config.validate()?;
        let guardrail_config = GuardrailConfig::from_settings(&self.config.guardrail)?;

        let audit = Arc::new(match self.audit {
            Some(trail) => trail,
            None => open_audit_trail(&self.config.audit)?,
        });
        let analyzer: Box<dyn SignalAnalyzer> = match self.analyzer {
            Some(analyzer) => analyzer,
            None => Box::new(IntentAnalyzer::new()?),
        };
        let events = self.events.unwrap_or_default();

        let registry = Arc::new(
            AgentRegistry::new(self.config.trust.clone(), audit.clone())
                .with_event_bus(events.clone()),
        );
        let engine = PolicyEngine::new(
            guardrail_config,
            registry.clone(),
            analyzer,
            RiskScorer::new(self.config.risk.clone()),
            audit.clone(),
            events.clone(),
        );

        info!(audit_store = audit.store_name(), "Guardrail ready");
        Ok(Guardrail {
            registry,
            audit,
            engine,
            events,
        })
    }
}

/// The guardrail decision engine.
///
/// Every state change goes through here so it is audited. Administrative
/// methods assume the caller has already been authorized.
pub struct Guardrail {
    registry: Arc<AgentRegistry>,
    audit: Arc<AuditTrail>,
    engine: PolicyEngine,
    events: Arc<EventBus>,
}

impl std::fmt::Debug for Guardrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guardrail")
            .field("registry", &self.registry)
            .field("audit", &self.audit)
            .field("engine", &self.engine)
            .finish()
    }
}

impl Guardrail {
    pub fn builder(config: AppConfig) -> GuardrailBuilder {
        GuardrailBuilder {
            config,
            audit: None,
            analyzer: None,
            events: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::builder(config.clone()).build()
    }

    /// Defaults with an in-memory audit trail.
    pub fn in_memory() -> Result<Self> {
        Self::builder(AppConfig::default())
            .audit_trail(AuditTrail::in_memory())
            .build()
    }

    // ── Transactions ────────────────────────────────────────────────────

    /// Evaluate a request. Never registers the agent.
    pub fn validate_transaction(&self, request: TransactionRequest) -> Result<Decision> {
        self.engine.validate_transaction(request)
    }

    /// Submission path: registers an unseen agent, then evaluates.
    pub fn submit_transaction(&self, request: TransactionRequest) -> Result<Decision> {
        self.registry.auto_register(&request.agent_address)?;
        self.engine.validate_transaction(request)
    }

    pub fn manual_override(
        &self,
        tx_id: &str,
        approve: bool,
        operator: &str,
        note: Option<&str>,
    ) -> Result<TransactionRecord> {
        self.engine.manual_override(tx_id, approve, operator, note)
    }

    pub fn record_broadcast(&self, tx_id: &str, tx_hash: &str) -> Result<TransactionRecord> {
        self.engine.record_broadcast(tx_id, tx_hash)
    }

    pub fn get_transaction(&self, tx_id: &str) -> Option<TransactionRecord> {
        self.engine.get_transaction(tx_id)
    }

    pub fn get_transactions(&self, limit: usize) -> Vec<TransactionRecord> {
        self.engine.get_transactions(limit)
    }

    pub fn get_stats(&self) -> Stats {
        self.engine.get_stats()
    }

    pub fn daily_spent(&self, agent: &str) -> f64 {
        self.engine.daily_spent(agent)
    }

    // ── Agents ──────────────────────────────────────────────────────────

    pub fn register_agent(&self, address: &str, name: &str) -> Result<Agent> {
        self.registry.register(address, name)
    }

    pub fn auto_register_agent(&self, address: &str) -> Result<Agent> {
        self.registry.auto_register(address)
    }

    pub fn get_agent(&self, address: &str) -> Option<Agent> {
        self.registry.get_agent(address)
    }

    pub fn list_agents(&self) -> Vec<Agent> {
        self.registry.list_agents()
    }

    pub fn deactivate_agent(&self, address: &str) -> Result<Agent> {
        self.registry.deactivate(address)
    }

    pub fn reactivate_agent(&self, address: &str) -> Result<Agent> {
        self.registry.reactivate(address)
    }

    pub fn set_trust_score(&self, address: &str, score: i64) -> Result<Agent> {
        self.registry.set_trust_score(address, score)
    }

    // ── Policy administration ───────────────────────────────────────────

    pub fn add_to_blacklist(&self, address: &str) -> Result<bool> {
        self.engine.add_to_blacklist(address)
    }

    pub fn remove_from_blacklist(&self, address: &str) -> Result<bool> {
        self.engine.remove_from_blacklist(address)
    }

    pub fn add_to_whitelist(&self, address: &str) -> Result<bool> {
        self.engine.add_to_whitelist(address)
    }

    pub fn remove_from_whitelist(&self, address: &str) -> Result<bool> {
        self.engine.remove_from_whitelist(address)
    }

    pub fn update_thresholds(&self, update: ThresholdUpdate) -> Result<GuardrailConfig> {
        self.engine.update_thresholds(update)
    }

    pub fn config(&self) -> GuardrailConfig {
        self.engine.config()
    }

    // ── Audit and events ────────────────────────────────────────────────

    /// Most recent matching events first.
    pub fn get_audit_logs(&self, limit: usize, filter: &AuditFilter) -> Vec<AuditEvent> {
        self.audit.get_events(limit, filter)
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.events.subscribe()
    }
}
