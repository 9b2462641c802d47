//! Agent registry — registration, trust lookups and outcome accounting.

use aegis_audit::AuditTrail;
use aegis_config::TrustPolicy;
use aegis_core::agent::MAX_TRUST_SCORE;
use aegis_core::{
    Agent, AuditEventType, DomainEvent, Error, EventBus, NewAuditEvent, Outcome, RegistryError,
    Result, normalize_address, short_address,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

/// Thread-safe registry of agents.
///
/// The map lock is only held exclusively to insert; updates to an existing
/// agent lock that agent alone, so different agents mutate in parallel.
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, Arc<Mutex<Agent>>>>,
    policy: TrustPolicy,
    audit: Arc<AuditTrail>,
    events: Option<Arc<EventBus>>,
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agent_count", &self.count())
            .field("policy", &self.policy)
            .finish()
    }
}

impl AgentRegistry {
    pub fn new(policy: TrustPolicy, audit: Arc<AuditTrail>) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            policy,
            audit,
            events: None,
        }
    }

    /// Publish registrations on `bus`.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }

    // ── Registration ────────────────────────────────────────────────────

    /// Register a new agent with the default trust score.
    ///
    /// Fails with [`RegistryError::AlreadyRegistered`] for a known address,
    /// or with a storage error if the audit event could not be recorded (in
    /// which case the agent is not created).
    pub fn register(&self, address: &str, name: &str) -> Result<Agent> {
        let address = normalize_address(address);
        let mut agents = self.agents.write().unwrap();
        if agents.contains_key(&address) {
            return Err(RegistryError::AlreadyRegistered(address).into());
        }

        let agent = Agent::new(&address, name, self.policy.default_score);
        self.audit.log_event(NewAuditEvent::new(
            AuditEventType::AgentRegistered,
            &address,
            format!("Agent '{name}' registered with trust score {}", agent.trust_score),
        ))?;
        agents.insert(address.clone(), Arc::new(Mutex::new(agent.clone())));
        drop(agents);

        info!(agent = %address, name, trust = agent.trust_score, "Agent registered");
        self.publish_registered(&address, false);
        Ok(agent)
    }

    /// Return the agent at `address`, registering it on first sight.
    ///
    /// Emits AGENT_AUTO_REGISTERED only for the call that creates the agent.
    pub fn auto_register(&self, address: &str) -> Result<Agent> {
        let address = normalize_address(address);
        if let Some(agent) = self.get_agent(&address) {
            return Ok(agent);
        }

        let mut agents = self.agents.write().unwrap();
        // Another caller may have won the race for the write lock.
        if let Some(existing) = agents.get(&address) {
            return Ok(existing.lock().unwrap().clone());
        }

        let name = format!("auto-{}", short_address(&address));
        let mut agent = Agent::new(&address, &name, self.policy.default_score);
        agent.auto_registered = true;
        self.audit.log_event(NewAuditEvent::new(
            AuditEventType::AgentAutoRegistered,
            &address,
            format!("Agent auto-registered on first use as '{name}'"),
        ))?;
        agents.insert(address.clone(), Arc::new(Mutex::new(agent.clone())));
        drop(agents);

        info!(agent = %address, "Agent auto-registered");
        self.publish_registered(&address, true);
        Ok(agent)
    }

    fn publish_registered(&self, address: &str, auto: bool) {
        if let Some(bus) = &self.events {
            bus.publish(DomainEvent::AgentRegistered {
                address: address.to_string(),
                auto,
                timestamp: Utc::now(),
            });
        }
    }

    // ── Lookups ─────────────────────────────────────────────────────────

    fn handle(&self, address: &str) -> Option<Arc<Mutex<Agent>>> {
        self.agents
            .read()
            .unwrap()
            .get(&normalize_address(address))
            .cloned()
    }

    fn handle_or_err(&self, address: &str) -> Result<Arc<Mutex<Agent>>> {
        self.handle(address)
            .ok_or_else(|| RegistryError::UnknownAgent(normalize_address(address)).into())
    }

    /// Snapshot of the agent at `address`.
    pub fn get_agent(&self, address: &str) -> Option<Agent> {
        self.handle(address).map(|a| a.lock().unwrap().clone())
    }

    pub fn contains(&self, address: &str) -> bool {
        self.handle(address).is_some()
    }

    /// Registered, active, and at or above the trust floor.
    pub fn is_trusted(&self, address: &str) -> bool {
        self.handle(address).is_some_and(|a| {
            let agent = a.lock().unwrap();
            agent.is_active && agent.trust_score >= self.policy.min_trusted_score
        })
    }

    /// All agents, oldest registration first.
    pub fn list_agents(&self) -> Vec<Agent> {
        let mut agents: Vec<Agent> = self
            .agents
            .read()
            .unwrap()
            .values()
            .map(|a| a.lock().unwrap().clone())
            .collect();
        agents.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.address.cmp(&b.address))
        });
        agents
    }

    pub fn count(&self) -> usize {
        self.agents.read().unwrap().len()
    }

    // ── Mutations ───────────────────────────────────────────────────────

    /// Account for one evaluated transaction and drift the trust score.
    ///
    /// Approvals add `approval_reward`, blocks subtract `block_penalty`,
    /// held transactions only count. The score stays within 0..=100.
    pub fn record_outcome(&self, address: &str, outcome: Outcome) -> Result<Agent> {
        let handle = self.handle_or_err(address)?;
        let mut agent = handle.lock().unwrap();
        agent.tx_count += 1;
        match outcome {
            Outcome::Approved => {
                agent.trust_score = agent
                    .trust_score
                    .saturating_add(self.policy.approval_reward)
                    .min(MAX_TRUST_SCORE);
            }
            Outcome::Blocked => {
                agent.blocked_count += 1;
                agent.trust_score = agent.trust_score.saturating_sub(self.policy.block_penalty);
            }
            Outcome::Held => {}
        }
        debug!(
            agent = %agent.address,
            ?outcome,
            trust = agent.trust_score,
            tx_count = agent.tx_count,
            "Outcome recorded"
        );
        Ok(agent.clone())
    }

    pub fn deactivate(&self, address: &str) -> Result<Agent> {
        self.set_active(address, false)
    }

    pub fn reactivate(&self, address: &str) -> Result<Agent> {
        self.set_active(address, true)
    }

    fn set_active(&self, address: &str, active: bool) -> Result<Agent> {
        let handle = self.handle_or_err(address)?;
        let mut agent = handle.lock().unwrap();
        agent.is_active = active;
        info!(agent = %agent.address, active, "Agent activation changed");
        Ok(agent.clone())
    }

    /// Administrative trust override. Out-of-range scores are rejected.
    pub fn set_trust_score(&self, address: &str, score: i64) -> Result<Agent> {
        let score = u8::try_from(score)
            .ok()
            .filter(|s| *s <= MAX_TRUST_SCORE)
            .ok_or(Error::Registry(RegistryError::InvalidTrustScore(score)))?;
        let handle = self.handle_or_err(address)?;
        let mut agent = handle.lock().unwrap();
        agent.trust_score = score;
        info!(agent = %agent.address, trust = score, "Trust score set");
        Ok(agent.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::AuditFilter;

    const AGENT: &str = "0x1111111111111111111111111111111111111111";

    fn registry() -> (AgentRegistry, Arc<AuditTrail>) {
        let audit = Arc::new(AuditTrail::in_memory());
        (AgentRegistry::new(TrustPolicy::default(), audit.clone()), audit)
    }

    #[test]
    fn register_creates_default_agent_and_audits() {
        let (registry, audit) = registry();
        let agent = registry.register(AGENT, "trader").unwrap();
        assert_eq!(agent.trust_score, 50);
        assert!(agent.is_active);
        assert_eq!(agent.tx_count, 0);
        assert!(!agent.auto_registered);

        let events = audit.get_events(10, &AuditFilter::new());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, AuditEventType::AgentRegistered);
        assert_eq!(events[0].agent_address, AGENT);
    }

    #[test]
    fn duplicate_registration_fails() {
        let (registry, audit) = registry();
        registry.register(AGENT, "trader").unwrap();
        let err = registry.register(&AGENT.to_uppercase().replace("0X", "0x"), "again");
        assert!(matches!(
            err,
            Err(Error::Registry(RegistryError::AlreadyRegistered(_)))
        ));
        assert_eq!(audit.count(), 1);
    }

    #[test]
    fn auto_register_is_idempotent() {
        let (registry, audit) = registry();
        let first = registry.auto_register(AGENT).unwrap();
        let second = registry.auto_register(AGENT).unwrap();
        assert_eq!(first, second);
        assert!(first.auto_registered);
        assert!(first.name.starts_with("auto-0x111111"));

        let auto_events = audit.get_events(
            10,
            &AuditFilter::new()
                .event_type(AuditEventType::AgentAutoRegistered)
                .event_type(AuditEventType::AgentRegistered),
        );
        assert_eq!(auto_events.len(), 1);
    }

    #[test]
    fn auto_register_returns_explicit_registration() {
        let (registry, audit) = registry();
        registry.register(AGENT, "named").unwrap();
        let agent = registry.auto_register(AGENT).unwrap();
        assert_eq!(agent.name, "named");
        assert_eq!(audit.count(), 1);
    }

    #[test]
    fn trust_requires_registration_activity_and_floor() {
        let (registry, _) = registry();
        assert!(!registry.is_trusted(AGENT));

        registry.register(AGENT, "trader").unwrap();
        assert!(registry.is_trusted(AGENT));

        registry.deactivate(AGENT).unwrap();
        assert!(!registry.is_trusted(AGENT));
        registry.reactivate(AGENT).unwrap();
        assert!(registry.is_trusted(AGENT));

        registry.set_trust_score(AGENT, 0).unwrap();
        assert!(!registry.is_trusted(AGENT));
    }

    #[test]
    fn outcomes_update_counters_and_drift_monotonically() {
        let (registry, _) = registry();
        registry.register(AGENT, "trader").unwrap();

        let a = registry.record_outcome(AGENT, Outcome::Approved).unwrap();
        assert_eq!(a.trust_score, 51);
        assert_eq!((a.tx_count, a.blocked_count), (1, 0));

        let b = registry.record_outcome(AGENT, Outcome::Blocked).unwrap();
        assert_eq!(b.trust_score, 46);
        assert_eq!((b.tx_count, b.blocked_count), (2, 1));

        let h = registry.record_outcome(AGENT, Outcome::Held).unwrap();
        assert_eq!(h.trust_score, 46);
        assert_eq!((h.tx_count, h.blocked_count), (3, 1));
    }

    #[test]
    fn trust_score_is_clamped() {
        let (registry, _) = registry();
        registry.register(AGENT, "trader").unwrap();

        registry.set_trust_score(AGENT, 100).unwrap();
        let up = registry.record_outcome(AGENT, Outcome::Approved).unwrap();
        assert_eq!(up.trust_score, 100);

        registry.set_trust_score(AGENT, 3).unwrap();
        let down = registry.record_outcome(AGENT, Outcome::Blocked).unwrap();
        assert_eq!(down.trust_score, 0);
        assert!(!registry.is_trusted(AGENT));
    }

    #[test]
    fn invalid_trust_score_rejected() {
        let (registry, _) = registry();
        registry.register(AGENT, "trader").unwrap();
        for bad in [-1, 101, 1000] {
            assert!(matches!(
                registry.set_trust_score(AGENT, bad),
                Err(Error::Registry(RegistryError::InvalidTrustScore(_)))
            ));
        }
        assert_eq!(registry.get_agent(AGENT).unwrap().trust_score, 50);
    }

    #[test]
    fn unknown_agent_mutations_fail() {
        let (registry, _) = registry();
        assert!(matches!(
            registry.record_outcome(AGENT, Outcome::Approved),
            Err(Error::Registry(RegistryError::UnknownAgent(_)))
        ));
        assert!(registry.deactivate(AGENT).is_err());
    }

    #[test]
    fn list_agents_in_registration_order() {
        let (registry, _) = registry();
        registry.register("0xaaa", "first").unwrap();
        registry.register("0xbbb", "second").unwrap();
        let names: Vec<String> = registry.list_agents().into_iter().map(|a| a.name).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"first".to_string()));
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn concurrent_auto_register_emits_once() {
        let (registry, audit) = registry();
        let registry = Arc::new(registry);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.auto_register(AGENT).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(audit.count(), 1);
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn registration_published_on_bus() {
        let audit = Arc::new(AuditTrail::in_memory());
        let bus = Arc::new(EventBus::new(8));
        let mut rx = bus.subscribe();
        let registry = AgentRegistry::new(TrustPolicy::default(), audit).with_event_bus(bus);

        registry.auto_register(AGENT).unwrap();
        match rx.recv().await.unwrap().as_ref() {
            DomainEvent::AgentRegistered { address, auto, .. } => {
                assert_eq!(address, AGENT);
                assert!(*auto);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
