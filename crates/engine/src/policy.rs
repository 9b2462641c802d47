//! The policy engine — ordered deterministic checks, risk scoring, and the
//! transactional commit of each decision.

use crate::config::{GuardrailConfig, ThresholdUpdate};
use crate::ledger::{Stats, TransactionLedger};
use crate::scoring::{RiskAssessment, RiskScorer, ScoreInput};
use crate::spend::{SpendLedger, SpendWindow};
use aegis_analyzer::SignalAnalyzer;
use aegis_analyzer::intent::MAX_INTENT_LEN;
use aegis_analyzer::threats::is_burn_address;
use aegis_audit::AuditTrail;
use aegis_core::{
    AuditEventType, Decision, DomainEvent, Error, EventBus, ManualOverride, NewAuditEvent, Outcome,
    Result, RiskLevel, RiskSignals, TransactionRecord, TransactionRequest, TxDecision, Violation,
    normalize_address, short_address,
};
use aegis_registry::AgentRegistry;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Actor recorded on administrative audit events.
pub const ADMIN_ACTOR: &str = "admin";

// Check identifiers, in evaluation order.
const REQUEST_CHECK: &str = "request_check";
const TRUST_CHECK: &str = "trust_check";
const BLACKLIST_CHECK: &str = "blacklist_check";
const BURN_ADDRESS_CHECK: &str = "burn_address_check";
const MAX_VALUE_CHECK: &str = "max_value_check";
const DAILY_LIMIT_CHECK: &str = "daily_limit_check";
const RISK_CHECK: &str = "risk_check";

/// Which list an administrative mutation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddressList {
    Blacklist,
    Whitelist,
}

/// Decision under construction.
struct Evaluation {
    tx_id: String,
    timestamp: DateTime<Utc>,
    passed: Vec<String>,
    failed: Vec<String>,
    notes: Vec<String>,
}

impl Evaluation {
    fn pass(&mut self, check: &str) {
        self.passed.push(check.to_string());
    }

    /// Deterministic block: rendered at the top of the scale.
    fn block(mut self, check: &str, violation: Violation, detail: Option<String>) -> Decision {
        self.failed.push(check.to_string());
        let reason = violation.reason().to_string();
        let explanation = match detail {
            Some(detail) => format!("BLOCKED: {reason} ({detail}). Risk score 100/100 (CRITICAL)."),
            None => format!("BLOCKED: {reason}. Risk score 100/100 (CRITICAL)."),
        };
        Decision {
            tx_id: self.tx_id,
            decision: TxDecision::Blocked,
            risk_score: 100,
            risk_level: RiskLevel::Critical,
            block_reason: Some(reason),
            violation: Some(violation),
            explanation,
            checks_passed: self.passed,
            checks_failed: self.failed,
            signals: RiskSignals::default(),
            timestamp: self.timestamp,
        }
    }

    /// Decision from the risk score.
    fn scored(
        mut self,
        decision: TxDecision,
        violation: Option<Violation>,
        block_reason: Option<String>,
        assessment: &RiskAssessment,
        signals: RiskSignals,
    ) -> Decision {
        if decision == TxDecision::Approved {
            self.pass(RISK_CHECK);
        } else {
            self.failed.push(RISK_CHECK.to_string());
        }

        let mut explanation = format!("{decision}: ");
        match (&block_reason, violation) {
            (Some(reason), _) => explanation.push_str(&format!("{reason}. ")),
            (None, Some(v)) => explanation.push_str(&format!("{}. ", v.reason())),
            (None, None) => {}
        }
        explanation.push_str(&format!(
            "Risk score {}/100 ({}).",
            assessment.score, assessment.level
        ));
        let issues: Vec<&String> = signals.findings.iter().chain(self.notes.iter()).collect();
        if issues.is_empty() {
            explanation.push_str(" No issues found.");
        } else {
            let joined: Vec<&str> = issues.iter().map(|s| s.as_str()).collect();
            explanation.push_str(&format!(" Issues: {}.", joined.join("; ")));
        }

        Decision {
            tx_id: self.tx_id,
            decision,
            risk_score: assessment.score,
            risk_level: assessment.level,
            block_reason,
            violation,
            explanation,
            checks_passed: self.passed,
            checks_failed: self.failed,
            signals,
            timestamp: self.timestamp,
        }
    }
}

/// Evaluates transaction requests against the guardrail policy.
///
/// Thread-safe. Evaluations of the same agent are serialized on that
/// agent's spend window; different agents evaluate in parallel.
pub struct PolicyEngine {
    config: RwLock<GuardrailConfig>,
    registry: Arc<AgentRegistry>,
    analyzer: Box<dyn SignalAnalyzer>,
    scorer: RiskScorer,
    audit: Arc<AuditTrail>,
    spend: SpendLedger,
    ledger: TransactionLedger,
    events: Arc<EventBus>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEngine")
            .field("config", &*self.config.read().unwrap())
            .field("transactions", &self.ledger.len())
            .finish()
    }
}

impl PolicyEngine {
    pub fn new(
        config: GuardrailConfig,
        registry: Arc<AgentRegistry>,
        analyzer: Box<dyn SignalAnalyzer>,
        scorer: RiskScorer,
        audit: Arc<AuditTrail>,
        events: Arc<EventBus>,
    ) -> Self {
        let spend = SpendLedger::new(config.daily_window);
        Self {
            config: RwLock::new(config),
            registry,
            analyzer,
            scorer,
            audit,
            spend,
            ledger: TransactionLedger::new(),
            events,
            sequence: AtomicU64::new(0),
        }
    }

    /// Snapshot of the configuration in effect.
    pub fn config(&self) -> GuardrailConfig {
        self.config.read().unwrap().clone()
    }

    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    fn next_tx_id(&self, request: &TransactionRequest, at: DateTime<Utc>) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut hasher = Sha256::new();
        hasher.update(request.agent_address.as_bytes());
        hasher.update(b"|");
        hasher.update(request.target_address.as_bytes());
        hasher.update(b"|");
        hasher.update(request.value.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(at.to_rfc3339().as_bytes());
        hasher.update(b"|");
        hasher.update(seq.to_le_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("0x{}", &digest[..40])
    }

    // ── Evaluation ──────────────────────────────────────────────────────

    /// Evaluate a request and return the decision.
    ///
    /// The decision's audit event is durable before this returns `Ok`.
    /// On `Err` nothing was committed: no spend, counters or history.
    pub fn validate_transaction(&self, request: TransactionRequest) -> Result<Decision> {
        let agent = normalize_address(&request.agent_address);
        // Unregistered agents get a scratch window and are evaluated as
        // unknown even if they register mid-flight.
        let registered = self.registry.contains(&agent);
        let window = if registered {
            self.spend.window_for(&agent)
        } else {
            Arc::new(Mutex::new(SpendWindow::default()))
        };
        let mut spend = window.lock().unwrap();

        let config = self.config();
        let now = Utc::now();
        let decision = self.evaluate(&request, &agent, registered, &config, &mut spend, now);
        self.commit(request, decision, &agent, &mut spend, now)
    }

    fn evaluate(
        &self,
        request: &TransactionRequest,
        agent: &str,
        registered: bool,
        config: &GuardrailConfig,
        spend: &mut SpendWindow,
        now: DateTime<Utc>,
    ) -> Decision {
        let mut eval = Evaluation {
            tx_id: self.next_tx_id(request, now),
            timestamp: now,
            passed: Vec::new(),
            failed: Vec::new(),
            notes: Vec::new(),
        };
        let target = normalize_address(&request.target_address);
        let value = request.value;

        // 0. Malformed input never reaches policy.
        if !request.has_valid_value() || target.is_empty() {
            return eval.block(
                REQUEST_CHECK,
                Violation::InvalidRequest,
                Some(format!("value {value}, target '{target}'")),
            );
        }
        if let Some(len) = request.intent.as_ref().map(String::len).filter(|n| *n > MAX_INTENT_LEN) {
            return eval.block(
                REQUEST_CHECK,
                Violation::InvalidRequest,
                Some(format!("intent is {len} bytes (max {MAX_INTENT_LEN})")),
            );
        }
        eval.pass(REQUEST_CHECK);

        // 1. Registration and trust.
        let Some(agent_state) = registered.then(|| self.registry.get_agent(agent)).flatten() else {
            return eval.block(TRUST_CHECK, Violation::UnknownAgent, None);
        };
        if !self.registry.is_trusted(agent) {
            let detail = if agent_state.is_active {
                format!("trust score {}", agent_state.trust_score)
            } else {
                "agent is deactivated".to_string()
            };
            return eval.block(TRUST_CHECK, Violation::AgentNotTrusted, Some(detail));
        }
        eval.pass(TRUST_CHECK);

        // 2. Blacklist.
        if config.blacklist.contains(&target) {
            return eval.block(BLACKLIST_CHECK, Violation::Blacklisted, Some(short_address(&target)));
        }
        eval.pass(BLACKLIST_CHECK);

        // 3. Burn addresses behave like implicit blacklist entries.
        if is_burn_address(&target) {
            return eval.block(BURN_ADDRESS_CHECK, Violation::BurnAddress, Some(short_address(&target)));
        }
        eval.pass(BURN_ADDRESS_CHECK);

        // 4. Per-transaction ceiling; whitelisted destinations bypass only this.
        let whitelisted = config.whitelist.contains(&target);
        if value > config.max_tx_value {
            if !whitelisted {
                return eval.block(
                    MAX_VALUE_CHECK,
                    Violation::MaxValueExceeded,
                    Some(format!("{value} > {}", config.max_tx_value)),
                );
            }
            eval.notes
                .push(format!("whitelisted destination bypassed the {} ceiling", config.max_tx_value));
        }
        eval.pass(MAX_VALUE_CHECK);

        // 5. Rolling daily aggregate.
        let spent = spend.total(now, config.daily_window);
        if !spend.fits(value, config.daily_limit, now, config.daily_window) {
            return eval.block(
                DAILY_LIMIT_CHECK,
                Violation::DailyLimitExceeded,
                Some(format!("{spent} spent + {value} > {}", config.daily_limit)),
            );
        }
        eval.pass(DAILY_LIMIT_CHECK);

        // 6. Risk scoring. Any failure here fails closed.
        let signals = match self.analyzer.analyze(request) {
            Ok(signals) => signals,
            Err(e) => {
                warn!(error = %e, agent, "Analyzer failed, blocking");
                return eval.block(RISK_CHECK, Violation::InternalError, Some(e.to_string()));
            }
        };
        let projected_daily_usage = if config.daily_limit > 0.0 {
            (spent + value) / config.daily_limit
        } else {
            0.0
        };
        let assessment = match self.scorer.score(&ScoreInput {
            value,
            high_value_threshold: config.high_value_threshold,
            trust_score: agent_state.trust_score,
            signals: &signals,
            projected_daily_usage,
            whitelisted,
        }) {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(error = %e, agent, "Scoring failed, blocking");
                return eval.block(RISK_CHECK, Violation::InternalError, Some(e.to_string()));
            }
        };
        debug!(agent, score = assessment.score, contributions = ?assessment.contributions, "Risk scored");

        // 7. Threshold decision.
        let bands = self.scorer.bands();
        if assessment.score >= bands.critical {
            let reason = match assessment.dominant_factor() {
                Some(factor) => format!("{}: {factor}", Violation::RiskThreshold.reason()),
                None => Violation::RiskThreshold.reason().to_string(),
            };
            eval.scored(
                TxDecision::Blocked,
                Some(Violation::RiskThreshold),
                Some(reason),
                &assessment,
                signals,
            )
        } else if value >= config.high_value_threshold && assessment.level == RiskLevel::High {
            eval.scored(
                TxDecision::Pending,
                Some(Violation::ManualReviewRequired),
                None,
                &assessment,
                signals,
            )
        } else {
            eval.scored(TxDecision::Approved, None, None, &assessment, signals)
        }
    }

    /// Durably record the decision, then apply its side effects.
    fn commit(
        &self,
        request: TransactionRequest,
        decision: Decision,
        agent: &str,
        spend: &mut SpendWindow,
        now: DateTime<Utc>,
    ) -> Result<Decision> {
        let target = normalize_address(&request.target_address);

        if decision.signals.is_threat() {
            self.audit.log_event(
                NewAuditEvent::new(
                    AuditEventType::ThreatDetected,
                    agent,
                    format!("Threat detected: {}", decision.signals.findings.join("; ")),
                )
                .target(&target)
                .value(request.value)
                .tx_id(&decision.tx_id)
                .risk_score(decision.risk_score),
            )?;
        }

        let (event_type, summary) = match decision.decision {
            TxDecision::Approved => (AuditEventType::TxApproved, "Transaction approved".to_string()),
            TxDecision::Blocked => (
                AuditEventType::TxBlocked,
                format!(
                    "Transaction blocked: {}",
                    decision.block_reason.as_deref().unwrap_or("unspecified")
                ),
            ),
            TxDecision::Pending => (
                AuditEventType::TxPending,
                "Transaction held for manual review".to_string(),
            ),
        };
        let mut draft = NewAuditEvent::new(event_type, agent, summary)
            .target(&target)
            .tx_id(&decision.tx_id)
            .risk_score(decision.risk_score);
        if request.value.is_finite() {
            draft = draft.value(request.value);
        }
        self.audit.log_event(draft)?;

        // Durable from here on.
        if decision.is_approved() {
            spend.record(request.value, now);
        }
        if decision.violation != Some(Violation::UnknownAgent) && self.registry.contains(agent) {
            let outcome = match decision.decision {
                TxDecision::Approved => Outcome::Approved,
                TxDecision::Blocked => Outcome::Blocked,
                TxDecision::Pending => Outcome::Held,
            };
            if let Err(e) = self.registry.record_outcome(agent, outcome) {
                warn!(error = %e, agent, "Failed to record outcome");
            }
        }

        match decision.decision {
            TxDecision::Approved => info!(
                tx_id = %decision.tx_id,
                agent,
                score = decision.risk_score,
                "Transaction APPROVED"
            ),
            TxDecision::Pending => info!(
                tx_id = %decision.tx_id,
                agent,
                score = decision.risk_score,
                "Transaction PENDING manual review"
            ),
            TxDecision::Blocked => warn!(
                tx_id = %decision.tx_id,
                agent,
                score = decision.risk_score,
                reason = ?decision.block_reason,
                "Transaction BLOCKED"
            ),
        }

        if decision.signals.is_threat() {
            self.events.publish(DomainEvent::ThreatDetected {
                tx_id: decision.tx_id.clone(),
                agent_address: agent.to_string(),
                findings: decision.signals.findings.clone(),
                timestamp: now,
            });
        }
        self.events.publish(DomainEvent::DecisionMade {
            tx_id: decision.tx_id.clone(),
            agent_address: agent.to_string(),
            decision: decision.decision,
            risk_score: decision.risk_score,
            risk_level: decision.risk_level,
            timestamp: now,
        });

        self.ledger
            .record(TransactionRecord::new(request, decision.clone()));
        Ok(decision)
    }

    // ── Post-decision operations ────────────────────────────────────────

    /// Resolve a PENDING transaction. Allowed once per transaction.
    ///
    /// Approving reserves the value against the agent's daily window and
    /// fails with a policy violation if it no longer fits.
    pub fn manual_override(
        &self,
        tx_id: &str,
        approve: bool,
        operator: &str,
        note: Option<&str>,
    ) -> Result<TransactionRecord> {
        let snapshot = self
            .ledger
            .get(tx_id)
            .ok_or_else(|| Error::UnknownTransaction(tx_id.to_string()))?;
        let agent = normalize_address(&snapshot.request.agent_address);
        let window = self.spend.window_for(&agent);
        let mut spend = window.lock().unwrap();
        let config = self.config();
        let now = Utc::now();

        let record = self.ledger.update(tx_id, |record| {
            if !record.is_awaiting_review() {
                return Err(Error::NotPending {
                    tx_id: tx_id.to_string(),
                    decision: match &record.manual_override {
                        Some(o) if o.approved => "manually approved".to_string(),
                        Some(_) => "manually rejected".to_string(),
                        None => record.decision.decision.to_string(),
                    },
                });
            }
            let value = record.request.value;
            if approve && !spend.fits(value, config.daily_limit, now, config.daily_window) {
                return Err(Error::PolicyViolation {
                    reason: Violation::DailyLimitExceeded.reason().to_string(),
                });
            }

            let verdict = if approve { "APPROVED" } else { "REJECTED" };
            let mut description = format!("Manual override by {operator}: {verdict}");
            if let Some(note) = note {
                description.push_str(&format!(". Note: {note}"));
            }
            self.audit.log_event(
                NewAuditEvent::new(AuditEventType::ManualOverride, &agent, description)
                    .target(normalize_address(&record.request.target_address))
                    .value(value)
                    .tx_id(tx_id)
                    .risk_score(record.decision.risk_score),
            )?;

            if approve {
                spend.record(value, now);
            }
            record.manual_override = Some(ManualOverride {
                approved: approve,
                operator: operator.to_string(),
                note: note.map(String::from),
                decided_at: now,
            });
            Ok(record.clone())
        })?;

        info!(tx_id, operator, approved = approve, "Manual override recorded");
        Ok(record)
    }

    /// Note that a cleared transaction was broadcast as `tx_hash`.
    pub fn record_broadcast(&self, tx_id: &str, tx_hash: &str) -> Result<TransactionRecord> {
        let record = self.ledger.update(tx_id, |record| {
            if !record.is_cleared() {
                return Err(Error::PolicyViolation {
                    reason: format!("transaction {tx_id} was not approved for broadcast"),
                });
            }
            if let Some(existing) = &record.broadcast_hash {
                return Err(Error::PolicyViolation {
                    reason: format!("transaction {tx_id} already broadcast as {existing}"),
                });
            }
            self.audit.log_event(
                NewAuditEvent::new(
                    AuditEventType::TxBroadcast,
                    normalize_address(&record.request.agent_address),
                    format!("Transaction broadcast as {tx_hash}"),
                )
                .target(normalize_address(&record.request.target_address))
                .value(record.request.value)
                .tx_id(tx_id)
                .risk_score(record.decision.risk_score),
            )?;
            record.broadcast_hash = Some(tx_hash.to_string());
            Ok(record.clone())
        })?;

        info!(tx_id, tx_hash, "Broadcast recorded");
        self.events.publish(DomainEvent::TransactionBroadcast {
            tx_id: tx_id.to_string(),
            tx_hash: tx_hash.to_string(),
            timestamp: Utc::now(),
        });
        Ok(record)
    }

    pub fn get_transaction(&self, tx_id: &str) -> Option<TransactionRecord> {
        self.ledger.get(tx_id)
    }

    /// Recent transactions, most recent first.
    pub fn get_transactions(&self, limit: usize) -> Vec<TransactionRecord> {
        self.ledger.recent(limit)
    }

    pub fn get_stats(&self) -> Stats {
        self.ledger.stats()
    }

    /// Approved spend for `agent` in the current window.
    pub fn daily_spent(&self, agent: &str) -> f64 {
        self.spend.spent(agent, Utc::now())
    }

    // ── Administration ──────────────────────────────────────────────────

    pub fn add_to_blacklist(&self, address: &str) -> Result<bool> {
        self.mutate_list(AddressList::Blacklist, address, true)
    }

    pub fn remove_from_blacklist(&self, address: &str) -> Result<bool> {
        self.mutate_list(AddressList::Blacklist, address, false)
    }

    pub fn add_to_whitelist(&self, address: &str) -> Result<bool> {
        self.mutate_list(AddressList::Whitelist, address, true)
    }

    pub fn remove_from_whitelist(&self, address: &str) -> Result<bool> {
        self.mutate_list(AddressList::Whitelist, address, false)
    }

    /// Add or remove `address`. Returns whether the list changed; no-ops
    /// are not audited.
    fn mutate_list(&self, list: AddressList, address: &str, add: bool) -> Result<bool> {
        let address = normalize_address(address);
        if address.is_empty() {
            return Err(Error::config("address must not be empty"));
        }

        let mut config = self.config.write().unwrap();
        let set = match list {
            AddressList::Blacklist => &mut config.blacklist,
            AddressList::Whitelist => &mut config.whitelist,
        };
        if set.contains(&address) == add {
            return Ok(false);
        }

        let (event_type, verb) = match (list, add) {
            (AddressList::Blacklist, true) => (AuditEventType::BlacklistAdded, "added to blacklist"),
            (AddressList::Blacklist, false) => (AuditEventType::BlacklistRemoved, "removed from blacklist"),
            (AddressList::Whitelist, true) => (AuditEventType::WhitelistAdded, "added to whitelist"),
            (AddressList::Whitelist, false) => (AuditEventType::WhitelistRemoved, "removed from whitelist"),
        };
        self.audit.log_event(
            NewAuditEvent::new(event_type, ADMIN_ACTOR, format!("{address} {verb}")).target(&address),
        )?;

        if add {
            set.insert(address.clone());
        } else {
            set.remove(&address);
        }
        info!(address = %address, "Address {verb}");
        Ok(true)
    }

    /// Replace thresholds. Invalid values are rejected, never clamped.
    pub fn update_thresholds(&self, update: ThresholdUpdate) -> Result<GuardrailConfig> {
        let mut config = self.config.write().unwrap();
        let next = config.with_update(&update)?;
        if update.is_empty() {
            return Ok(next);
        }

        self.audit.log_event(NewAuditEvent::new(
            AuditEventType::ThresholdsUpdated,
            ADMIN_ACTOR,
            format!(
                "Thresholds updated from [{}] to [{}]",
                config.describe_thresholds(),
                next.describe_thresholds()
            ),
        ))?;
        *config = next.clone();
        info!(thresholds = %next.describe_thresholds(), "Thresholds updated");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_analyzer::IntentAnalyzer;
    use aegis_config::TrustPolicy;
    use aegis_core::AuditFilter;

    const AGENT: &str = "0x1111111111111111111111111111111111111111";
    const STRANGER: &str = "0x9999999999999999999999999999999999999999";
    const UNISWAP_V2: &str = "0x7a250d5630b4cf539739df2c5dacb4c659f2488d";

    fn engine() -> (PolicyEngine, Arc<AgentRegistry>, Arc<AuditTrail>) {
        let audit = Arc::new(AuditTrail::in_memory());
        let registry = Arc::new(AgentRegistry::new(TrustPolicy::default(), audit.clone()));
        let engine = PolicyEngine::new(
            GuardrailConfig::default(),
            registry.clone(),
            Box::new(IntentAnalyzer::new().unwrap()),
            RiskScorer::default(),
            audit.clone(),
            Arc::new(EventBus::default()),
        );
        (engine, registry, audit)
    }

    #[test]
    fn tx_ids_are_unique_and_well_formed() {
        let (engine, _, _) = engine();
        let request = TransactionRequest::new(AGENT, STRANGER, 0.1);
        let now = Utc::now();
        let a = engine.next_tx_id(&request, now);
        let b = engine.next_tx_id(&request, now);
        assert_ne!(a, b);
        assert_eq!(a.len(), 42);
        assert!(a.starts_with("0x"));
        assert!(a[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn checks_recorded_in_order() {
        let (engine, registry, _) = engine();
        registry.register(AGENT, "trader").unwrap();
        let decision = engine
            .validate_transaction(TransactionRequest::new(AGENT, UNISWAP_V2, 0.1))
            .unwrap();
        assert!(decision.is_approved());
        assert_eq!(
            decision.checks_passed,
            vec![
                REQUEST_CHECK,
                TRUST_CHECK,
                BLACKLIST_CHECK,
                BURN_ADDRESS_CHECK,
                MAX_VALUE_CHECK,
                DAILY_LIMIT_CHECK,
                RISK_CHECK
            ]
        );
        assert!(decision.checks_failed.is_empty());
        assert!(decision.explanation.starts_with("APPROVED"));
    }

    #[test]
    fn negative_value_is_invalid() {
        let (engine, registry, _) = engine();
        registry.register(AGENT, "trader").unwrap();
        let decision = engine
            .validate_transaction(TransactionRequest::new(AGENT, STRANGER, -0.5))
            .unwrap();
        assert!(decision.is_blocked());
        assert_eq!(decision.violation, Some(Violation::InvalidRequest));
        assert_eq!(decision.checks_failed, vec![REQUEST_CHECK]);
    }

    #[test]
    fn oversized_intent_is_invalid_request() {
        let (engine, registry, _) = engine();
        registry.register(AGENT, "trader").unwrap();
        let decision = engine
            .validate_transaction(
                TransactionRequest::new(AGENT, UNISWAP_V2, 0.1).with_intent("a".repeat(MAX_INTENT_LEN + 1)),
            )
            .unwrap();
        assert_eq!(decision.violation, Some(Violation::InvalidRequest));
        assert_eq!(decision.checks_failed, vec![REQUEST_CHECK]);
        assert!(decision.explanation.contains("intent is"));
    }

    #[test]
    fn unknown_agents_leave_no_spend_state() {
        let (engine, registry, _) = engine();
        for i in 0..50u32 {
            let agent = format!("0x{i:040x}");
            let decision = engine
                .validate_transaction(TransactionRequest::new(&agent, UNISWAP_V2, 0.1))
                .unwrap();
            assert_eq!(decision.violation, Some(Violation::UnknownAgent));
        }
        assert!(engine.spend.is_empty());

        registry.register(AGENT, "trader").unwrap();
        engine
            .validate_transaction(TransactionRequest::new(AGENT, UNISWAP_V2, 0.1))
            .unwrap();
        assert_eq!(engine.spend.len(), 1);
    }

    #[test]
    fn deactivated_agent_is_not_trusted() {
        let (engine, registry, _) = engine();
        registry.register(AGENT, "trader").unwrap();
        registry.deactivate(AGENT).unwrap();
        let decision = engine
            .validate_transaction(TransactionRequest::new(AGENT, STRANGER, 0.1))
            .unwrap();
        assert_eq!(decision.violation, Some(Violation::AgentNotTrusted));
        assert!(decision.block_reason.unwrap().contains("not trusted"));
        assert!(decision.explanation.contains("deactivated"));
    }

    #[test]
    fn approved_spend_counts_toward_window() {
        let (engine, registry, _) = engine();
        registry.register(AGENT, "trader").unwrap();
        engine
            .validate_transaction(TransactionRequest::new(AGENT, UNISWAP_V2, 0.3))
            .unwrap();
        assert!((engine.daily_spent(AGENT) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn blocked_spend_does_not_count() {
        let (engine, registry, _) = engine();
        registry.register(AGENT, "trader").unwrap();
        engine
            .validate_transaction(TransactionRequest::new(AGENT, STRANGER, 2.0))
            .unwrap();
        assert_eq!(engine.daily_spent(AGENT), 0.0);
    }

    #[test]
    fn list_mutations_audit_only_changes() {
        let (engine, _, audit) = engine();
        assert!(engine.add_to_blacklist("0xBAD").unwrap());
        assert!(!engine.add_to_blacklist("0xbad").unwrap());
        assert!(engine.remove_from_blacklist("0xbad").unwrap());
        assert!(!engine.remove_from_whitelist("0xnotthere").unwrap());

        let events = audit.get_events(10, &AuditFilter::new());
        let types: Vec<AuditEventType> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![AuditEventType::BlacklistRemoved, AuditEventType::BlacklistAdded]
        );
        assert_eq!(events[0].target_address.as_deref(), Some("0xbad"));
    }

    #[test]
    fn empty_address_rejected() {
        let (engine, _, _) = engine();
        assert!(matches!(engine.add_to_whitelist("  "), Err(Error::Config { .. })));
    }

    #[test]
    fn threshold_update_audited_and_applied() {
        let (engine, _, audit) = engine();
        let next = engine
            .update_thresholds(ThresholdUpdate::new().max_tx_value(2.0))
            .unwrap();
        assert_eq!(next.max_tx_value, 2.0);
        assert_eq!(engine.config().max_tx_value, 2.0);
        assert_eq!(audit.count(), 1);

        assert!(engine.update_thresholds(ThresholdUpdate::new().daily_limit(-5.0)).is_err());
        assert_eq!(engine.config().daily_limit, 5.0);
        assert_eq!(audit.count(), 1);
    }
}
