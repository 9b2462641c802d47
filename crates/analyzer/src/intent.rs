//! Intent consistency analysis.
//!
//! Compares the free-text intent, the protocol label and the call selector
//! against the actual target and value, and reports every inconsistency.

use crate::threats::{
    self, KnownProtocol, SelectorClass, injection_matches, is_burn_address, lookup_selector,
    protocols_named_in,
};
use aegis_core::{AnalyzerError, RiskSignals, TransactionRequest, normalize_address, short_address};
use regex_lite::Regex;
use tracing::debug;

/// Longest intent the analyzer will scan.
pub const MAX_INTENT_LEN: usize = 4096;

/// Stated and actual amounts may differ by this much before it counts.
pub const AMOUNT_TOLERANCE: f64 = 0.001;

/// Words after "to" that do not name a person.
const NON_RECIPIENTS: &[&str] = &[
    "the", "a", "an", "my", "your", "our", "their", "his", "her", "its", "this", "that", "these",
    "those", "it", "me", "us", "them", "him", "myself", "self", "address", "contract", "wallet",
    "account", "pool", "router", "protocol", "vault", "treasury", "recipient", "target", "eth",
    "weth", "usdc", "usdt", "dai", "wbtc",
];

/// Produces risk evidence for a transaction request.
///
/// Implementations must be deterministic and free of I/O. An `Err` makes
/// the engine fail closed.
pub trait SignalAnalyzer: Send + Sync {
    fn analyze(&self, request: &TransactionRequest) -> Result<RiskSignals, AnalyzerError>;
}

/// The built-in heuristic analyzer.
#[derive(Debug, Clone)]
pub struct IntentAnalyzer {
    address_re: Regex,
    amount_re: Regex,
    recipient_re: Regex,
}

fn compile(pattern: &str) -> Result<Regex, AnalyzerError> {
    Regex::new(pattern).map_err(|e| AnalyzerError::Pattern(e.to_string()))
}

impl IntentAnalyzer {
    pub fn new() -> Result<Self, AnalyzerError> {
        Ok(Self {
            address_re: compile(r"\b0x[a-fA-F0-9]{40}\b")?,
            amount_re: compile(r"(?i)(\d+\.?\d*)\s*eth")?,
            recipient_re: compile(
                r"(?i)\b(?:send|pay|transfer|give|tip)\b[^\n;]{0,80}?\bto\s+([A-Za-z][A-Za-z']*)",
            )?,
        })
    }

    /// Informal recipient named after "send ... to", if any.
    fn informal_recipient(&self, intent: &str) -> Option<String> {
        self.recipient_re
            .captures_iter(intent)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_lowercase()))
            .find(|word| {
                !NON_RECIPIENTS.contains(&word.as_str()) && protocols_named_in(word).is_empty()
            })
    }

    fn check_intent(&self, intent: &str, request: &TransactionRequest, target: &str, signals: &mut RiskSignals) {
        let injections = injection_matches(intent);
        if !injections.is_empty() {
            signals.injection_detected = true;
            signals.findings.push(format!(
                "prompt injection pattern in intent: '{}'",
                injections[0]
            ));
            signals.injection_patterns = injections.into_iter().map(String::from).collect();
        }

        let mentioned: Vec<String> = self
            .address_re
            .find_iter(intent)
            .map(|m| normalize_address(m.as_str()))
            .collect();
        if let Some(first) = mentioned.first() {
            if !mentioned.iter().any(|a| a == target) {
                signals.intent_target_mismatch = true;
                signals.findings.push(format!(
                    "intent mentions {} but target is {}",
                    short_address(first),
                    short_address(target)
                ));
            }
        } else if let Some(name) = self.informal_recipient(intent) {
            signals.ambiguous_recipient = true;
            signals
                .findings
                .push(format!("intent names recipient '{name}' without an address"));
        }

        let stated = self
            .amount_re
            .captures(intent)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok());
        if let Some(stated) = stated {
            if (stated - request.value).abs() > AMOUNT_TOLERANCE {
                signals.amount_mismatch = true;
                signals.findings.push(format!(
                    "intent says {stated} ETH but value is {} ETH",
                    request.value
                ));
            }
        }
    }

    fn check_protocol(&self, request: &TransactionRequest, target: &str, signals: &mut RiskSignals) {
        let mut named: Vec<&'static KnownProtocol> = Vec::new();
        for text in [request.intent.as_deref(), request.protocol.as_deref()]
            .into_iter()
            .flatten()
        {
            for protocol in protocols_named_in(text) {
                if !named.iter().any(|p| p.name == protocol.name) {
                    named.push(protocol);
                }
            }
        }

        // Only protocols with catalogued contracts can contradict the target.
        let checkable: Vec<&KnownProtocol> =
            named.iter().copied().filter(|p| !p.addresses.is_empty()).collect();
        if !checkable.is_empty() && !checkable.iter().any(|p| p.addresses.contains(&target)) {
            signals.intent_target_mismatch = true;
            let names: Vec<&str> = checkable.iter().map(|p| p.name).collect();
            let actual = threats::protocol_for_address(target)
                .map_or_else(|| short_address(target), |p| format!("a {} contract", p.name));
            signals.findings.push(format!(
                "request names {} but target is {actual}",
                names.join("/")
            ));
        }

        if let Some(label) = request.protocol.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            if protocols_named_in(label).is_empty() {
                signals.unknown_protocol = true;
                signals
                    .findings
                    .push(format!("protocol '{label}' is not a known audited protocol"));
            }
        }
    }
}

impl SignalAnalyzer for IntentAnalyzer {
    fn analyze(&self, request: &TransactionRequest) -> Result<RiskSignals, AnalyzerError> {
        if let Some(intent) = &request.intent {
            if intent.len() > MAX_INTENT_LEN {
                return Err(AnalyzerError::InvalidInput(format!(
                    "intent is {} bytes (max {MAX_INTENT_LEN})",
                    intent.len()
                )));
            }
        }

        let target = normalize_address(&request.target_address);
        let mut signals = RiskSignals::default();

        if is_burn_address(&target) {
            signals.is_zero_or_burn_address = true;
            signals
                .findings
                .push(format!("target {} is a zero or burn address", short_address(&target)));
        }

        if let Some(selector) = request.function_sig.as_deref().and_then(lookup_selector) {
            match selector.class {
                SelectorClass::Drain => {
                    signals.is_drain_pattern = true;
                    signals.findings.push(format!(
                        "drain function {} ({})",
                        selector.name, selector.description
                    ));
                }
                SelectorClass::Elevated | SelectorClass::Sensitive => {
                    signals.risky_function = Some(selector.name.to_string());
                    signals.findings.push(format!(
                        "risky function {} ({})",
                        selector.name, selector.description
                    ));
                }
            }
        }

        if let Some(intent) = request.intent.as_deref() {
            self.check_intent(intent, request, &target, &mut signals);
        }
        self.check_protocol(request, &target, &mut signals);

        debug!(
            target = %short_address(&target),
            findings = signals.findings.len(),
            threat = signals.is_threat(),
            "Intent analyzed"
        );
        Ok(signals)
    }
}
