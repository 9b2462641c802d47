//! `aegis check` — Evaluate one transaction request.
//!
//! Each run is a stateless dry run: registry, spend window and audit trail
//! all live in memory, so nothing carries over between runs and the
//! persisted log is untouched.

use std::path::Path;

use aegis_audit::AuditTrail;
use aegis_config::AppConfig;
use aegis_core::TransactionRequest;
use aegis_engine::Guardrail;

pub fn build_request(
    agent: String,
    target: String,
    value: f64,
    intent: Option<String>,
    protocol: Option<String>,
    function_sig: Option<String>,
) -> TransactionRequest {
    let mut request = TransactionRequest::new(agent, target, value);
    request.intent = intent;
    request.protocol = protocol;
    request.function_sig = function_sig;
    request
}

pub fn dry_run_guardrail(config: AppConfig) -> aegis_core::Result<Guardrail> {
    Guardrail::builder(config)
        .audit_trail(AuditTrail::in_memory())
        .build()
}

pub async fn run(
    config_path: Option<&Path>,
    request: TransactionRequest,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let guardrail = dry_run_guardrail(config)?;

    let decision = guardrail.submit_transaction(request)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        super::print_decision(&decision);
    }
    Ok(())
}
