//! Subcommand implementations and shared output helpers.

pub mod audit;
pub mod check;
pub mod config_cmd;
pub mod demo;
pub mod status;

use std::path::Path;

use aegis_config::{AppConfig, ConfigError};
use aegis_core::Decision;

/// Load the configuration from an explicit path, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env_overrides(|key| std::env::var(key).ok())?;
            config.validate()?;
            Ok(config)
        }
        None => AppConfig::load(),
    }
}

fn decision_icon(decision: &Decision) -> &'static str {
    if decision.is_approved() {
        "✅"
    } else if decision.is_pending() {
        "⏸️"
    } else {
        "⛔"
    }
}

/// Human-readable rendering of one decision.
pub fn print_decision(decision: &Decision) {
    println!(
        "{} {}  (risk {}/100, {})",
        decision_icon(decision),
        decision.decision,
        decision.risk_score,
        decision.risk_level
    );
    println!("   Tx id:   {}", decision.tx_id);
    if let Some(reason) = &decision.block_reason {
        println!("   Reason:  {reason}");
    }
    if !decision.checks_passed.is_empty() {
        println!("   Passed:  {}", decision.checks_passed.join(", "));
    }
    if !decision.checks_failed.is_empty() {
        println!("   Failed:  {}", decision.checks_failed.join(", "));
    }
    for finding in &decision.signals.findings {
        println!("   ⚠️  {finding}");
    }
    println!("   {}", decision.explanation);
}
