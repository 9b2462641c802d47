//! `aegis status` — Show the effective policy and audit store.

use std::path::Path;

use aegis_config::{AppConfig, AuditBackend};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let guardrail = &config.guardrail;
    let bands = &config.risk.bands;

    println!("🛡️  Aegis Status");
    println!("==================");
    println!("  Config dir:      {}", AppConfig::config_dir().display());
    println!("  Max tx value:    {}", guardrail.max_tx_value);
    println!("  Daily limit:     {} per {}h", guardrail.daily_limit, guardrail.daily_window_hours);
    println!("  High value at:   {}", guardrail.high_value_threshold);
    println!(
        "  Risk bands:      medium {} / high {} / critical {}",
        bands.medium, bands.high, bands.critical
    );
    println!("  Blacklist:       {} addresses", guardrail.blacklist.len());
    println!("  Whitelist:       {} addresses", guardrail.whitelist.len());
    println!(
        "  Trust:           default {}, trusted from {}",
        config.trust.default_score, config.trust.min_trusted_score
    );

    match config.audit.backend {
        AuditBackend::Memory => println!("  Audit:           memory (not persisted)"),
        AuditBackend::Jsonl => {
            let path = config.audit.resolved_path();
            println!("  Audit:           jsonl {}", path.display());
            if path.exists() {
                let lines = std::fs::read_to_string(&path)?.lines().count();
                println!("\n  ✅ Audit log present ({lines} events)");
            } else {
                println!("\n  ⚠️  Audit log not created yet");
            }
        }
    }

    Ok(())
}
