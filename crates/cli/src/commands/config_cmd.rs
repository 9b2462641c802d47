//! `aegis config` — Configuration management commands.

use std::path::Path;

use aegis_config::AppConfig;

pub async fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match super::load_config(config_path) {
        Ok(config) => {
            println!("   ✅ Config parsed and validated");

            let mut warnings = Vec::new();
            if config.guardrail.whitelist.is_empty() {
                warnings.push("Whitelist is empty; every transfer is capped at max_tx_value");
            }
            if config.guardrail.high_value_threshold > config.guardrail.max_tx_value {
                warnings.push("high_value_threshold above max_tx_value; PENDING only for whitelisted targets");
            }
            if config.guardrail.daily_limit < config.guardrail.max_tx_value {
                warnings.push("daily_limit below max_tx_value");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Max tx value:  {}", config.guardrail.max_tx_value);
            println!("   Daily limit:   {}", config.guardrail.daily_limit);
            println!("   High value:    {}", config.guardrail.high_value_threshold);
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn defaults() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::default_toml());
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
