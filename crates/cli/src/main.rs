//! Aegis CLI — the main entry point.
//!
//! Commands:
//! - `check`   — Dry-run one transaction request
//! - `demo`    — Run scripted legitimate and attack scenarios
//! - `audit`   — List persisted audit events
//! - `status`  — Show the effective policy
//! - `config`  — Show, validate or locate configuration

use std::path::PathBuf;

use aegis_core::AuditEventType;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "aegis",
    about = "Aegis — transaction guardrail for autonomous agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs and results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Path to config.toml
    #[arg(short, long, global = true, env = "AEGIS_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Dry-run one transaction request against the configured policy (nothing persists between runs)
    Check {
        /// Agent wallet address (auto-registered if unseen)
        #[arg(long)]
        agent: String,

        /// Destination address
        #[arg(long)]
        target: String,

        /// Transfer value in ETH
        #[arg(long)]
        value: f64,

        /// What the agent believes it is doing
        #[arg(long)]
        intent: Option<String>,

        /// Protocol label, e.g. Uniswap
        #[arg(long)]
        protocol: Option<String>,

        /// 4-byte call selector, e.g. 0xa9059cbb
        #[arg(long = "function")]
        function_sig: Option<String>,
    },

    /// Run scripted legitimate and attack scenarios in memory
    Demo,

    /// List persisted audit events, newest first
    Audit {
        /// Only events of this type (e.g. TX_BLOCKED)
        #[arg(long = "type")]
        event_type: Option<AuditEventType>,

        /// Only events for this agent
        #[arg(long)]
        agent: Option<String>,

        /// Only events for this transaction id
        #[arg(long)]
        tx: Option<String>,

        /// Maximum number of events
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Show the effective policy and audit store
    Status,

    /// Configuration management (prints the defaults when no action is given)
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the built-in defaults
    Defaults,
    /// Validate the configuration file
    Validate,
    /// Print the default config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so results stay pipeable
    let filter = if cli.verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Check {
            agent,
            target,
            value,
            intent,
            protocol,
            function_sig,
        } => {
            let request =
                commands::check::build_request(agent, target, value, intent, protocol, function_sig);
            commands::check::run(config_path, request, cli.json).await?
        }
        Commands::Demo => commands::demo::run(config_path, cli.json).await?,
        Commands::Audit {
            event_type,
            agent,
            tx,
            limit,
        } => {
            let filter = commands::audit::build_filter(event_type, agent, tx);
            commands::audit::run(config_path, &filter, limit, cli.json).await?
        }
        Commands::Status => commands::status::run(config_path).await?,
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Defaults) {
            ConfigAction::Show => commands::config_cmd::show(config_path).await?,
            ConfigAction::Defaults => commands::config_cmd::defaults().await?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path).await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
        },
    }

    Ok(())
}
