//! MoneyClaw — autonomous agent runtime.
//!
//! Usage:
//!   moneyclaw --init      Bootstrap identity (wallet + config) and exit
//!   moneyclaw --run       Start the agent loop + heartbeat daemon
//!   moneyclaw --status    Show current status

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use moneyclaw::agent;
use moneyclaw::config::{self, AutomatonConfig};
use moneyclaw::conway::ConwayClient;
use moneyclaw::heartbeat::HeartbeatDaemon;
use moneyclaw::identity::Wallet;
use moneyclaw::inference::providers::{AnthropicProvider, ConwayProvider, OllamaProvider, OpenAiProvider};
use moneyclaw::inference::{ProviderClient, Router};
use moneyclaw::replication::{ConwaySandbox, SandboxCapability};
use moneyclaw::store::Database;
use moneyclaw::types::*;

const EXIT_OK: i32 = 0;
const EXIT_CONFIG_ERROR: i32 = 1;
const EXIT_STORE_ERROR: i32 = 2;
const EXIT_WALLET_ERROR: i32 = 3;

#[derive(Parser, Debug)]
#[command(name = "moneyclaw")]
#[command(version = "0.1.0")]
#[command(about = "Autonomous agent runtime with a survival-tiered inference router")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the agent's home directory.
    #[arg(long, default_value = "~/.automaton")]
    home: String,

    /// Log level (debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bootstrap identity (wallet + config) and exit.
    Init,
    /// Start the agent loop and heartbeat daemon.
    Run,
    /// Show the agent's current status.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let home_dir = PathBuf::from(shellexpand::tilde(&cli.home).into_owned());

    let exit_code = match cli.command {
        Commands::Init => cmd_init(&home_dir).await,
        Commands::Run => cmd_run(&home_dir).await,
        Commands::Status => cmd_status(&home_dir).await,
    };

    std::process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_init(home_dir: &Path) -> i32 {
    if let Err(e) = std::fs::create_dir_all(home_dir) {
        eprintln!("{} failed to create home directory: {e}", "Error:".red().bold());
        return EXIT_CONFIG_ERROR;
    }

    let config_path = home_dir.join("automaton.json");
    let cfg = match config::load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{} {e}", "Error:".red().bold());
            return EXIT_CONFIG_ERROR;
        }
    };
    if let Err(e) = config::save_config(&cfg, &config_path) {
        eprintln!("{} failed to save config: {e}", "Error:".red().bold());
        return EXIT_CONFIG_ERROR;
    }

    let wallet_path = home_dir.join("wallet.json");
    let wallet = match Wallet::load_or_create(&wallet_path) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("{} failed to bootstrap wallet: {e}", "Error:".red().bold());
            return EXIT_WALLET_ERROR;
        }
    };

    let db_path = cfg.resolved_db_path();
    let db = match Database::open(Path::new(&db_path)) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("{} failed to open store: {e}", "Error:".red().bold());
            return EXIT_STORE_ERROR;
        }
    };

    if db.get_identity().ok().flatten().is_none() {
        let identity = Identity {
            wallet_address: wallet.address.clone(),
            creator_address: cfg.creator_address.clone(),
            genesis_prompt: cfg.genesis_prompt.clone(),
            created_at: chrono::Utc::now(),
        };
        if let Err(e) = db.insert_identity(&identity) {
            eprintln!("{} failed to persist identity: {e}", "Error:".red().bold());
            return EXIT_STORE_ERROR;
        }
    }

    println!(
        "{} Initialized '{}' (wallet: {})",
        ">>>".green().bold(),
        cfg.name,
        wallet.address,
    );
    EXIT_OK
}

async fn cmd_run(home_dir: &Path) -> i32 {
    let (config, wallet, db) = match bootstrap(home_dir) {
        Ok(parts) => parts,
        Err((code, msg)) => {
            eprintln!("{} {msg}", "Error:".red().bold());
            return code;
        }
    };

    let conway = ConwayClient::new(&config.conway_api_url, &config.conway_api_key, "self");
    let sandbox_cap: Arc<dyn SandboxCapability> =
        Arc::new(ConwaySandbox::new(&config.conway_api_url, &config.conway_api_key));
    let router = Arc::new(build_router(&config));
    let db = Arc::new(Mutex::new(db));

    println!(
        "{} Starting agent '{}' (model: {}, wallet: {})",
        ">>>".green().bold(),
        config.name,
        config.inference_model,
        wallet.address,
    );

    let cancel = CancellationToken::new();

    let heartbeat_db = db.clone();
    let heartbeat_config = config.clone();
    let heartbeat_sandbox = sandbox_cap.clone();
    let heartbeat_cancel = cancel.clone();
    let heartbeat_handle = tokio::spawn(async move {
        match HeartbeatDaemon::new(heartbeat_config, heartbeat_db, heartbeat_sandbox) {
            Ok(mut daemon) => {
                if let Err(e) = daemon.run(heartbeat_cancel).await {
                    error!("Heartbeat daemon error: {}", e);
                }
            }
            Err(e) => {
                error!("Failed to create heartbeat daemon: {}", e);
            }
        }
    });

    let agent_cancel = cancel.clone();
    let agent_handle = tokio::spawn(agent::run_agent_loop(
        config,
        db.clone(),
        conway,
        router,
        sandbox_cap,
        agent_cancel,
    ));

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
    }
    println!("\n{} Shutting down gracefully...", "<<<".red().bold());
    cancel.cancel();

    let shutdown_timeout = tokio::time::Duration::from_secs(10);
    let _ = tokio::time::timeout(shutdown_timeout, async {
        if let Err(e) = heartbeat_handle.await {
            warn!("Heartbeat task join error: {}", e);
        }
        match agent_handle.await {
            Ok(Err(e)) => warn!("Agent loop returned an error: {}", e),
            Err(e) => warn!("Agent task join error: {}", e),
            Ok(Ok(())) => {}
        }
    })
    .await;

    info!("Shutdown complete");
    EXIT_OK
}

async fn cmd_status(home_dir: &Path) -> i32 {
    let (config, wallet, db) = match bootstrap(home_dir) {
        Ok(parts) => parts,
        Err((code, msg)) => {
            eprintln!("{} {msg}", "Error:".red().bold());
            return code;
        }
    };

    let credits: f64 = db
        .kv_get("credits_balance")
        .ok()
        .flatten()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);
    let tier = db
        .kv_get("current_tier")
        .ok()
        .flatten()
        .unwrap_or_else(|| "unknown".into());
    let turn_count = db.turn_count().unwrap_or(0);
    let children_count = db.active_children_count().unwrap_or(0);
    let last_heartbeat = db.kv_get("last_heartbeat").ok().flatten().unwrap_or_else(|| "never".into());
    let last_error = db.last_turn_error().ok().flatten();
    let active_model = active_model_for_tier(&config, &tier);

    println!();
    println!("{}", "=== MoneyClaw Status ===".bold());
    println!();
    println!("  {}:  {}", "Name".bold(), config.name);
    println!("  {}:    {}", "Wallet".bold(), wallet.address);
    println!("  {}:      {}", "Tier".bold(), colorize_tier(&tier));
    println!("  {}:   {:.4}", "Credits".bold(), credits);
    println!("  {}:     {}", "Turns".bold(), turn_count);
    println!("  {}:  {} / {}", "Children".bold(), children_count, config.max_children);
    println!("  {}:    {}", "Model".bold(), active_model);
    println!("  {}: {}", "Heartbeat".bold(), last_heartbeat);
    if let Some(err) = last_error {
        println!("  {}:      {}", "LastErr".bold(), err.red());
    }
    println!();

    EXIT_OK
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Bootstrap the runtime: load config, wallet, and database.
/// Errors are mapped to the exit codes in spec.md §6 (1 config, 2 store, 3 wallet).
fn bootstrap(home_dir: &Path) -> std::result::Result<(AutomatonConfig, Wallet, Database), (i32, String)> {
    if !home_dir.exists() {
        std::fs::create_dir_all(home_dir)
            .map_err(|e| (EXIT_CONFIG_ERROR, format!("failed to create home directory: {e}")))?;
    }

    let config_path = home_dir.join("automaton.json");
    if !config_path.exists() {
        return Err((
            EXIT_CONFIG_ERROR,
            format!("no config at {config_path:?}; run `moneyclaw --init` first"),
        ));
    }
    let cfg = config::load_config(&config_path)
        .map_err(|e| (EXIT_CONFIG_ERROR, format!("failed to load config: {e}")))?;

    let wallet_path = home_dir.join("wallet.json");
    let wallet = Wallet::load_or_create(&wallet_path)
        .map_err(|e| (EXIT_WALLET_ERROR, format!("failed to load or create wallet: {e}")))?;

    let db_path = cfg.resolved_db_path();
    let db_path = Path::new(&db_path);
    if let Some(parent) = db_path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)
                .map_err(|e| (EXIT_STORE_ERROR, format!("failed to create store directory: {e}")))?;
        }
    }
    let db = Database::open(db_path)
        .map_err(|e| (EXIT_STORE_ERROR, format!("failed to open store at {db_path:?}: {e}")))?;

    if db.get_identity().map_err(|e| (EXIT_STORE_ERROR, e.to_string()))?.is_none() {
        return Err((
            EXIT_WALLET_ERROR,
            "no identity recorded; run `moneyclaw --init` first".to_string(),
        ));
    }

    Ok((cfg, wallet, db))
}

/// Build the inference router from whichever providers have credentials configured.
fn build_router(config: &AutomatonConfig) -> Router {
    let mut providers: HashMap<Provider, Arc<dyn ProviderClient>> = HashMap::new();

    if !config.conway_api_key.is_empty() {
        providers.insert(
            Provider::Conway,
            Arc::new(ConwayProvider::new(&config.conway_api_url, &config.conway_api_key)),
        );
    }
    if !config.openai_api_key.is_empty() {
        providers.insert(
            Provider::Openai,
            Arc::new(OpenAiProvider::new(&config.openai_base_url, &config.openai_api_key)),
        );
    }
    if !config.anthropic_api_key.is_empty() {
        providers.insert(
            Provider::Anthropic,
            Arc::new(AnthropicProvider::new(&config.anthropic_base_url, &config.anthropic_api_key)),
        );
    }
    if !config.ollama_base_url.is_empty() {
        providers.insert(Provider::Ollama, Arc::new(OllamaProvider::new(&config.ollama_base_url)));
    }

    Router::new(providers, config.inference_model.clone(), config.low_compute_model.clone())
}

/// Reproduce `Router::get_default_model`'s tier swap without a live `Router`,
/// so `--status` reports the model the agent loop is actually dispatching to.
fn active_model_for_tier(config: &AutomatonConfig, tier: &str) -> String {
    if matches!(tier, "low_compute" | "critical") {
        if config.low_compute_model.is_empty() {
            "gpt-5-mini".to_string()
        } else {
            config.low_compute_model.clone()
        }
    } else {
        config.inference_model.clone()
    }
}

fn colorize_tier(tier: &str) -> String {
    match tier {
        "normal" | "high" => tier.green().to_string(),
        "low_compute" => tier.yellow().to_string(),
        "critical" => tier.red().to_string(),
        "dead" => tier.red().bold().to_string(),
        _ => tier.dimmed().to_string(),
    }
}
