//! Built-in heartbeat task implementations.

use crate::config::AutomatonConfig;
use crate::conway;
use crate::inference::providers::{AnthropicProvider, OllamaProvider, OpenAiProvider};
use crate::registry::{self, discoverers::{AnthropicDiscoverer, OllamaDiscoverer, OpenAiDiscoverer}};
use crate::replication::{self, SandboxCapability};
use crate::store::Database;
use anyhow::{bail, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Execute a named heartbeat task.
pub async fn execute_task(
    task_name: &str,
    _params: &serde_json::Value,
    config: &AutomatonConfig,
    db: &Arc<Mutex<Database>>,
    sandbox_cap: &Arc<dyn SandboxCapability>,
) -> Result<String> {
    match task_name {
        "heartbeat_ping" => task_heartbeat_ping(db).await,
        "check_credits" => task_check_credits(config, db).await,
        "refresh_model_registry" => task_refresh_model_registry(config, db).await,
        "prune_dead_children" => task_prune_dead_children(config, db, sandbox_cap).await,
        _ => bail!("Unknown heartbeat task: {}", task_name),
    }
}

/// Simple ping — record that the agent is alive.
async fn task_heartbeat_ping(db: &Arc<Mutex<Database>>) -> Result<String> {
    let db = db.lock().await;
    db.kv_set("last_heartbeat", &chrono::Utc::now().to_rfc3339())?;
    Ok("pong".into())
}

/// Check Conway compute credit balance and feed it to the tier governor.
async fn task_check_credits(config: &AutomatonConfig, db: &Arc<Mutex<Database>>) -> Result<String> {
    let balance = conway::credits::check_credits(&config.conway_api_url, &config.conway_api_key).await?;

    let db = db.lock().await;
    db.kv_set("credits_balance", &balance.credits.to_string())?;

    Ok(format!("{} {}", balance.credits, balance.currency))
}

/// Whether the current survival tier (as last recorded by the agent loop)
/// forbids optional heartbeat side-effects: discovery refresh and replication.
async fn optional_work_suspended(db: &Arc<Mutex<Database>>) -> Result<bool> {
    let db = db.lock().await;
    let tier = db.kv_get("current_tier")?;
    Ok(matches!(tier.as_deref(), Some("low_compute") | Some("critical") | Some("dead")))
}

/// Re-run model discovery for every configured provider and reconcile the registry.
async fn task_refresh_model_registry(config: &AutomatonConfig, db: &Arc<Mutex<Database>>) -> Result<String> {
    if optional_work_suspended(db).await? {
        return Ok("Skipped: survival tier suspends discovery".into());
    }

    let mut discovered_total = 0;
    let db_lock = db.lock().await;

    if !config.openai_api_key.is_empty() {
        let provider = Arc::new(OpenAiProvider::new(&config.openai_base_url, &config.openai_api_key));
        let discoverer = OpenAiDiscoverer::new(provider);
        discovered_total += registry::refresh_provider(&db_lock, &discoverer).await?;
    }
    if !config.anthropic_api_key.is_empty() {
        let provider = Arc::new(AnthropicProvider::new(&config.anthropic_base_url, &config.anthropic_api_key));
        let discoverer = AnthropicDiscoverer::new(provider);
        discovered_total += registry::refresh_provider(&db_lock, &discoverer).await?;
    }
    if !config.ollama_base_url.is_empty() {
        let provider = Arc::new(OllamaProvider::new(&config.ollama_base_url));
        let discoverer = OllamaDiscoverer::new(provider);
        discovered_total += registry::refresh_provider(&db_lock, &discoverer).await?;
    }

    Ok(format!("{discovered_total} models discovered"))
}

/// Prune the oldest dead children beyond `prune_keep_last`.
async fn task_prune_dead_children(
    config: &AutomatonConfig,
    db: &Arc<Mutex<Database>>,
    sandbox_cap: &Arc<dyn SandboxCapability>,
) -> Result<String> {
    if optional_work_suspended(db).await? {
        return Ok("Skipped: survival tier suspends replication".into());
    }

    let mut db_lock = db.lock().await;
    let removed = replication::prune_dead_children(
        &mut db_lock,
        sandbox_cap.as_ref(),
        config.prune_keep_last as usize,
    )
    .await?;

    Ok(format!("{removed} dead children pruned"))
}
