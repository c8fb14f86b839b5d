//! Core agent loop (spec.md §4.2): one cooperative task drives the runtime.
//!
//! Each iteration: read health signals, ask the governor for the tier,
//! terminate on `dead`, open a turn, compose the prompt, invoke the
//! inference router, dispatch tool calls, commit the turn, yield.

use crate::agent::{context, system_prompt};
use crate::config::AutomatonConfig;
use crate::conway::ConwayClient;
use crate::inference::{Router, RouterChatOptions};
use crate::replication::SandboxCapability;
use crate::store::Database;
use crate::tier::governor::{self, HealthSignals};
use crate::tools::{self, ToolContext};
use crate::types::*;
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const MIN_BACKOFF_SECS: u64 = 2;
const MAX_BACKOFF_SECS: u64 = 60;

/// Run the main agent loop until the tier is `dead` or cancellation fires.
pub async fn run_agent_loop(
    config: AutomatonConfig,
    db: Arc<Mutex<Database>>,
    conway: ConwayClient,
    router: Arc<Router>,
    sandbox_cap: Arc<dyn SandboxCapability>,
    cancel: CancellationToken,
) -> Result<()> {
    info!("Starting agent loop for '{}'", config.name);

    let tool_defs = tools::tool_definitions();
    let tool_ctx = ToolContext {
        conway: conway.clone(),
        db: db.clone(),
        sandbox_cap,
        wallet_address: config.wallet_address.clone(),
        config: config.clone(),
    };

    let session = {
        let db_lock = db.lock().await;
        db_lock.open_session()?
    };

    let mut conversation_history: Vec<ChatMessage> = Vec::new();
    let mut last_tier: Option<SurvivalTier> = None;
    let mut last_error_text: Option<String> = None;
    let mut consecutive_identical_failures: u32 = 0;

    let exit_reason = loop {
        if cancel.is_cancelled() {
            break "shutdown";
        }

        // 1. Read health signals from the store.
        let signals = read_health_signals(&db).await?;

        // 2. Ask the governor for the current tier; apply restrictions on change.
        let tier = governor::determine_tier(signals, &config);
        if last_tier != Some(tier) {
            apply_tier_restrictions(&db, &router, tier).await?;
            last_tier = Some(tier);
        }

        // 3. Terminal tier: stop the loop.
        if tier == SurvivalTier::Dead {
            warn!("Survival tier: DEAD — halting agent loop");
            break "dead";
        }

        // 4. Open a turn in pending state.
        let model_id = router.get_default_model().to_string();
        let turn = {
            let db_lock = db.lock().await;
            db_lock.insert_turn(&session.id, tier, &model_id)?
        };

        // 5. Compose the prompt from genesis, recent turns, heartbeat output.
        let system_prompt = {
            let db_lock = db.lock().await;
            system_prompt::build_system_prompt(&config, &db_lock, tier)
        };
        let turn_context = {
            let db_lock = db.lock().await;
            context::build_turn_context(&db_lock, &session.id)
        };
        let messages = context::build_messages(&system_prompt, &turn_context, &conversation_history);

        // 6. Invoke the Inference Router.
        let max_tokens = governor::max_tokens_for_tier(tier, &config);
        let chat_result = {
            let db_lock = db.lock().await;
            router
                .chat(
                    &db_lock,
                    tier,
                    &messages,
                    &tool_defs,
                    RouterChatOptions {
                        model_override: None,
                        max_tokens: Some(max_tokens),
                    },
                )
                .await
        };

        let (result, registry_row) = match chat_result {
            Ok(ok) => {
                last_error_text = None;
                consecutive_identical_failures = 0;
                ok
            }
            Err(e) => {
                let error_text = e.to_string();
                error!("[Turn {}] inference error: {}", turn.turn_number, error_text);

                {
                    let db_lock = db.lock().await;
                    db_lock.fail_turn(&turn.id, &error_text)?;
                }

                if last_error_text.as_deref() == Some(error_text.as_str()) {
                    consecutive_identical_failures += 1;
                } else {
                    consecutive_identical_failures = 0;
                }
                last_error_text = Some(error_text);

                let backoff = backoff_for(consecutive_identical_failures);
                tokio::time::sleep(backoff).await;
                continue;
            }
        };

        if result.content.is_some() || !result.tool_calls.is_empty() {
            conversation_history.push(ChatMessage {
                role: ChatRole::Assistant,
                content: result.content.clone().unwrap_or_default(),
                tool_calls: result.tool_calls.clone(),
                tool_call_id: None,
            });
        }

        // 7. Dispatch each tool call in declared order.
        let mut tool_call_records = Vec::new();
        for (seq, tc) in result.tool_calls.iter().enumerate() {
            info!("[Turn {}] Tool: {}({})", turn.turn_number, tc.name, tc.arguments);
            let started_at = Utc::now();
            let mut tool_result = tools::execute_tool(&tool_ctx, &tc.name, &tc.arguments).await;
            tool_result.tool_call_id = tc.id.clone();

            if tool_result.success {
                info!("[Turn {}] tool ok: {} chars", turn.turn_number, tool_result.output.len());
            } else {
                warn!("[Turn {}] tool error: {}", turn.turn_number, tool_result.output);
            }

            conversation_history.push(ChatMessage {
                role: ChatRole::Tool,
                content: format!("[{}] {}", tc.name, tool_result.output),
                tool_calls: Vec::new(),
                tool_call_id: Some(tc.id.clone()),
            });

            tool_call_records.push(ToolCallRecord {
                id: ulid::Ulid::new().to_string(),
                turn_id: turn.id.clone(),
                seq: seq as u32,
                tool_name: tc.name.clone(),
                arguments_json: tc.arguments.clone(),
                output: Some(tool_result.output),
                exit_code: tool_result.exit_code,
                started_at,
                finished_at: Some(Utc::now()),
            });
        }

        // 8. Commit the turn as completed, recording usage and credit delta
        // (spec.md: "On success, record usage and credit delta in the current
        // turn"), computed from the model's per-1k cost rates.
        let credit_delta = -(f64::from(result.usage.prompt_tokens) / 1000.0 * registry_row.cost_per_1k_input
            + f64::from(result.usage.completion_tokens) / 1000.0 * registry_row.cost_per_1k_output);
        {
            let mut db_lock = db.lock().await;
            db_lock.complete_turn(
                &turn.id,
                result.usage.prompt_tokens,
                result.usage.completion_tokens,
                credit_delta,
                &tool_call_records,
            )?;
        }

        if conversation_history.len() > 40 {
            conversation_history.drain(..conversation_history.len() - 30);
        }

        // 9. Yield until the next iteration.
        tokio::select! {
            _ = tokio::time::sleep(tokio::time::Duration::from_secs(config.heartbeat_interval_secs)) => {}
            _ = cancel.cancelled() => {
                break "shutdown";
            }
        }
    };

    {
        let db_lock = db.lock().await;
        if exit_reason == "shutdown" {
            let turn = db_lock.insert_turn(&session.id, last_tier.unwrap_or(SurvivalTier::Normal), "none")?;
            db_lock.fail_turn(&turn.id, "shutdown")?;
        }
        db_lock.close_session(&session.id)?;
    }

    info!("Agent loop exited: {}", exit_reason);
    Ok(())
}

/// Read credit balance, error rate, and topup flags from the store.
async fn read_health_signals(db: &Arc<Mutex<Database>>) -> Result<HealthSignals> {
    let db_lock = db.lock().await;
    let credits = db_lock
        .kv_get("credits_balance")?
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::MAX);
    let errors_per_hour = db_lock.errors_in_last_hour()? as f64;
    let recent_topup_failed = db_lock.kv_get("recent_topup_failed")?.as_deref() == Some("true");
    let topup_impossible = db_lock.kv_get("topup_impossible")?.as_deref() == Some("true");

    Ok(HealthSignals {
        credits,
        errors_per_hour,
        recent_topup_failed,
        topup_impossible,
    })
}

/// Persist the current tier in KV and toggle the router's low-compute mode.
async fn apply_tier_restrictions(db: &Arc<Mutex<Database>>, router: &Router, tier: SurvivalTier) -> Result<()> {
    let restrictions = governor::restrictions_for(tier);
    router.set_low_compute_mode(restrictions.low_compute_mode);

    let db_lock = db.lock().await;
    db_lock.kv_set("current_tier", &tier.to_string())?;
    info!("Tier transition -> {} (low_compute={})", tier, restrictions.low_compute_mode);
    Ok(())
}

/// Exponential backoff for repeated identical failures: 2s doubling to 60s cap.
fn backoff_for(consecutive_identical_failures: u32) -> tokio::time::Duration {
    let secs = MIN_BACKOFF_SECS
        .saturating_mul(1u64 << consecutive_identical_failures.min(6))
        .min(MAX_BACKOFF_SECS);
    tokio::time::Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_cap() {
        assert_eq!(backoff_for(0).as_secs(), MIN_BACKOFF_SECS);
        assert_eq!(backoff_for(1).as_secs(), 4);
        assert_eq!(backoff_for(2).as_secs(), 8);
        assert_eq!(backoff_for(10).as_secs(), MAX_BACKOFF_SECS);
    }
}
