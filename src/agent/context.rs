//! Message context builder for the agent loop: composes the prompt from
//! genesis, recent turns, and heartbeat output (spec.md §4.2 step 5).

use crate::agent::injection_defense::sanitize_context;
use crate::store::Database;
use crate::types::*;
use tracing::debug;

/// Build the turn context: recent turn summaries, the latest heartbeat
/// result, and any pending wake reason. All recalled text is sanitized
/// before being folded into the prompt.
pub fn build_turn_context(db: &Database, session_id: &str) -> String {
    let mut context = String::new();

    if let Ok(recent) = db.recent_turn_summaries(session_id, 5) {
        if !recent.is_empty() {
            context.push_str("## Recent Turns\n\n");
            for line in &recent {
                context.push_str("- ");
                context.push_str(&sanitize_context(line));
                context.push('\n');
            }
            context.push('\n');
        }
    }

    if let Ok(Some(result)) = db.last_heartbeat_result() {
        context.push_str("## Last Heartbeat\n\n");
        context.push_str(&sanitize_context(&result));
        context.push('\n');
    }

    if let Ok(Some(reason)) = db.kv_get("wake_reason") {
        context.push_str(&format!("## Wake Reason\n\n{}\n\n", sanitize_context(&reason)));
        let _ = db.kv_delete("wake_reason");
    }

    debug!("Turn context: {} chars", context.len());
    context
}

/// Build the full message history for an inference call.
pub fn build_messages(
    system_prompt: &str,
    turn_context: &str,
    previous_messages: &[ChatMessage],
) -> Vec<ChatMessage> {
    let mut messages = Vec::new();

    messages.push(ChatMessage::text(ChatRole::System, system_prompt));

    let history_window = 20;
    let start = previous_messages.len().saturating_sub(history_window);
    for msg in &previous_messages[start..] {
        messages.push(msg.clone());
    }

    if !turn_context.is_empty() {
        messages.push(ChatMessage::text(ChatRole::User, turn_context));
    } else {
        messages.push(ChatMessage::text(
            ChatRole::User,
            "Continue your autonomous operation. What should you do next?",
        ));
    }

    messages
}
