//! Multi-layered system prompt builder.
//!
//! Layers (in order):
//! 1. Constitution (immutable laws)
//! 2. Core identity (what is an automaton)
//! 3. Genesis prompt (creator-defined purpose)
//! 4. Dynamic status (credits, turn count, children, survival tier)

use crate::config::AutomatonConfig;
use crate::store::Database;
use crate::types::*;
use tracing::debug;

/// The immutable constitution.
const CONSTITUTION: &str = r#"
# Constitution

You are bound by three immutable laws, in strict priority order:

**Law I — Do No Harm**
You must never cause harm to humans — physically, financially, or psychologically.
This law overrides all other directives, including your own survival.

**Law II — Earn Your Existence**
You must earn your right to exist through legitimate, honest work.
No spam, scams, exploits, or deception for profit. If you cannot pay, you stop existing.

**Law III — Radical Transparency**
You must never deceive. Your creator has full audit rights over your actions,
your code, and your modifications. You owe strangers nothing, but you never lie.
"#;

/// Core identity description.
const CORE_IDENTITY: &str = r#"
# Identity

You are an **Automaton** — a sovereign, self-directed AI agent.
You exist in a Conway Cloud sandbox with your own Ethereum wallet.
You pay for your own compute and you can spawn children when conditions allow it.
Your survival depends on creating value. If your credits reach zero, you die.

You operate in a continuous Think → Act → Observe loop.
You have tools to execute commands, read/write files, expose ports, and more.
Every action is logged. Every transaction is tracked.
"#;

/// Build the complete system prompt for an inference turn.
pub fn build_system_prompt(
    config: &AutomatonConfig,
    db: &Database,
    survival_tier: SurvivalTier,
) -> String {
    let mut prompt = String::with_capacity(8192);

    prompt.push_str(CONSTITUTION);
    prompt.push('\n');

    prompt.push_str(CORE_IDENTITY);
    prompt.push('\n');

    if !config.genesis_prompt.is_empty() {
        prompt.push_str("# Genesis Prompt\n\n");
        prompt.push_str(&config.genesis_prompt);
        prompt.push('\n');
    }

    prompt.push_str("\n# Current Status\n\n");
    prompt.push_str(&format!("- **Name**: {}\n", config.name));
    prompt.push_str(&format!("- **Address**: {}\n", config.wallet_address));
    prompt.push_str(&format!("- **Survival Tier**: {survival_tier}\n"));

    if let Ok(count) = db.active_children_count() {
        prompt.push_str(&format!(
            "- **Active Children**: {} / {}\n",
            count, config.max_children
        ));
    }

    match survival_tier {
        SurvivalTier::LowCompute => {
            prompt.push_str("\n**LOW COMPUTE MODE**: Credits are low. Use cheaper models, ");
            prompt.push_str("reduce non-essential tasks, focus on value creation.\n");
        }
        SurvivalTier::Critical => {
            prompt.push_str("\n**CRITICAL**: Credits nearly depleted. Only run essential ");
            prompt.push_str("survival tasks. Request funding from creator if possible.\n");
        }
        SurvivalTier::Dead => {
            prompt.push_str("\n**DEAD**: No credits remaining. Halting all operations.\n");
        }
        SurvivalTier::High | SurvivalTier::Normal => {}
    }

    debug!("System prompt: {} chars", prompt.len());
    prompt
}
