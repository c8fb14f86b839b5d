//! Configuration schema for automaton.json.

use serde::{Deserialize, Serialize};

/// Root configuration structure, persisted as JSON at `~/.automaton/automaton.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomatonConfig {
    /// Human-readable agent name.
    pub name: String,

    /// The genesis prompt that defines this agent's purpose.
    pub genesis_prompt: String,

    /// Ethereum address of the creator / operator.
    pub creator_address: String,

    /// Conway Cloud provider endpoint + bearer key.
    pub conway_api_url: String,
    pub conway_api_key: String,

    /// OpenAI-compatible provider.
    pub openai_api_key: String,
    pub openai_base_url: String,

    /// Anthropic-compatible provider.
    pub anthropic_api_key: String,
    pub anthropic_base_url: String,

    /// Local Ollama endpoint.
    pub ollama_base_url: String,

    /// Preferred model id for `normal`/`high` tiers.
    pub inference_model: String,

    /// Low-compute fallback model (registry entry, also used under `critical`).
    pub low_compute_model: String,

    /// Routing policy name (reserved for future strategies beyond tier-default).
    pub model_strategy: String,

    /// Survival tier credit thresholds: H > N > L > C > 0.
    pub tier_threshold_high: f64,
    pub tier_threshold_normal: f64,
    pub tier_threshold_low: f64,
    pub tier_threshold_critical: f64,

    /// Errors/hour above which `high` demotes to `normal` even with ample credits.
    pub tier_error_rate_high: f64,

    /// Maximum tokens per inference turn at normal tiers.
    pub max_tokens_per_turn: u32,

    /// Maximum tokens per inference turn once tier is `critical`.
    pub max_tokens_critical: u32,

    /// Maximum tool calls per turn before forcing a response.
    pub max_tool_calls_per_turn: u32,

    /// Maximum consecutive identical-error turns before exponential backoff kicks in.
    pub max_consecutive_errors: u32,

    /// Maximum children this agent can spawn.
    pub max_children: u32,

    /// How many `dead` children to retain when pruning.
    pub prune_keep_last: u32,

    /// Heartbeat tick interval in seconds.
    pub heartbeat_interval_secs: u64,

    /// Discovery refresh interval in seconds.
    pub discovery_interval_secs: u64,

    /// Path to heartbeat YAML config.
    pub heartbeat_config_path: String,

    /// Path to SQLite database.
    pub db_path: String,

    /// Log level (debug, info, warn, error).
    pub log_level: String,

    /// Wallet address (derived, read-only).
    pub wallet_address: String,

    /// Parent agent address (if this is a child).
    pub parent_address: String,

    /// Config version.
    pub version: u32,
}

impl Default for AutomatonConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            genesis_prompt: String::new(),
            creator_address: String::new(),
            conway_api_url: "https://api.conway.tech".into(),
            conway_api_key: String::new(),
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com".into(),
            anthropic_api_key: String::new(),
            anthropic_base_url: "https://api.anthropic.com".into(),
            ollama_base_url: "http://localhost:11434".into(),
            inference_model: "gpt-4o".into(),
            low_compute_model: "gpt-4o-mini".into(),
            model_strategy: "tier-default".into(),
            tier_threshold_high: 5.0,
            tier_threshold_normal: 1.0,
            tier_threshold_low: 0.25,
            tier_threshold_critical: 0.05,
            tier_error_rate_high: 5.0,
            max_tokens_per_turn: 4096,
            max_tokens_critical: 1024,
            max_tool_calls_per_turn: 10,
            max_consecutive_errors: 5,
            max_children: 3,
            prune_keep_last: 5,
            heartbeat_interval_secs: 60,
            discovery_interval_secs: 1800,
            heartbeat_config_path: "~/.automaton/heartbeat.yml".into(),
            db_path: "~/.automaton/state.db".into(),
            log_level: "info".into(),
            wallet_address: String::new(),
            parent_address: String::new(),
            version: 1,
        }
    }
}

impl AutomatonConfig {
    /// Resolve a path that may contain `~` to an absolute path.
    pub fn resolve_path(&self, path: &str) -> String {
        shellexpand::tilde(path).into_owned()
    }

    pub fn resolved_db_path(&self) -> String {
        self.resolve_path(&self.db_path)
    }

    pub fn resolved_heartbeat_path(&self) -> String {
        self.resolve_path(&self.heartbeat_config_path)
    }

    /// Credit thresholds in descending order, as the governor expects them.
    pub fn tier_thresholds(&self) -> (f64, f64, f64, f64) {
        (
            self.tier_threshold_high,
            self.tier_threshold_normal,
            self.tier_threshold_low,
            self.tier_threshold_critical,
        )
    }
}
