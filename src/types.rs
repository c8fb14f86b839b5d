//! Shared types used across the MoneyClaw runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Survival tiers
// ---------------------------------------------------------------------------

/// Resource-based survival tiers controlling agent behaviour.
///
/// Ordered `High > Normal > LowCompute > Critical > Dead` — a governor may move
/// either direction between calls as credits rise or fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurvivalTier {
    Dead,
    Critical,
    LowCompute,
    Normal,
    High,
}

impl fmt::Display for SurvivalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Normal => write!(f, "normal"),
            Self::LowCompute => write!(f, "low_compute"),
            Self::Critical => write!(f, "critical"),
            Self::Dead => write!(f, "dead"),
        }
    }
}

impl std::str::FromStr for SurvivalTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            "low_compute" => Ok(Self::LowCompute),
            "critical" => Ok(Self::Critical),
            "dead" => Ok(Self::Dead),
            other => Err(anyhow::anyhow!("unknown survival tier: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Inference wire types
// ---------------------------------------------------------------------------

/// A chat message in the multi-turn conversation.
///
/// `tool_calls` is populated on assistant messages that requested tool use;
/// `tool_call_id` is populated on `Tool` messages reporting a result back, so
/// providers that require it on the wire (OpenAI's `tool_call_id`, Anthropic's
/// `tool_use_id`) can round-trip it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// A plain message with no associated tool-call metadata.
    pub fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool-call request emitted by the model during inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub output: String,
    pub success: bool,
    pub exit_code: Option<i32>,
}

/// Response from inference including any tool calls requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub usage: TokenUsage,
}

/// Token usage from an inference call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Parameter-name style a provider expects for the max-output-tokens field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamStyle {
    MaxTokens,
    MaxCompletionTokens,
}

/// Model provider family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Conway,
    Openai,
    Anthropic,
    Ollama,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conway => write!(f, "conway"),
            Self::Openai => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conway" => Ok(Self::Conway),
            "openai" => Ok(Self::Openai),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(anyhow::anyhow!("unknown provider: {other}")),
        }
    }
}

/// A row in the model registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRegistryRow {
    pub model_id: String,
    pub provider: Provider,
    pub display_name: String,
    pub tier_minimum: SurvivalTier,
    pub cost_per_1k_input: f64,
    pub cost_per_1k_output: f64,
    pub max_output_tokens: u32,
    pub context_window: u32,
    pub supports_tools: bool,
    pub supports_vision: bool,
    pub param_style: ParamStyle,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Turn persistence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TurnStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(anyhow::anyhow!("unknown turn status: {other}")),
        }
    }
}

/// One Think -> Act -> Observe cycle, persisted as it progresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub session_id: String,
    pub turn_number: u64,
    pub tier_at_decision: SurvivalTier,
    pub model_id: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub credit_delta: f64,
    pub status: TurnStatus,
    pub error_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A persisted tool call, child of a [`Turn`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub turn_id: String,
    pub seq: u32,
    pub tool_name: String,
    pub arguments_json: serde_json::Value,
    pub output: Option<String>,
    pub exit_code: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Identity & session
// ---------------------------------------------------------------------------

/// The one immutable identity row for this process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub wallet_address: String,
    pub creator_address: String,
    pub genesis_prompt: String,
    pub created_at: DateTime<Utc>,
}

/// A contiguous run of the agent loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

/// A heartbeat task entry from the YAML config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatEntry {
    pub name: String,
    pub schedule: String,
    pub task: String,
    pub enabled: bool,
    #[serde(default)]
    pub params: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Replication
// ---------------------------------------------------------------------------

/// The replication state machine (spec.md §4.6). Linear forward, `Dead` reachable
/// from any running state, `CleanedUp` only from `Stopped` or `Dead`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildStatus {
    Init,
    SandboxCreated,
    RuntimeReady,
    WalletVerified,
    Funded,
    Starting,
    Healthy,
    Stopped,
    Dead,
    CleanedUp,
}

impl fmt::Display for ChildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::SandboxCreated => "sandbox_created",
            Self::RuntimeReady => "runtime_ready",
            Self::WalletVerified => "wallet_verified",
            Self::Funded => "funded",
            Self::Starting => "starting",
            Self::Healthy => "healthy",
            Self::Stopped => "stopped",
            Self::Dead => "dead",
            Self::CleanedUp => "cleaned_up",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ChildStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "init" => Self::Init,
            "sandbox_created" => Self::SandboxCreated,
            "runtime_ready" => Self::RuntimeReady,
            "wallet_verified" => Self::WalletVerified,
            "funded" => Self::Funded,
            "starting" => Self::Starting,
            "healthy" => Self::Healthy,
            "stopped" => Self::Stopped,
            "dead" => Self::Dead,
            "cleaned_up" => Self::CleanedUp,
            other => anyhow::bail!("unknown child status: {other}"),
        })
    }
}

/// A tracked child automaton.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildRecord {
    pub id: String,
    pub name: String,
    pub address: String,
    pub sandbox_id: String,
    pub genesis_prompt: String,
    pub status: ChildStatus,
    pub created_at: DateTime<Utc>,
}

/// An append-only lifecycle transition for a child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub id: String,
    pub child_id: String,
    pub transition: String,
    pub to_state: ChildStatus,
    pub created_at: DateTime<Utc>,
}
