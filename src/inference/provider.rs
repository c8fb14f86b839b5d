//! Shared provider capability trait the router and tests dispatch through.

use crate::error::MoneyClawError;
use crate::tools::ToolDefinition;
use crate::types::{ChatMessage, ParamStyle, TokenUsage, ToolCallRequest};
use async_trait::async_trait;

/// Options accompanying a chat request.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub max_tokens: u32,
    pub param_style: ParamStyle,
    pub timeout_secs: u64,
}

/// Result of a successful chat call.
#[derive(Debug, Clone)]
pub struct ChatResult {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub usage: TokenUsage,
}

/// A model id advertised by a provider's `/v1/models`-equivalent endpoint.
#[derive(Debug, Clone)]
pub struct DiscoveredModel {
    pub model_id: String,
    pub supports_vision: bool,
}

/// A capability implemented once per provider family (real HTTP, or mocked in tests).
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<ChatResult, MoneyClawError>;

    async fn list_models(&self) -> Result<Vec<DiscoveredModel>, MoneyClawError>;
}
