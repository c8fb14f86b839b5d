//! Conway Cloud provider adapter — wire-compatible with OpenAI's chat API,
//! same as the teacher's `conway::inference::InferenceClient`.

use super::openai::OpenAiProvider;
use crate::error::MoneyClawError;
use crate::inference::provider::{ChatOptions, ChatResult, DiscoveredModel, ProviderClient};
use crate::tools::ToolDefinition;
use crate::types::ChatMessage;
use async_trait::async_trait;

/// Conway speaks the same `/v1/chat/completions` + `/v1/completions` protocol
/// as OpenAI; only the base URL and key differ.
pub struct ConwayProvider(OpenAiProvider);

impl ConwayProvider {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self(OpenAiProvider::new(base_url, api_key))
    }
}

#[async_trait]
impl ProviderClient for ConwayProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<ChatResult, MoneyClawError> {
        self.0.chat(messages, tools, options).await
    }

    async fn list_models(&self) -> Result<Vec<DiscoveredModel>, MoneyClawError> {
        self.0.list_models().await
    }
}
