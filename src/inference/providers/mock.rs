//! In-memory provider double used by the router's own tests and by
//! integration tests that drive the replication/discovery scenarios.

use crate::error::MoneyClawError;
use crate::inference::provider::{ChatOptions, ChatResult, DiscoveredModel, ProviderClient};
use crate::tools::ToolDefinition;
use crate::types::{ChatMessage, TokenUsage};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A scripted response, consumed in order by successive `chat` calls.
pub enum ScriptedReply {
    Ok(ChatResult),
    Err(MoneyClawError),
}

pub struct MockProviderClient {
    replies: Mutex<Vec<ScriptedReply>>,
    call_count: AtomicUsize,
    models: Vec<DiscoveredModel>,
}

impl MockProviderClient {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies),
            call_count: AtomicUsize::new(0),
            models: Vec::new(),
        }
    }

    pub fn with_models(mut self, models: Vec<DiscoveredModel>) -> Self {
        self.models = models;
        self
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for MockProviderClient {
    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
        _options: &ChatOptions,
    ) -> Result<ChatResult, MoneyClawError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Ok(ChatResult {
                content: Some(String::new()),
                tool_calls: Vec::new(),
                usage: TokenUsage::default(),
            });
        }
        match replies.remove(0) {
            ScriptedReply::Ok(result) => Ok(result),
            ScriptedReply::Err(err) => Err(err),
        }
    }

    async fn list_models(&self) -> Result<Vec<DiscoveredModel>, MoneyClawError> {
        Ok(self.models.clone())
    }
}
