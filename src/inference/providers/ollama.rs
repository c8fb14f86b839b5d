//! Local Ollama provider adapter — no auth required.

use crate::error::MoneyClawError;
use crate::inference::provider::{ChatOptions, ChatResult, DiscoveredModel, ProviderClient};
use crate::tools::ToolDefinition;
use crate::types::{ChatMessage, ChatRole, TokenUsage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<MessagePayload>,
    stream: bool,
    options: ChatRequestOptions,
}

#[derive(Debug, Serialize)]
struct ChatRequestOptions {
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct MessagePayload {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

pub struct OllamaProvider {
    base_url: String,
    http: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

fn classify_http_error(status: reqwest::StatusCode, body: &str) -> MoneyClawError {
    if status == reqwest::StatusCode::NOT_FOUND {
        return MoneyClawError::ProviderConfig(format!("model not found: {body}"));
    }
    if status.is_server_error() {
        return MoneyClawError::Transient(format!("{status}: {body}"));
    }
    MoneyClawError::Protocol(format!("{status}: {body}"))
}

#[async_trait]
impl ProviderClient for OllamaProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        // Ollama tool-calling is model-dependent and not uniform; the spec
        // names this provider for discovery/chat, not tool dispatch.
        _tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<ChatResult, MoneyClawError> {
        let url = format!("{}/api/chat", self.base_url);

        let payload = ChatRequest {
            model: &options.model,
            messages: messages
                .iter()
                .map(|m| MessagePayload {
                    role: match m.role {
                        ChatRole::System => "system".into(),
                        ChatRole::User | ChatRole::Tool => "user".into(),
                        ChatRole::Assistant => "assistant".into(),
                    },
                    content: m.content.clone(),
                })
                .collect(),
            stream: false,
            options: ChatRequestOptions {
                num_predict: options.max_tokens,
            },
        };

        let resp = self
            .http
            .post(&url)
            .json(&payload)
            .timeout(Duration::from_secs(options.timeout_secs))
            .send()
            .await
            .map_err(|e| MoneyClawError::Transient(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &body));
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| MoneyClawError::Protocol(e.to_string()))?;

        Ok(ChatResult {
            content: Some(body.message.content),
            tool_calls: Vec::new(),
            usage: TokenUsage {
                prompt_tokens: body.prompt_eval_count,
                completion_tokens: body.eval_count,
                total_tokens: body.prompt_eval_count + body.eval_count,
            },
        })
    }

    async fn list_models(&self) -> Result<Vec<DiscoveredModel>, MoneyClawError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| MoneyClawError::Transient(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &body));
        }

        let body: TagsResponse = resp
            .json()
            .await
            .map_err(|e| MoneyClawError::Protocol(e.to_string()))?;

        Ok(body
            .models
            .into_iter()
            .map(|m| DiscoveredModel {
                model_id: m.name,
                supports_vision: false,
            })
            .collect())
    }
}
