//! Anthropic provider adapter.

use crate::error::MoneyClawError;
use crate::inference::provider::{ChatOptions, ChatResult, DiscoveredModel, ProviderClient};
use crate::tools::ToolDefinition;
use crate::types::{ChatMessage, ChatRole, TokenUsage, ToolCallRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_DISCOVERY_PAGES: u32 = 5;
const DISCOVERY_PAGE_SIZE: u32 = 100;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: Vec<MessagePayload>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolPayload<'a>>>,
}

#[derive(Debug, Serialize)]
struct MessagePayload {
    role: String,
    content: ContentPayload,
}

/// Anthropic accepts plain text or a block array; tool use/results need blocks.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ContentPayload {
    Text(String),
    Blocks(Vec<OutboundBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutboundBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: serde_json::Value },
    ToolResult { tool_use_id: String, content: String },
}

#[derive(Debug, Serialize)]
struct ToolPayload<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: serde_json::Value },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModelsPage {
    data: Vec<ModelEntry>,
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

pub struct AnthropicProvider {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
        }
    }
}

fn classify_http_error(status: reqwest::StatusCode, body: &str) -> MoneyClawError {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return MoneyClawError::ProviderConfig(format!("auth failure: {body}"));
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return MoneyClawError::ProviderConfig(format!("model not found: {body}"));
    }
    if status.is_server_error() {
        return MoneyClawError::Transient(format!("{status}: {body}"));
    }
    MoneyClawError::Protocol(format!("{status}: {body}"))
}

#[async_trait]
impl ProviderClient for AnthropicProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<ChatResult, MoneyClawError> {
        let url = format!("{}/v1/messages", self.base_url);

        let system = messages
            .iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| m.content.clone());

        let turn_messages: Vec<MessagePayload> = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| {
                let role = match m.role {
                    ChatRole::User | ChatRole::Tool => "user",
                    ChatRole::Assistant => "assistant",
                    ChatRole::System => unreachable!(),
                };
                let content = if m.role == ChatRole::Tool {
                    ContentPayload::Blocks(vec![OutboundBlock::ToolResult {
                        tool_use_id: m.tool_call_id.clone().unwrap_or_default(),
                        content: m.content.clone(),
                    }])
                } else if m.role == ChatRole::Assistant && !m.tool_calls.is_empty() {
                    let mut blocks = Vec::new();
                    if !m.content.is_empty() {
                        blocks.push(OutboundBlock::Text { text: m.content.clone() });
                    }
                    for tc in &m.tool_calls {
                        blocks.push(OutboundBlock::ToolUse {
                            id: tc.id.clone(),
                            name: tc.name.clone(),
                            input: tc.arguments.clone(),
                        });
                    }
                    ContentPayload::Blocks(blocks)
                } else {
                    ContentPayload::Text(m.content.clone())
                };
                MessagePayload { role: role.into(), content }
            })
            .collect();

        let tool_payloads = if tools.is_empty() {
            None
        } else {
            Some(
                tools
                    .iter()
                    .map(|t| ToolPayload {
                        name: &t.name,
                        description: &t.description,
                        input_schema: &t.parameters,
                    })
                    .collect(),
            )
        };

        let request = MessagesRequest {
            model: &options.model,
            messages: turn_messages,
            max_tokens: options.max_tokens,
            system,
            tools: tool_payloads,
        };

        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .timeout(Duration::from_secs(options.timeout_secs))
            .send()
            .await
            .map_err(|e| MoneyClawError::Transient(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &body));
        }

        let body: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| MoneyClawError::Protocol(e.to_string()))?;

        let mut content = None;
        let mut tool_calls = Vec::new();
        for block in body.content {
            match block {
                ContentBlock::Text { text } => content = Some(text),
                ContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCallRequest {
                        id,
                        name,
                        arguments: input,
                    })
                }
                ContentBlock::Unknown => {}
            }
        }

        let usage = body
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            })
            .unwrap_or_default();

        Ok(ChatResult {
            content,
            tool_calls,
            usage,
        })
    }

    async fn list_models(&self) -> Result<Vec<DiscoveredModel>, MoneyClawError> {
        let mut models = Vec::new();
        let mut after: Option<String> = None;

        for _ in 0..MAX_DISCOVERY_PAGES {
            let mut req = self
                .http
                .get(format!("{}/v1/models", self.base_url))
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .query(&[("limit", DISCOVERY_PAGE_SIZE.to_string())])
                .timeout(Duration::from_secs(10));
            if let Some(cursor) = &after {
                req = req.query(&[("after_id", cursor)]);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| MoneyClawError::Transient(e.to_string()))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(classify_http_error(status, &body));
            }

            let page: ModelsPage = resp
                .json()
                .await
                .map_err(|e| MoneyClawError::Protocol(e.to_string()))?;

            let has_more = page.has_more;
            let last_id = page.last_id.clone();
            models.extend(page.data.into_iter().map(|m| DiscoveredModel {
                model_id: m.id,
                supports_vision: true,
            }));

            if !has_more {
                break;
            }
            after = last_id;
        }

        Ok(models)
    }
}
