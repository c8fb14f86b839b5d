//! OpenAI-compatible provider adapter (also used by any `/v1/chat/completions`
//! host, e.g. Conway Cloud — see [`super::conway`]).

use crate::error::MoneyClawError;
use crate::inference::provider::{ChatOptions, ChatResult, DiscoveredModel, ProviderClient};
use crate::tools::ToolDefinition;
use crate::types::{ChatMessage, ChatRole, ParamStyle, ToolCallRequest, TokenUsage};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Chat-model include pattern for the stock OpenAI host.
fn openai_include_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(gpt-|o[13][-.]|o[13]$|chatgpt-)").unwrap())
}

fn openai_exclude_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(dall-e|whisper|tts|text-embedding|ft:|babbage|davinci|curie|ada)").unwrap()
    })
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<MessagePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolPayload<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct MessagePayload {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCallPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ToolPayload<'a> {
    r#type: &'a str,
    function: FunctionPayload<'a>,
}

#[derive(Debug, Serialize)]
struct FunctionPayload<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCallPayload {
    id: String,
    #[serde(default)]
    r#type: String,
    function: FunctionCallPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCallPayload {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallPayload>,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// Adapter for OpenAI and any compatible host (Conway Cloud included).
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
    is_stock_openai: bool,
}

impl OpenAiProvider {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let is_stock_openai = base_url.contains("api.openai.com");
        Self {
            base_url,
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
            is_stock_openai,
        }
    }

    fn to_message_payloads(messages: &[ChatMessage]) -> Vec<MessagePayload> {
        messages
            .iter()
            .map(|m| {
                let tool_calls = if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ToolCallPayload {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: FunctionCallPayload {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.to_string(),
                                },
                            })
                            .collect(),
                    )
                };
                // OpenAI rejects an assistant message with both empty content
                // and no tool_calls, but accepts null content alongside tool_calls.
                let content = if matches!(m.role, ChatRole::Assistant) && tool_calls.is_some() && m.content.is_empty()
                {
                    None
                } else {
                    Some(m.content.clone())
                };
                MessagePayload {
                    role: match m.role {
                        ChatRole::System => "system".into(),
                        ChatRole::User => "user".into(),
                        ChatRole::Assistant => "assistant".into(),
                        ChatRole::Tool => "tool".into(),
                    },
                    content,
                    tool_calls,
                    tool_call_id: m.tool_call_id.clone(),
                }
            })
            .collect()
    }

    fn to_tool_payloads<'a>(tools: &'a [ToolDefinition]) -> Option<Vec<ToolPayload<'a>>> {
        if tools.is_empty() {
            return None;
        }
        Some(
            tools
                .iter()
                .map(|t| ToolPayload {
                    r#type: "function",
                    function: FunctionPayload {
                        name: &t.name,
                        description: &t.description,
                        parameters: &t.parameters,
                    },
                })
                .collect(),
        )
    }

    /// Flat-text fallback against `/v1/completions` when the chat endpoint is
    /// unsupported. Per-request only, never sticky.
    async fn completions_fallback(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResult, MoneyClawError> {
        let prompt = messages
            .iter()
            .map(|m| format!("{:?}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");

        #[derive(Serialize)]
        struct CompletionsRequest<'a> {
            model: &'a str,
            prompt: String,
            max_tokens: u32,
            temperature: f64,
        }

        let url = format!("{}/v1/completions", self.base_url);
        let request = CompletionsRequest {
            model: &options.model,
            prompt,
            max_tokens: options.max_tokens,
            temperature: 0.7,
        };

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
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

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| MoneyClawError::Protocol(e.to_string()))?;

        let choice = body.choices.into_iter().next();
        let content = choice.as_ref().and_then(|c| c.text.clone());
        let usage = body
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(ChatResult {
            content,
            tool_calls: Vec::new(),
            usage,
        })
    }
}

fn classify_http_error(status: reqwest::StatusCode, body: &str) -> MoneyClawError {
    if status == reqwest::StatusCode::NOT_FOUND {
        return MoneyClawError::Protocol(format!("endpoint not supported: {body}"));
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return MoneyClawError::ProviderConfig(format!("auth failure: {body}"));
    }
    if body.to_lowercase().contains("model") && body.to_lowercase().contains("not found") {
        return MoneyClawError::ProviderConfig(format!("model not found: {body}"));
    }
    if status.is_server_error() {
        return MoneyClawError::Transient(format!("{status}: {body}"));
    }
    MoneyClawError::Protocol(format!("{status}: {body}"))
}

#[async_trait]
impl ProviderClient for OpenAiProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<ChatResult, MoneyClawError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let (max_tokens, max_completion_tokens) = match options.param_style {
            ParamStyle::MaxTokens => (Some(options.max_tokens), None),
            ParamStyle::MaxCompletionTokens => (None, Some(options.max_tokens)),
        };

        let request = ChatRequest {
            model: &options.model,
            messages: Self::to_message_payloads(messages),
            tools: Self::to_tool_payloads(tools),
            max_tokens,
            max_completion_tokens,
            temperature: 0.7,
        };

        debug!("inference request to model: {}", options.model);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .timeout(Duration::from_secs(options.timeout_secs))
            .send()
            .await
            .map_err(|e| MoneyClawError::Transient(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let err = classify_http_error(status, &body);
            if matches!(err, MoneyClawError::Protocol(_)) && status == reqwest::StatusCode::NOT_FOUND {
                warn!("chat endpoint unsupported, falling back to /v1/completions once");
                return self.completions_fallback(messages, options).await;
            }
            return Err(err);
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| MoneyClawError::Protocol(e.to_string()))?;

        let choice = body.choices.into_iter().next();
        let message = choice.and_then(|c| c.message).unwrap_or(ResponseMessage {
            content: None,
            tool_calls: Vec::new(),
        });

        let tool_calls: Vec<ToolCallRequest> = message
            .tool_calls
            .into_iter()
            .map(|tc| {
                let args: serde_json::Value =
                    serde_json::from_str(&tc.function.arguments).unwrap_or_default();
                ToolCallRequest {
                    id: tc.id,
                    name: tc.function.name,
                    arguments: args,
                }
            })
            .collect();

        let usage = body
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(ChatResult {
            content: message.content,
            tool_calls,
            usage,
        })
    }

    async fn list_models(&self) -> Result<Vec<DiscoveredModel>, MoneyClawError> {
        let url = format!("{}/v1/models", self.base_url);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| MoneyClawError::Transient(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &body));
        }

        let body: ModelsResponse = resp
            .json()
            .await
            .map_err(|e| MoneyClawError::Protocol(e.to_string()))?;

        let models = body
            .data
            .into_iter()
            .map(|m| m.id)
            .filter(|id| {
                if !self.is_stock_openai {
                    return true;
                }
                openai_include_pattern().is_match(id) && !openai_exclude_pattern().is_match(id)
            })
            .map(|id| {
                let supports_vision = id.contains("gpt-4o") || id.contains("vision");
                DiscoveredModel {
                    model_id: id,
                    supports_vision,
                }
            })
            .collect();

        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_pattern_matches_chat_models() {
        let re = openai_include_pattern();
        assert!(re.is_match("gpt-4o"));
        assert!(re.is_match("o1-preview"));
        assert!(re.is_match("o1"));
        assert!(re.is_match("chatgpt-4o-latest"));
        assert!(!re.is_match("text-embedding-3-small"));
    }

    #[test]
    fn exclude_pattern_filters_non_chat_models() {
        let re = openai_exclude_pattern();
        assert!(re.is_match("dall-e-3"));
        assert!(re.is_match("whisper-1"));
        assert!(re.is_match("text-embedding-3-large"));
        assert!(re.is_match("ft:gpt-4o-mini:acme"));
        assert!(!re.is_match("gpt-4o"));
    }
}
