//! Inference router: resolves model/provider/param-style, dispatches with
//! timeout + retry, and falls back to the flat-text completions endpoint.

use crate::error::MoneyClawError;
use crate::inference::provider::{ChatOptions, ChatResult, ProviderClient};
use crate::store::Database;
use crate::tools::ToolDefinition;
use crate::types::{ChatMessage, ModelRegistryRow, Provider, SurvivalTier};
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_5XX_RETRIES: u32 = 3;

/// Options a caller passes into [`Router::chat`].
#[derive(Debug, Clone, Default)]
pub struct RouterChatOptions {
    pub model_override: Option<String>,
    pub max_tokens: Option<u32>,
}

pub struct Router {
    providers: HashMap<Provider, Arc<dyn ProviderClient>>,
    default_model: String,
    low_compute_model: String,
    low_compute_mode: AtomicBool,
}

impl Router {
    pub fn new(
        providers: HashMap<Provider, Arc<dyn ProviderClient>>,
        default_model: String,
        low_compute_model: String,
    ) -> Self {
        Self {
            providers,
            default_model,
            low_compute_model,
            low_compute_mode: AtomicBool::new(false),
        }
    }

    /// Swap the router's default model field between `default_model` and
    /// `low_compute_model` (falling back to a hardcoded cheap model if unset).
    pub fn set_low_compute_mode(&self, on: bool) {
        self.low_compute_mode.store(on, Ordering::SeqCst);
    }

    pub fn get_default_model(&self) -> &str {
        if self.low_compute_mode.load(Ordering::SeqCst) {
            if self.low_compute_model.is_empty() {
                "gpt-5-mini"
            } else {
                &self.low_compute_model
            }
        } else {
            &self.default_model
        }
    }

    /// Resolve model id: explicit override > low-compute override > registry default.
    fn resolve_model_id(&self, options: &RouterChatOptions) -> String {
        if let Some(model) = &options.model_override {
            return model.clone();
        }
        self.get_default_model().to_string()
    }

    /// Full router contract: resolve, dispatch, retry, fall back, record usage.
    pub async fn chat(
        &self,
        db: &Database,
        tier: SurvivalTier,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        options: RouterChatOptions,
    ) -> Result<(ChatResult, ModelRegistryRow), MoneyClawError> {
        let model_id = self.resolve_model_id(&options);
        let row = self.resolve_registry_row(db, &model_id, tier)?;

        let client = self
            .providers
            .get(&row.provider)
            .ok_or_else(|| MoneyClawError::ProviderConfig(format!("no client for provider {}", row.provider)))?
            .clone();

        let chat_options = ChatOptions {
            model: row.model_id.clone(),
            max_tokens: options.max_tokens.unwrap_or(row.max_output_tokens),
            param_style: row.param_style,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        };

        let mut attempt = 0;
        loop {
            match client.chat(messages, tools, &chat_options).await {
                Ok(result) => return Ok((result, row)),
                Err(MoneyClawError::ProviderConfig(msg)) if msg.contains("model not found") => {
                    warn!("model {} not found upstream, tombstoning registry row", row.model_id);
                    let _ = db.set_registry_enabled(&row.model_id, false);
                    return Err(MoneyClawError::ProviderConfig(msg));
                }
                Err(MoneyClawError::ProviderConfig(msg)) => {
                    // Auth failure: fatal for this provider this turn, skip.
                    error!("provider config error, skipping this turn: {msg}");
                    return Err(MoneyClawError::ProviderConfig(msg));
                }
                Err(err @ MoneyClawError::Transient(_)) if attempt < MAX_5XX_RETRIES => {
                    attempt += 1;
                    let jitter_ms = rand::thread_rng().gen_range(100..500);
                    let backoff = Duration::from_millis(250 * attempt as u64 + jitter_ms);
                    warn!("transient inference error (attempt {attempt}/{MAX_5XX_RETRIES}): {err}");
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn resolve_registry_row(
        &self,
        db: &Database,
        model_id: &str,
        tier: SurvivalTier,
    ) -> Result<ModelRegistryRow, MoneyClawError> {
        let rows = db
            .list_all_registry_rows()
            .map_err(|e| MoneyClawError::Fatal(e.to_string()))?;

        let row = rows
            .into_iter()
            .find(|r| r.model_id == model_id)
            .ok_or_else(|| MoneyClawError::ProviderConfig(format!("unknown model id: {model_id}")))?;

        if !row.enabled {
            return Err(MoneyClawError::ProviderConfig(format!("model {model_id} is disabled")));
        }
        if row.tier_minimum > tier {
            return Err(MoneyClawError::ProviderConfig(format!(
                "model {model_id} requires tier >= {}, current tier is {tier}",
                row.tier_minimum
            )));
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::provider::DiscoveredModel;
    use crate::inference::providers::mock::{MockProviderClient, ScriptedReply};
    use crate::types::{ChatRole, ParamStyle, TokenUsage};
    use chrono::Utc;

    fn registry_row(model_id: &str, provider: Provider) -> ModelRegistryRow {
        ModelRegistryRow {
            model_id: model_id.to_string(),
            provider,
            display_name: model_id.to_string(),
            tier_minimum: SurvivalTier::Normal,
            cost_per_1k_input: 0.0,
            cost_per_1k_output: 0.0,
            max_output_tokens: 1024,
            context_window: 8192,
            supports_tools: true,
            supports_vision: false,
            param_style: ParamStyle::MaxTokens,
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn messages() -> Vec<ChatMessage> {
        vec![ChatMessage::text(ChatRole::User, "hi")]
    }

    #[tokio::test]
    async fn resolves_disabled_model_as_provider_config_error() {
        let db = Database::open_memory().unwrap();
        db.upsert_registry_row(&{
            let mut row = registry_row("gpt-4o", Provider::Openai);
            row.enabled = false;
            row
        })
        .unwrap();

        let mut providers: HashMap<Provider, Arc<dyn ProviderClient>> = HashMap::new();
        providers.insert(Provider::Openai, Arc::new(MockProviderClient::new(vec![])));
        let router = Router::new(providers, "gpt-4o".into(), "gpt-5-mini".into());

        let result = router
            .chat(&db, SurvivalTier::Normal, &messages(), &[], RouterChatOptions::default())
            .await;
        assert!(matches!(result, Err(MoneyClawError::ProviderConfig(_))));
    }

    #[tokio::test]
    async fn retries_transient_errors_then_succeeds() {
        let db = Database::open_memory().unwrap();
        db.upsert_registry_row(&registry_row("gpt-4o", Provider::Openai)).unwrap();

        let mut providers: HashMap<Provider, Arc<dyn ProviderClient>> = HashMap::new();
        providers.insert(
            Provider::Openai,
            Arc::new(MockProviderClient::new(vec![
                ScriptedReply::Err(MoneyClawError::Transient("timeout".into())),
                ScriptedReply::Ok(ChatResult {
                    content: Some("hello".into()),
                    tool_calls: Vec::new(),
                    usage: TokenUsage::default(),
                }),
            ])),
        );
        let router = Router::new(providers, "gpt-4o".into(), "gpt-5-mini".into());

        let (result, _) = router
            .chat(&db, SurvivalTier::Normal, &messages(), &[], RouterChatOptions::default())
            .await
            .unwrap();
        assert_eq!(result.content.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn low_compute_mode_swaps_default_model() {
        let providers: HashMap<Provider, Arc<dyn ProviderClient>> = HashMap::new();
        let router = Router::new(providers, "gpt-4o".into(), "gpt-5-mini".into());
        assert_eq!(router.get_default_model(), "gpt-4o");
        router.set_low_compute_mode(true);
        assert_eq!(router.get_default_model(), "gpt-5-mini");
    }

    #[allow(dead_code)]
    fn unused_discovered_model_ctor() -> DiscoveredModel {
        DiscoveredModel {
            model_id: String::new(),
            supports_vision: false,
        }
    }
}
