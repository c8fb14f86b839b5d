//! Model Registry & Discovery — one [`Discoverer`] per provider family,
//! upserting into the [`crate::store::Database`]'s `model_registry` table.

pub mod discoverer;
pub mod discoverers;

pub use discoverer::Discoverer;

use crate::store::Database;
use crate::types::{ModelRegistryRow, ParamStyle, Provider, SurvivalTier};
use anyhow::Result;
use chrono::Utc;
use std::collections::HashSet;
use tracing::info;

fn default_context_window(provider: Provider) -> u32 {
    match provider {
        Provider::Anthropic => 200_000,
        _ => 128_000,
    }
}

fn looks_like_vision_model(model_id: &str) -> bool {
    model_id.contains("vision") || model_id.contains("gpt-4o") || model_id.contains("claude")
}

/// Run one discovery pass for a provider and reconcile the registry.
///
/// Soft-failure contract: an empty result (whether the discoverer swallowed a
/// network error, or the provider genuinely has nothing to offer) leaves the
/// previously cached catalogue untouched — no upserts, no tombstoning.
pub async fn refresh_provider(db: &Database, discoverer: &dyn Discoverer) -> Result<usize> {
    let provider = discoverer.provider();
    let discovered = discoverer.discover().await;
    if discovered.is_empty() {
        info!("discovery pass for {provider} returned no models, catalogue unchanged");
        return Ok(0);
    }

    let existing = db.list_all_registry_rows()?;
    let seen_ids: HashSet<&str> = discovered.iter().map(|m| m.model_id.as_str()).collect();

    for model in &discovered {
        if let Some(existing_row) = existing.iter().find(|r| r.model_id == model.model_id) {
            // Preserve human-edited fields; only updated_at moves unconditionally.
            let mut row = existing_row.clone();
            row.updated_at = Utc::now();
            db.upsert_registry_row(&row)?;
        } else {
            let row = ModelRegistryRow {
                model_id: model.model_id.clone(),
                provider,
                display_name: model.model_id.clone(),
                tier_minimum: SurvivalTier::Normal,
                cost_per_1k_input: 0.0,
                cost_per_1k_output: 0.0,
                max_output_tokens: 4096,
                context_window: default_context_window(provider),
                supports_tools: true,
                supports_vision: model.supports_vision || looks_like_vision_model(&model.model_id),
                param_style: ParamStyle::MaxTokens,
                enabled: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            db.upsert_registry_row(&row)?;
        }
    }

    let mut tombstoned = 0;
    for row in existing.iter().filter(|r| r.provider == provider && r.enabled) {
        if !seen_ids.contains(row.model_id.as_str()) {
            db.set_registry_enabled(&row.model_id, false)?;
            tombstoned += 1;
        }
    }
    if tombstoned > 0 {
        info!("tombstoned {tombstoned} withdrawn {provider} model(s)");
    }

    Ok(discovered.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::provider::DiscoveredModel;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedDiscoverer {
        provider: Provider,
        models: Mutex<Vec<DiscoveredModel>>,
    }

    #[async_trait]
    impl Discoverer for FixedDiscoverer {
        fn provider(&self) -> Provider {
            self.provider
        }
        async fn discover(&self) -> Vec<DiscoveredModel> {
            self.models.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn discovery_tombstones_withdrawn_models() {
        let db = Database::open_memory().unwrap();

        let discoverer = FixedDiscoverer {
            provider: Provider::Openai,
            models: Mutex::new(vec![
                DiscoveredModel { model_id: "gpt-4o".into(), supports_vision: true },
                DiscoveredModel { model_id: "gpt-4o-mini".into(), supports_vision: false },
            ]),
        };
        refresh_provider(&db, &discoverer).await.unwrap();
        assert_eq!(db.list_enabled_registry_rows().unwrap().len(), 2);

        *discoverer.models.lock().unwrap() = vec![DiscoveredModel {
            model_id: "gpt-4o".into(),
            supports_vision: true,
        }];
        refresh_provider(&db, &discoverer).await.unwrap();

        let enabled = db.list_enabled_registry_rows().unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].model_id, "gpt-4o");
    }

    #[tokio::test]
    async fn empty_discovery_pass_leaves_catalogue_untouched() {
        let db = Database::open_memory().unwrap();
        let discoverer = FixedDiscoverer {
            provider: Provider::Openai,
            models: Mutex::new(vec![DiscoveredModel {
                model_id: "gpt-4o".into(),
                supports_vision: true,
            }]),
        };
        refresh_provider(&db, &discoverer).await.unwrap();

        *discoverer.models.lock().unwrap() = vec![];
        refresh_provider(&db, &discoverer).await.unwrap();

        assert_eq!(db.list_enabled_registry_rows().unwrap().len(), 1);
    }
}
