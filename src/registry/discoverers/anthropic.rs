use crate::inference::provider::{DiscoveredModel, ProviderClient};
use crate::inference::providers::AnthropicProvider;
use crate::registry::discoverer::Discoverer;
use crate::types::Provider;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub struct AnthropicDiscoverer {
    client: Arc<AnthropicProvider>,
}

impl AnthropicDiscoverer {
    pub fn new(client: Arc<AnthropicProvider>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Discoverer for AnthropicDiscoverer {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn discover(&self) -> Vec<DiscoveredModel> {
        match self.client.list_models().await {
            Ok(models) => models,
            Err(e) => {
                warn!("anthropic discovery failed, keeping cached catalogue: {e}");
                Vec::new()
            }
        }
    }
}
