use crate::inference::provider::{DiscoveredModel, ProviderClient};
use crate::inference::providers::OllamaProvider;
use crate::registry::discoverer::Discoverer;
use crate::types::Provider;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub struct OllamaDiscoverer {
    client: Arc<OllamaProvider>,
}

impl OllamaDiscoverer {
    pub fn new(client: Arc<OllamaProvider>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Discoverer for OllamaDiscoverer {
    fn provider(&self) -> Provider {
        Provider::Ollama
    }

    async fn discover(&self) -> Vec<DiscoveredModel> {
        match self.client.list_models().await {
            Ok(models) => models,
            Err(e) => {
                warn!("ollama discovery failed, keeping cached catalogue: {e}");
                Vec::new()
            }
        }
    }
}
