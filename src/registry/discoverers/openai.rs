use crate::inference::provider::{DiscoveredModel, ProviderClient};
use crate::inference::providers::OpenAiProvider;
use crate::registry::discoverer::Discoverer;
use crate::types::Provider;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub struct OpenAiDiscoverer {
    client: Arc<OpenAiProvider>,
}

impl OpenAiDiscoverer {
    pub fn new(client: Arc<OpenAiProvider>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Discoverer for OpenAiDiscoverer {
    fn provider(&self) -> Provider {
        Provider::Openai
    }

    async fn discover(&self) -> Vec<DiscoveredModel> {
        match self.client.list_models().await {
            Ok(models) => models,
            Err(e) => {
                warn!("openai discovery failed, keeping cached catalogue: {e}");
                Vec::new()
            }
        }
    }
}
