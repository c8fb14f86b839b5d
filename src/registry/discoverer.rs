//! Shared discovery contract, one implementation per provider family.

use crate::inference::provider::DiscoveredModel;
use async_trait::async_trait;

/// A provider-family discovery pass. All failures are soft: implementations
/// should swallow their own errors and return `Vec::new()`, logging a warning
/// — see [`super::refresh_provider`] for the caller-side contract this backs.
#[async_trait]
pub trait Discoverer: Send + Sync {
    fn provider(&self) -> crate::types::Provider;
    async fn discover(&self) -> Vec<DiscoveredModel>;
}
