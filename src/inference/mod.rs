pub mod provider;
pub mod providers;
pub mod router;

pub use provider::{ChatOptions, ChatResult, DiscoveredModel, ProviderClient};
pub use router::{Router, RouterChatOptions};
