pub mod anthropic;
pub mod conway;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use conway::ConwayProvider;
pub use mock::{MockProviderClient, ScriptedReply};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
