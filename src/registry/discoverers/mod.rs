pub mod anthropic;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicDiscoverer;
pub use ollama::OllamaDiscoverer;
pub use openai::OpenAiDiscoverer;
