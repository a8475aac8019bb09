pub mod anthropic;
pub mod provider;
pub mod service;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use provider::LlmProvider;
pub use service::LlmService;
pub use types::{ChatMessage, ChatRequest};
