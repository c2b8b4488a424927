//! # dgtrainer-llm
//!
//! Talking to hosted language models.
//!
//! ## Core Concepts
//! - **Provider**: Trait-based LLM communication (Anthropic, OpenAI, scripted)
//! - **Config**: `provider:model` specs and credentials read from the environment
//! - **Tools**: function definitions the model can be forced to call, which is
//!   how structured output is requested

pub mod config;
pub mod provider;

pub use config::{load_dotenv, log_dotenv, ModelSpec, ProviderConfig, ProviderType};
pub use dgtrainer_error::{Error, ErrorKind, ErrorStatus, Result};
pub use provider::{
    AnthropicProvider, AnyProvider, ChatMessage, CompletionRequest, CompletionResponse,
    FinishReason, LlmProvider, OpenAIProvider, ProviderError, Role, ScriptedProvider, ToolCall,
    ToolChoice, ToolDefinition, Usage,
};
