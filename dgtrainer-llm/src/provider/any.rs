//! Runtime-selected hosted provider

use super::*;
use crate::config::{ProviderConfig, ProviderType};

/// One of the hosted providers, chosen from configuration at startup.
pub enum AnyProvider {
    Anthropic(AnthropicProvider),
    OpenAI(OpenAIProvider),
}

impl AnyProvider {
    pub fn from_config(config: ProviderConfig) -> Result<Self, ProviderError> {
        Ok(match config.provider_type {
            ProviderType::Anthropic => AnyProvider::Anthropic(AnthropicProvider::new(config)?),
            ProviderType::OpenAI => AnyProvider::OpenAI(OpenAIProvider::new(config)?),
        })
    }
}

impl LlmProvider for AnyProvider {
    fn name(&self) -> &str {
        match self {
            AnyProvider::Anthropic(p) => p.name(),
            AnyProvider::OpenAI(p) => p.name(),
        }
    }

    fn models(&self) -> Vec<String> {
        match self {
            AnyProvider::Anthropic(p) => p.models(),
            AnyProvider::OpenAI(p) => p.models(),
        }
    }

    fn default_model(&self) -> &str {
        match self {
            AnyProvider::Anthropic(p) => p.default_model(),
            AnyProvider::OpenAI(p) => p.default_model(),
        }
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        match self {
            AnyProvider::Anthropic(p) => p.complete(request).await,
            AnyProvider::OpenAI(p) => p.complete(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_picks_provider() {
        let provider = AnyProvider::from_config(
            ProviderConfig::anthropic("sk-ant-test").with_model("claude-3-5-haiku-latest"),
        )
        .unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.default_model(), "claude-3-5-haiku-latest");

        let provider = AnyProvider::from_config(ProviderConfig::openai("sk-test")).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.default_model(), "gpt-4o");
    }
}
