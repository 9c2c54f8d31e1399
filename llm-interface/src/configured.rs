use crate::anthropic::ClaudeProvider;
use crate::openai::OpenAiProvider;
use crate::provider::{LlmProvider, ToolRequest};
use needfinder_core::{CoreError, LlmConfig, LlmProviderKind};
use serde_json::Value;
use tracing::info;

/// Whichever backend the configuration names.
#[derive(Debug, Clone)]
pub enum ConfiguredProvider {
    OpenAi(OpenAiProvider),
    Claude(ClaudeProvider),
}

impl ConfiguredProvider {
    pub fn from_config(config: &LlmConfig) -> Result<Self, CoreError> {
        info!(
            provider = ?config.provider,
            model = %config.model,
            "Initializing LLM provider"
        );
        match config.provider {
            LlmProviderKind::OpenAi => OpenAiProvider::from_config(config).map(Self::OpenAi),
            LlmProviderKind::Anthropic => ClaudeProvider::from_config(config).map(Self::Claude),
        }
    }
}

impl LlmProvider for ConfiguredProvider {
    fn provider_name(&self) -> &str {
        match self {
            Self::OpenAi(provider) => provider.provider_name(),
            Self::Claude(provider) => provider.provider_name(),
        }
    }

    async fn call_tool(&self, request: &ToolRequest) -> Result<Value, CoreError> {
        match self {
            Self::OpenAi(provider) => provider.call_tool(request).await,
            Self::Claude(provider) => provider.call_tool(request).await,
        }
    }
}
