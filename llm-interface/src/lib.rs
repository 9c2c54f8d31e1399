pub mod anthropic;
pub mod classifier;
pub mod configured;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod need;
pub mod openai;
mod post;
pub mod prompts;
pub mod provider;
pub mod retry;
mod subreddit;
pub mod suite;
pub mod tools;

pub use anthropic::ClaudeProvider;
pub use classifier::StructuredClassifier;
pub use configured::ConfiguredProvider;
pub use openai::OpenAiProvider;
pub use provider::{LlmProvider, ToolDefinition, ToolRequest, DEFAULT_SYSTEM_PROMPT};
pub use retry::{RetryConfig, RetryExecutor};
pub use suite::NeedClassifier;
pub use tools::ToolSchema;
