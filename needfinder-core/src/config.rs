use crate::error::ConfigError;
use crate::error_recovery::DEFAULT_TRUNCATION_THRESHOLD;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    OpenAi,
    Anthropic,
}

impl LlmProviderKind {
    pub fn api_key_var(self) -> &'static str {
        match self {
            LlmProviderKind::OpenAi => "OPENAI_API_KEY",
            LlmProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "openai" => Some(LlmProviderKind::OpenAi),
            "anthropic" => Some(LlmProviderKind::Anthropic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub request_timeout_secs: u64,
    /// Attempts per backend call for transient failures (rate limits, 5xx).
    pub max_attempts: u32,
    /// Completion budget, only sent to providers that require one.
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::OpenAi,
            model: "gpt-4-0613".to_string(),
            api_key: None,
            base_url: None,
            request_timeout_secs: 60,
            max_attempts: 3,
            max_tokens: 1024,
        }
    }
}

impl LlmConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The configured key, or the provider's standard environment variable.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }
        let var_name = self.provider.api_key_var();
        std::env::var(var_name).map_err(|_| ConfigError::MissingEnvironmentVariable {
            var_name: var_name.to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub truncation_threshold: usize,
    pub max_concurrency: usize,
    pub task_timeout_secs: u64,
    /// Score given to a subreddit whose scoring task failed or timed out.
    pub fallback_score: i64,
    pub min_subreddit_score: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            truncation_threshold: DEFAULT_TRUNCATION_THRESHOLD,
            max_concurrency: 16,
            task_timeout_secs: 120,
            fallback_score: 1,
            min_subreddit_score: 7,
        }
    }
}

impl PipelineConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&contents)
    }

    /// Apply `NEEDFINDER_*` environment overrides on top of the file values.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("NEEDFINDER_PROVIDER") {
            self.llm.provider =
                LlmProviderKind::parse(&value).ok_or_else(|| ConfigError::InvalidValue {
                    field: "llm.provider".to_string(),
                    value,
                })?;
        }
        if let Some(value) = lookup("NEEDFINDER_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = lookup("NEEDFINDER_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = lookup("NEEDFINDER_MAX_CONCURRENCY") {
            self.pipeline.max_concurrency =
                value.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "pipeline.max_concurrency".to_string(),
                    value,
                })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "llm.model".to_string(),
            });
        }

        let checks: [(&str, bool, String); 7] = [
            (
                "llm.request_timeout_secs",
                self.llm.request_timeout_secs > 0,
                self.llm.request_timeout_secs.to_string(),
            ),
            (
                "llm.max_attempts",
                self.llm.max_attempts > 0,
                self.llm.max_attempts.to_string(),
            ),
            (
                "pipeline.truncation_threshold",
                self.pipeline.truncation_threshold > 0,
                self.pipeline.truncation_threshold.to_string(),
            ),
            (
                "pipeline.max_concurrency",
                self.pipeline.max_concurrency > 0,
                self.pipeline.max_concurrency.to_string(),
            ),
            (
                "pipeline.task_timeout_secs",
                self.pipeline.task_timeout_secs > 0,
                self.pipeline.task_timeout_secs.to_string(),
            ),
            (
                "pipeline.fallback_score",
                (1..=10).contains(&self.pipeline.fallback_score),
                self.pipeline.fallback_score.to_string(),
            ),
            (
                "pipeline.min_subreddit_score",
                (1..=10).contains(&self.pipeline.min_subreddit_score),
                self.pipeline.min_subreddit_score.to_string(),
            ),
        ];

        for (field, valid, value) in checks {
            if !valid {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}
