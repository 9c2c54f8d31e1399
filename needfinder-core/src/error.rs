use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Task did not finish within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("{provider} answered HTTP {status_code}: {message}")]
    RequestFailed {
        provider: String,
        status_code: u16,
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Failures reported by, or about, a language-model backend.
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("{provider} rejected the API key")]
    InvalidApiKey { provider: String },

    #[error("{provider} is rate limiting requests, retry in {retry_after}s")]
    RateLimitExceeded { provider: String, retry_after: u64 },

    #[error("Input is too large for {provider}: {details}")]
    PayloadTooLarge { provider: String, details: String },

    #[error("{provider} is unavailable")]
    ServiceUnavailable { provider: String },

    #[error("Request to {provider} timed out")]
    RequestTimeout { provider: String },

    #[error("Unreadable response from {provider}: {details}")]
    InvalidResponseFormat { provider: String, details: String },

    #[error("{provider} did not call tool {tool}")]
    MissingToolCall { provider: String, tool: String },

    #[error("Arguments for tool {tool} do not match its schema: {details}")]
    SchemaMismatch { tool: String, details: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read configuration file {path}")]
    FileNotFound { path: String },

    #[error("Missing required setting: {field}")]
    MissingField { field: String },

    #[error("Setting {field} has invalid value {value}")]
    InvalidValue { field: String, value: String },

    #[error("Environment variable {var_name} is not set")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Malformed TOML: {0}")]
    Parse(#[from] toml::de::Error),
}
