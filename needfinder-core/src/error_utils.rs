use crate::error::*;
use std::time::Duration;
use tracing::{error, warn};

/// Where a classifier failure originated, as seen by the recovery layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network, rate limit, auth or malformed backend response.
    Transport,
    /// The backend refused the input because it was too long.
    PayloadTooLarge,
    /// The tool arguments were missing a field or failed validation.
    SchemaMismatch,
}

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> &'static str;
}

impl CoreError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            CoreError::Llm(e) => e.failure_kind(),
            CoreError::Serialization(_) => FailureKind::SchemaMismatch,
            _ => FailureKind::Transport,
        }
    }

    pub fn is_payload_too_large(&self) -> bool {
        self.failure_kind() == FailureKind::PayloadTooLarge
    }
}

impl LlmError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            LlmError::PayloadTooLarge { .. } => FailureKind::PayloadTooLarge,
            LlmError::SchemaMismatch { .. } => FailureKind::SchemaMismatch,
            _ => FailureKind::Transport,
        }
    }
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        match self {
            CoreError::Llm(e) => {
                e.log_error();
            }
            CoreError::Config(e) => {
                e.log_error();
            }
            other => error!(code = other.error_code(), "{}", other),
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(code = self.error_code(), kind = ?self.failure_kind(), "{}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::Llm(e) => e.is_retryable(),
            CoreError::Network(e) => e.is_timeout() || e.is_connect(),
            CoreError::Timeout { .. } => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::Llm(e) => e.retry_after(),
            CoreError::Timeout { seconds } => Some(Duration::from_secs(*seconds)),
            CoreError::Network(_) if self.is_retryable() => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Llm(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => "Could not reach the language model service.".to_string(),
            CoreError::Timeout { seconds } => {
                format!("Classification gave up after {seconds} seconds.")
            }
            CoreError::RequestFailed {
                provider,
                status_code,
                ..
            } => format!("{provider} refused the request (HTTP {status_code})."),
            CoreError::Serialization(_) | CoreError::Internal { .. } => {
                "Something went wrong while classifying. Please try again.".to_string()
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            CoreError::Llm(e) => e.error_code(),
            CoreError::Config(e) => e.error_code(),
            CoreError::Serialization(_) => "SERIALIZATION",
            CoreError::Network(_) => "NETWORK",
            CoreError::Timeout { .. } => "TIMEOUT",
            CoreError::RequestFailed { .. } => "REQUEST_FAILED",
            CoreError::Internal { .. } => "INTERNAL",
        }
    }
}

impl ErrorExt for LlmError {
    fn log_error(&self) -> &Self {
        error!(code = self.error_code(), "{}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(code = self.error_code(), "{}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimitExceeded { .. }
                | LlmError::ServiceUnavailable { .. }
                | LlmError::RequestTimeout { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimitExceeded { retry_after, .. } => {
                Some(Duration::from_secs(*retry_after))
            }
            LlmError::ServiceUnavailable { .. } | LlmError::RequestTimeout { .. } => {
                Some(Duration::from_secs(10))
            }
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            LlmError::InvalidApiKey { provider } => {
                format!("The {provider} API key was rejected. Check your credentials.")
            }
            LlmError::RateLimitExceeded {
                provider,
                retry_after,
            } => format!("{provider} is busy. Try again in {retry_after} seconds."),
            LlmError::PayloadTooLarge { .. } => {
                "The post is too long for the language model.".to_string()
            }
            LlmError::ServiceUnavailable { provider } | LlmError::RequestTimeout { provider } => {
                format!("{provider} is not responding right now.")
            }
            LlmError::InvalidResponseFormat { .. }
            | LlmError::MissingToolCall { .. }
            | LlmError::SchemaMismatch { .. } => {
                "The language model answered in an unexpected shape.".to_string()
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            LlmError::InvalidApiKey { .. } => "LLM_INVALID_API_KEY",
            LlmError::RateLimitExceeded { .. } => "LLM_RATE_LIMIT",
            LlmError::PayloadTooLarge { .. } => "LLM_PAYLOAD_TOO_LARGE",
            LlmError::ServiceUnavailable { .. } => "LLM_SERVICE_UNAVAILABLE",
            LlmError::RequestTimeout { .. } => "LLM_TIMEOUT",
            LlmError::InvalidResponseFormat { .. } => "LLM_INVALID_RESPONSE",
            LlmError::MissingToolCall { .. } => "LLM_MISSING_TOOL_CALL",
            LlmError::SchemaMismatch { .. } => "LLM_SCHEMA_MISMATCH",
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!(code = self.error_code(), "{}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(code = self.error_code(), "{}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => format!("Cannot open config file {path}."),
            ConfigError::MissingField { field } => format!("Set '{field}' in the config file."),
            ConfigError::InvalidValue { field, value } => {
                format!("'{value}' is not a valid value for '{field}'.")
            }
            ConfigError::MissingEnvironmentVariable { var_name } => {
                format!("Set the {var_name} environment variable or configure an API key.")
            }
            ConfigError::Parse(_) => "The config file is not valid TOML.".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND",
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD",
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR",
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR",
        }
    }
}
