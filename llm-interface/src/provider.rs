use needfinder_core::{CoreError, LlmError};
use serde::Serialize;
use std::future::Future;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// The single function a provider is forced to call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// One forced-tool request: system instruction, ordered user messages, and
/// the tool the model must call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    pub system: String,
    pub messages: Vec<String>,
    pub tool: ToolDefinition,
}

/// A language-model backend that answers only through forced tool calls.
///
/// Implementations are cheap handles: every concurrent task clones its own.
pub trait LlmProvider: Clone + Send + Sync + 'static {
    fn provider_name(&self) -> &str;

    /// Send `request` and return the JSON arguments of the tool call.
    fn call_tool(
        &self,
        request: &ToolRequest,
    ) -> impl Future<Output = Result<serde_json::Value, CoreError>> + Send;
}

const PAYLOAD_TOO_LARGE_MARKERS: [&str; 5] = [
    "context_length_exceeded",
    "maximum context length",
    "prompt is too long",
    "request_too_large",
    "too many tokens",
];

/// Map a non-success HTTP status to the error taxonomy.
pub(crate) fn error_from_status(
    provider: &str,
    status: u16,
    retry_after: Option<u64>,
    body: &str,
) -> CoreError {
    let lowered = body.to_ascii_lowercase();
    let too_large = PAYLOAD_TOO_LARGE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker));

    let provider = provider.to_string();
    match status {
        401 | 403 => LlmError::InvalidApiKey { provider }.into(),
        413 => LlmError::PayloadTooLarge {
            provider,
            details: body.to_string(),
        }
        .into(),
        400 if too_large => LlmError::PayloadTooLarge {
            provider,
            details: body.to_string(),
        }
        .into(),
        429 => LlmError::RateLimitExceeded {
            provider,
            retry_after: retry_after.unwrap_or(60),
        }
        .into(),
        500..=599 => LlmError::ServiceUnavailable { provider }.into(),
        _ => CoreError::RequestFailed {
            provider,
            status_code: status,
            message: body.to_string(),
        },
    }
}

/// Map a transport-level reqwest failure.
pub(crate) fn error_from_transport(provider: &str, error: reqwest::Error) -> CoreError {
    if error.is_timeout() {
        LlmError::RequestTimeout {
            provider: provider.to_string(),
        }
        .into()
    } else {
        CoreError::Network(error)
    }
}

pub(crate) fn retry_after_header(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}
