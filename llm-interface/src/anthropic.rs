use crate::provider::{
    error_from_status, error_from_transport, retry_after_header, LlmProvider, ToolRequest,
};
use crate::retry::{RetryConfig, RetryExecutor};
use needfinder_core::{CoreError, LlmConfig, LlmError};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const PROVIDER: &str = "anthropic";

/// Anthropic messages API with a forced tool use.
#[derive(Debug, Clone)]
pub struct ClaudeProvider {
    http_client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    retry: RetryExecutor,
}

impl ClaudeProvider {
    pub fn new(api_key: String, model: String) -> Result<Self, CoreError> {
        Self::from_config(&LlmConfig {
            api_key: Some(api_key),
            model,
            ..Default::default()
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, CoreError> {
        let api_key = config.resolve_api_key()?;
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http_client,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| ANTHROPIC_API_BASE.to_string()),
            retry: RetryExecutor::new(RetryConfig::llm(config)),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_body(&self, request: &ToolRequest) -> Value {
        // All user messages go in one turn; the API expects alternating roles
        let content: Vec<Value> = request
            .messages
            .iter()
            .map(|text| json!({"type": "text", "text": text}))
            .collect();

        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": request.system,
            "messages": [{"role": "user", "content": content}],
            "tools": [{
                "name": request.tool.name,
                "description": request.tool.description,
                "input_schema": request.tool.parameters,
            }],
            "tool_choice": {"type": "tool", "name": request.tool.name},
        })
    }

    async fn send_once(&self, body: &Value, tool: &str) -> Result<Value, CoreError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!("Making Anthropic request for tool {}", tool);

        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| error_from_transport(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_header(&response);
            let text = response.text().await.unwrap_or_default();
            error!("Anthropic request failed with status {} for tool {}", status, tool);
            return Err(error_from_status(PROVIDER, status.as_u16(), retry_after, &text));
        }

        let message: Value = response.json().await.map_err(|e| {
            error!("Failed to parse Anthropic response: {}", e);
            LlmError::InvalidResponseFormat {
                provider: PROVIDER.to_string(),
                details: e.to_string(),
            }
        })?;
        parse_tool_input(&message, tool)
    }
}

/// The `input` of the `tool_use` block that called `tool`.
pub(crate) fn parse_tool_input(message: &Value, tool: &str) -> Result<Value, CoreError> {
    let blocks = message
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::InvalidResponseFormat {
            provider: PROVIDER.to_string(),
            details: "response has no content blocks".to_string(),
        })?;

    blocks
        .iter()
        .find(|block| {
            block.get("type").and_then(Value::as_str) == Some("tool_use")
                && block.get("name").and_then(Value::as_str) == Some(tool)
        })
        .and_then(|block| block.get("input"))
        .cloned()
        .ok_or_else(|| {
            LlmError::MissingToolCall {
                provider: PROVIDER.to_string(),
                tool: tool.to_string(),
            }
            .into()
        })
}

impl LlmProvider for ClaudeProvider {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    async fn call_tool(&self, request: &ToolRequest) -> Result<Value, CoreError> {
        let body = self.request_body(request);
        let tool = request.tool.name.as_str();
        self.retry
            .execute(tool, || self.send_once(&body, tool))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ToolDefinition;

    #[test]
    fn test_request_body_forces_the_tool() {
        let provider =
            ClaudeProvider::new("key".to_string(), "claude-3-5-sonnet-latest".to_string())
                .unwrap();
        let request = ToolRequest {
            system: "You are a helpful AI assistant.".to_string(),
            messages: vec!["List 7 user groups".to_string(), "Problem: rent".to_string()],
            tool: ToolDefinition {
                name: "generate_user_groups".to_string(),
                description: "Generate user groups.".to_string(),
                parameters: json!({"type": "object"}),
            },
        };

        let body = provider.request_body(&request);
        assert_eq!(body["system"], "You are a helpful AI assistant.");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["content"][1]["text"], "Problem: rent");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(body["tool_choice"]["type"], "tool");
        assert_eq!(body["tool_choice"]["name"], "generate_user_groups");
    }

    #[test]
    fn test_parse_tool_input() {
        let message = json!({
            "content": [
                {"type": "text", "text": "Let me think."},
                {"type": "tool_use", "id": "toolu_1", "name": "restate_need",
                 "input": {"restated_need": "I want to split rent fairly."}}
            ]
        });
        let input = parse_tool_input(&message, "restate_need").unwrap();
        assert_eq!(input["restated_need"], "I want to split rent fairly.");

        let err = parse_tool_input(&message, "summarize").unwrap_err();
        assert!(matches!(err, CoreError::Llm(LlmError::MissingToolCall { .. })));

        assert!(parse_tool_input(&json!({"type": "error"}), "summarize").is_err());
    }
}
