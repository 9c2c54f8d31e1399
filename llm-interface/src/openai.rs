use crate::provider::{
    error_from_status, error_from_transport, retry_after_header, LlmProvider, ToolRequest,
};
use crate::retry::{RetryConfig, RetryExecutor};
use needfinder_core::{CoreError, LlmConfig, LlmError};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const PROVIDER: &str = "openai";

/// OpenAI-compatible chat completions with a forced function call.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    http_client: Client,
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryExecutor,
}

impl OpenAiProvider {
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
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_API_BASE.to_string()),
            retry: RetryExecutor::new(RetryConfig::llm(config)),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, request: &ToolRequest) -> Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(json!({"role": "system", "content": request.system}));
        messages.extend(
            request
                .messages
                .iter()
                .map(|content| json!({"role": "user", "content": content})),
        );

        json!({
            "model": self.model,
            "messages": messages,
            "tools": [{
                "type": "function",
                "function": {
                    "name": request.tool.name,
                    "description": request.tool.description,
                    "parameters": request.tool.parameters,
                },
            }],
            "tool_choice": {
                "type": "function",
                "function": {"name": request.tool.name},
            },
        })
    }

    async fn send_once(&self, body: &Value, tool: &str) -> Result<Value, CoreError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Making OpenAI request for tool {}", tool);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| error_from_transport(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_header(&response);
            let text = response.text().await.unwrap_or_default();
            error!("OpenAI request failed with status {} for tool {}", status, tool);
            return Err(error_from_status(PROVIDER, status.as_u16(), retry_after, &text));
        }

        let completion: Value = response.json().await.map_err(|e| {
            error!("Failed to parse OpenAI response: {}", e);
            LlmError::InvalidResponseFormat {
                provider: PROVIDER.to_string(),
                details: e.to_string(),
            }
        })?;
        parse_tool_arguments(&completion, tool)
    }
}

/// Arguments of the first tool call, parsed from their JSON string form.
pub(crate) fn parse_tool_arguments(completion: &Value, tool: &str) -> Result<Value, CoreError> {
    let call = completion
        .pointer("/choices/0/message/tool_calls/0/function")
        .ok_or_else(|| LlmError::MissingToolCall {
            provider: PROVIDER.to_string(),
            tool: tool.to_string(),
        })?;

    if let Some(name) = call.get("name").and_then(Value::as_str) {
        if name != tool {
            return Err(LlmError::InvalidResponseFormat {
                provider: PROVIDER.to_string(),
                details: format!("expected call to {tool}, got {name}"),
            }
            .into());
        }
    }

    let arguments = call
        .get("arguments")
        .and_then(Value::as_str)
        .ok_or_else(|| LlmError::InvalidResponseFormat {
            provider: PROVIDER.to_string(),
            details: "tool call has no arguments".to_string(),
        })?;

    serde_json::from_str(arguments).map_err(|e| {
        LlmError::SchemaMismatch {
            tool: tool.to_string(),
            details: format!("arguments are not valid JSON: {e}"),
        }
        .into()
    })
}

impl LlmProvider for OpenAiProvider {
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
    use needfinder_core::FailureKind;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new("sk-test".to_string(), "gpt-4-0613".to_string()).unwrap()
    }

    fn request() -> ToolRequest {
        ToolRequest {
            system: "You are a helpful AI assistant.".to_string(),
            messages: vec!["first".to_string(), "second".to_string()],
            tool: ToolDefinition {
                name: "summarize".to_string(),
                description: "Summarize the post.".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            },
        }
    }

    #[test]
    fn test_request_body_forces_the_tool() {
        let body = provider().request_body(&request());

        assert_eq!(body["model"], "gpt-4-0613");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "first");
        assert_eq!(body["messages"][2]["role"], "user");
        assert_eq!(body["tools"][0]["function"]["name"], "summarize");
        assert_eq!(body["tool_choice"]["type"], "function");
        assert_eq!(body["tool_choice"]["function"]["name"], "summarize");
    }

    #[test]
    fn test_parse_tool_arguments() {
        let completion = json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "summarize",
                            "arguments": "{\"summary\": \"A freelancer asking for budgeting tips.\"}"
                        }
                    }]
                }
            }]
        });

        let arguments = parse_tool_arguments(&completion, "summarize").unwrap();
        assert_eq!(arguments["summary"], "A freelancer asking for budgeting tips.");
    }

    #[test]
    fn test_parse_errors() {
        let no_call = json!({"choices": [{"message": {"content": "Sure!"}}]});
        let err = parse_tool_arguments(&no_call, "summarize").unwrap_err();
        assert!(matches!(err, CoreError::Llm(LlmError::MissingToolCall { .. })));

        let bad_json = json!({
            "choices": [{"message": {"tool_calls": [{"function": {
                "name": "summarize",
                "arguments": "{\"summary\": "
            }}]}}]
        });
        let err = parse_tool_arguments(&bad_json, "summarize").unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::SchemaMismatch);

        let wrong_tool = json!({
            "choices": [{"message": {"tool_calls": [{"function": {
                "name": "restate_need",
                "arguments": "{}"
            }}]}}]
        });
        assert!(parse_tool_arguments(&wrong_tool, "summarize").is_err());
    }

    #[test]
    fn test_base_url_override() {
        let provider = provider().with_base_url("http://localhost:8080/v1");
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
        assert_eq!(provider.model(), "gpt-4-0613");
        assert_eq!(provider.provider_name(), "openai");
    }
}
