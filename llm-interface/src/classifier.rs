use crate::provider::{LlmProvider, ToolRequest, DEFAULT_SYSTEM_PROMPT};
use crate::tools::ToolSchema;
use needfinder_core::{CoreError, LlmError};
use tracing::debug;

/// Forced-tool call returning one typed result.
///
/// Any transport error, malformed arguments, missing field or failed
/// validation comes back as an `Err`; nothing is swallowed here.
#[derive(Debug, Clone)]
pub struct StructuredClassifier<P> {
    provider: P,
    system_prompt: String,
}

impl<P: LlmProvider> StructuredClassifier<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn classify<T: ToolSchema>(&self, messages: Vec<String>) -> Result<T, CoreError> {
        let request = ToolRequest {
            system: self.system_prompt.clone(),
            messages,
            tool: T::definition(),
        };

        debug!(
            tool = T::NAME,
            provider = self.provider.provider_name(),
            messages = request.messages.len(),
            "Invoking structured classifier"
        );

        let arguments = self.provider.call_tool(&request).await?;
        let result: T = serde_json::from_value(arguments).map_err(|e| LlmError::SchemaMismatch {
            tool: T::NAME.to_string(),
            details: e.to_string(),
        })?;
        result.validate().map_err(|details| LlmError::SchemaMismatch {
            tool: T::NAME.to_string(),
            details,
        })?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedProvider;
    use crate::tools::{Applicability, SubredditRelevance};
    use needfinder_core::FailureKind;
    use serde_json::json;

    #[tokio::test]
    async fn test_classify_forces_the_result_tool() {
        let provider = ScriptedProvider::with_answer(json!({
            "explanation": "They say they lose receipts every month.",
            "applicable": true
        }));
        let classifier = StructuredClassifier::new(provider.clone());

        let result: Applicability = classifier
            .classify(vec!["Does this post apply?".to_string()])
            .await
            .unwrap();
        assert!(result.applicable);

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tool.name, "discern_applicability");
        assert_eq!(requests[0].system, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(requests[0].messages, vec!["Does this post apply?"]);
    }

    #[tokio::test]
    async fn test_missing_field_is_schema_mismatch() {
        let provider = ScriptedProvider::with_answer(json!({"applicable": true}));
        let classifier = StructuredClassifier::new(provider);

        let err = classifier
            .classify::<Applicability>(vec!["post".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::SchemaMismatch);
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_schema_mismatch() {
        let provider = ScriptedProvider::with_answer(json!({"relevance_score": 12}));
        let classifier = StructuredClassifier::new(provider);

        let err = classifier
            .classify::<SubredditRelevance>(vec!["subreddit".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Llm(LlmError::SchemaMismatch { ref tool, .. }) if tool == "score_subreddit_relevance"
        ));
    }

    #[tokio::test]
    async fn test_provider_errors_propagate() {
        let provider = ScriptedProvider::failing(|| {
            CoreError::Llm(LlmError::ServiceUnavailable {
                provider: "scripted".to_string(),
            })
        });
        let classifier = StructuredClassifier::new(provider).with_system_prompt("Be terse.");

        let err = classifier
            .classify::<Applicability>(vec!["post".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::Transport);
    }
}
