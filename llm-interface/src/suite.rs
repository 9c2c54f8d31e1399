use crate::classifier::StructuredClassifier;
use crate::provider::LlmProvider;
use needfinder_core::{PipelineConfig, TruncationRetry};

/// The need-relevance classifiers over one backend.
///
/// Operations live next to what they classify: `need`, `post` and
/// `subreddit`. Cloning is cheap and gives the clone its own backend handle.
#[derive(Debug, Clone)]
pub struct NeedClassifier<P> {
    pub(crate) classifier: StructuredClassifier<P>,
    pub(crate) truncation: TruncationRetry,
}

impl<P: LlmProvider> NeedClassifier<P> {
    pub fn new(provider: P) -> Self {
        Self {
            classifier: StructuredClassifier::new(provider),
            truncation: TruncationRetry::default(),
        }
    }

    pub fn from_config(provider: P, config: &PipelineConfig) -> Self {
        Self::new(provider).with_truncation_threshold(config.truncation_threshold)
    }

    pub fn with_truncation_threshold(mut self, threshold: usize) -> Self {
        self.truncation = TruncationRetry::new(threshold);
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.classifier = self.classifier.with_system_prompt(system_prompt);
        self
    }

    pub fn provider(&self) -> &P {
        self.classifier.provider()
    }

    pub fn truncation_threshold(&self) -> usize {
        self.truncation.threshold()
    }
}
