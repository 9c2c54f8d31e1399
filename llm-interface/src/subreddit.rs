use crate::prompts;
use crate::provider::LlmProvider;
use crate::suite::NeedClassifier;
use crate::tools::{SubredditRelevance, ToolSchema};
use needfinder_core::{CoreError, LlmError, Need, RelevanceScore, Subreddit};
use tracing::debug;

impl<P: LlmProvider> NeedClassifier<P> {
    /// Likelihood (1-10) that anyone in `subreddit` has `need`.
    ///
    /// On success the score is also written to `subreddit.score`. Errors are
    /// returned untouched so a scheduler can decide the fallback.
    pub async fn score_subreddit_relevance(
        &self,
        subreddit: &mut Subreddit,
        need: &Need,
    ) -> Result<RelevanceScore, CoreError> {
        let result: SubredditRelevance = self
            .classifier
            .classify(prompts::score_subreddit_relevance(subreddit, need))
            .await?;

        let score = result.score().ok_or_else(|| LlmError::SchemaMismatch {
            tool: SubredditRelevance::NAME.to_string(),
            details: format!("relevance score {} is outside 1..=10", result.relevance_score),
        })?;
        debug!(subreddit = %subreddit.name, score = score.value(), "Scored subreddit");
        subreddit.score = Some(score);
        Ok(score)
    }
}
