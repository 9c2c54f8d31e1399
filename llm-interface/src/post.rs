use crate::prompts;
use crate::provider::LlmProvider;
use crate::suite::NeedClassifier;
use crate::tools::{Applicability, PostRelevance, PostSummary, ToolSchema};
use needfinder_core::{ErrorExt, Need, RecoveryResult, RedditPost, RelevanceScore};
use tracing::{debug, warn};

impl<P: LlmProvider> NeedClassifier<P> {
    /// Who the poster is, what they ask for and how it relates to `need`.
    ///
    /// Writes the result to `post.summary`; `None` when both the full and
    /// the truncated attempt failed.
    ///
    /// Each attempt is one classifier call. Rate limits, 5xx answers and
    /// timeouts are retried inside the backend adapter, up to
    /// `LlmConfig::max_attempts` HTTP requests per classifier call; set it
    /// to 1 for a single request per attempt.
    pub async fn summarize(&self, post: &mut RedditPost, need: &Need) -> Option<String> {
        let title = post.title.clone();
        let outcome = self
            .truncation
            .run(PostSummary::NAME, post.content(), |content| {
                self.classifier
                    .classify::<PostSummary>(prompts::summarize(&title, &content, need))
            })
            .await;

        let truncated = outcome.is_truncated();
        let summary = outcome.ok().map(|result| result.summary.trim().to_string());
        debug!(
            post = %post.id,
            truncated,
            summarized = summary.is_some(),
            "Summarize finished"
        );
        post.summary = summary.clone();
        summary
    }

    /// Whether the poster explicitly says they have `need`.
    ///
    /// The model's explanation is written to `post.full_answer` whenever an
    /// answer was obtained. Unrecoverable failures answer `false`. Backend
    /// retries work as for [`NeedClassifier::summarize`].
    pub async fn discern_applicability(&self, post: &mut RedditPost, need: &Need) -> bool {
        let title = post.title.clone();
        let outcome = self
            .truncation
            .run(Applicability::NAME, post.content(), |content| {
                self.classifier.classify::<Applicability>(prompts::discern_applicability(
                    &title, &content, need,
                ))
            })
            .await;

        match outcome {
            RecoveryResult::Completed(answer) | RecoveryResult::RecoveredTruncated(answer) => {
                debug!(post = %post.id, applicable = answer.applicable, "Applicability decided");
                post.full_answer = Some(answer.explanation);
                answer.applicable
            }
            RecoveryResult::Fallback(_) => false,
        }
    }

    /// Likelihood (1-10) that the poster has `need`, judged from the title
    /// and the summary written by [`NeedClassifier::summarize`].
    ///
    /// Without a summary, or when the backend fails, the answer is the
    /// conservative [`RelevanceScore::MIN`].
    pub async fn score_post_relevance(&self, post: &RedditPost, need: &Need) -> RelevanceScore {
        let Some(summary) = post.summary.as_deref() else {
            warn!(
                post = %post.id,
                "Post has no summary, defaulting relevance to {}",
                RelevanceScore::MIN
            );
            return RelevanceScore::MIN;
        };

        let messages = prompts::score_post_relevance(&post.title, summary, need);
        match self.classifier.classify::<PostRelevance>(messages).await {
            Ok(result) => result.score().unwrap_or(RelevanceScore::MIN),
            Err(e) => {
                e.log_warn();
                warn!(
                    post = %post.id,
                    "Post relevance scoring failed, defaulting to {}",
                    RelevanceScore::MIN
                );
                RelevanceScore::MIN
            }
        }
    }
}
