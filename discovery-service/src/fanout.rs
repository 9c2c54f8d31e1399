//! Bounded concurrent scoring of many subreddits against one need.
//!
//! Every subreddit becomes an independent task holding its own clone of the
//! classifier (and so its own backend handle) plus the shared, immutable
//! need. At most `max_concurrency` tasks are in flight; the batch completes
//! only once every task has produced a score or failed.

use futures::stream::{self, StreamExt};
use llm_interface::{LlmProvider, NeedClassifier};
use needfinder_core::{CoreError, ErrorExt, Need, PipelineConfig, RelevanceScore, Subreddit};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct FanOutConfig {
    pub max_concurrency: usize,
    pub task_timeout: Duration,
    /// Score given to a record whose task failed or timed out.
    pub fallback_score: RelevanceScore,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for FanOutConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency.max(1),
            task_timeout: config.task_timeout(),
            fallback_score: RelevanceScore::new(config.fallback_score)
                .unwrap_or(RelevanceScore::MIN),
        }
    }
}

/// A task whose record carries the fallback score instead of a model score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub subreddit: String,
    pub error: String,
}

/// Every input subreddit exactly once, each with a score, plus the tasks
/// that had to fall back.
#[derive(Debug, Clone, Default)]
pub struct FanOutReport {
    pub subreddits: Vec<Subreddit>,
    pub failures: Vec<TaskFailure>,
}

impl FanOutReport {
    pub fn len(&self) -> usize {
        self.subreddits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subreddits.is_empty()
    }

    /// True if `name`'s score is the fallback rather than a model answer.
    pub fn is_defaulted(&self, name: &str) -> bool {
        self.failures.iter().any(|failure| failure.subreddit == name)
    }

    /// Highest score first; ties keep their current order.
    pub fn sort_by_score(&mut self) {
        self.subreddits.sort_by(|a, b| b.score.cmp(&a.score));
    }
}

#[derive(Debug, Clone)]
pub struct FanOutScheduler<P> {
    classifier: NeedClassifier<P>,
    config: FanOutConfig,
}

impl<P: LlmProvider> FanOutScheduler<P> {
    pub fn new(classifier: NeedClassifier<P>, config: FanOutConfig) -> Self {
        Self { classifier, config }
    }

    pub fn config(&self) -> &FanOutConfig {
        &self.config
    }

    pub async fn score_subreddits(&self, subreddits: Vec<Subreddit>, need: &Need) -> FanOutReport {
        let total = subreddits.len();
        let started = Instant::now();
        info!(
            count = total,
            max_concurrency = self.config.max_concurrency,
            "Scoring subreddits"
        );

        let outcomes = run_bounded(subreddits, self.config.max_concurrency, |subreddit| {
            let classifier = self.classifier.clone();
            let need = need.clone();
            let task_timeout = self.config.task_timeout;
            async move { score_one(classifier, subreddit, need, task_timeout).await }
        })
        .await;

        let mut report = FanOutReport {
            subreddits: Vec::with_capacity(total),
            failures: Vec::new(),
        };
        for (mut subreddit, result) in outcomes {
            if let Err(e) = result {
                e.log_warn();
                warn!(
                    subreddit = %subreddit.name,
                    code = %e.error_code(),
                    "Subreddit scoring failed, using fallback score {}",
                    self.config.fallback_score
                );
                subreddit.score = Some(self.config.fallback_score);
                report.failures.push(TaskFailure {
                    subreddit: subreddit.name.clone(),
                    error: e.to_string(),
                });
            }
            report.subreddits.push(subreddit);
        }

        info!(
            count = total,
            failed = report.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Subreddit scoring finished"
        );
        report
    }
}

async fn score_one<P: LlmProvider>(
    classifier: NeedClassifier<P>,
    mut subreddit: Subreddit,
    need: Need,
    task_timeout: Duration,
) -> (Subreddit, Result<RelevanceScore, CoreError>) {
    debug!(subreddit = %subreddit.name, "Scoring task started");
    let scoring = classifier.score_subreddit_relevance(&mut subreddit, &need);
    let result = match tokio::time::timeout(task_timeout, scoring).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::Timeout {
            seconds: task_timeout.as_secs(),
        }),
    };
    (subreddit, result)
}

/// Drive one future per item with at most `limit` in flight, collecting
/// outputs in completion order.
pub(crate) async fn run_bounded<I, F, Fut>(items: I, limit: usize, task: F) -> Vec<Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    stream::iter(items)
        .map(task)
        .buffer_unordered(limit.max(1))
        .collect()
        .await
}
