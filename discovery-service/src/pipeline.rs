use crate::fanout::{run_bounded, FanOutConfig, FanOutReport, FanOutScheduler};
use llm_interface::{ConfiguredProvider, LlmProvider, NeedClassifier};
use needfinder_core::{
    AppConfig, CoreError, ErrorExt, Need, PipelineConfig, RedditPost, RelevanceScore, Subreddit,
};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// What the classifiers say about a need on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeedProfile {
    pub need: Need,
    pub restated_need: String,
    pub user_groups: Vec<String>,
}

/// A post after summarizing, applicability and relevance scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostAnalysis {
    pub post: RedditPost,
    pub applicable: bool,
    pub relevance_score: RelevanceScore,
}

/// Need profiling, subreddit ranking and post analysis over one backend.
#[derive(Debug, Clone)]
pub struct DiscoveryPipeline<P> {
    classifier: NeedClassifier<P>,
    scheduler: FanOutScheduler<P>,
    config: PipelineConfig,
}

impl DiscoveryPipeline<ConfiguredProvider> {
    /// Validate `config` and build the backend it names.
    pub fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let provider = ConfiguredProvider::from_config(&config.llm)?;
        Ok(Self::new(provider, config.pipeline.clone()))
    }
}

impl<P: LlmProvider> DiscoveryPipeline<P> {
    pub fn new(provider: P, config: PipelineConfig) -> Self {
        let classifier = NeedClassifier::from_config(provider, &config);
        let scheduler = FanOutScheduler::new(classifier.clone(), FanOutConfig::from(&config));
        Self {
            classifier,
            scheduler,
            config,
        }
    }

    pub fn classifier(&self) -> &NeedClassifier<P> {
        &self.classifier
    }

    /// Restatement and top user groups. Neither has a fallback, so a
    /// failure of either is logged as an error and returned.
    pub async fn profile_need(&self, need: &Need) -> Result<NeedProfile, CoreError> {
        let (restated_need, user_groups) = match tokio::try_join!(
            self.classifier.restate_need(need),
            self.classifier.generate_user_groups(need)
        ) {
            Ok(profile) => profile,
            Err(e) => {
                e.log_error();
                return Err(e);
            }
        };

        info!(need = %need, groups = ?user_groups, "Profiled need");
        Ok(NeedProfile {
            need: need.clone(),
            restated_need,
            user_groups,
        })
    }

    /// Score every subreddit and order them from most to least relevant.
    pub async fn rank_subreddits(&self, subreddits: Vec<Subreddit>, need: &Need) -> FanOutReport {
        let mut report = self.scheduler.score_subreddits(subreddits, need).await;
        report.sort_by_score();
        report
    }

    /// Records scoring at least `min_subreddit_score`, in report order.
    pub fn relevant_subreddits<'a>(&self, report: &'a FanOutReport) -> Vec<&'a Subreddit> {
        let threshold =
            RelevanceScore::new(self.config.min_subreddit_score).unwrap_or(RelevanceScore::MAX);
        report
            .subreddits
            .iter()
            .filter(|subreddit| subreddit.score.is_some_and(|score| score >= threshold))
            .collect()
    }

    /// Summarize, then check applicability, then score from the summary.
    pub async fn analyze_post(&self, mut post: RedditPost, need: &Need) -> PostAnalysis {
        self.classifier.summarize(&mut post, need).await;
        let applicable = self.classifier.discern_applicability(&mut post, need).await;
        let relevance_score = self.classifier.score_post_relevance(&post, need).await;

        PostAnalysis {
            post,
            applicable,
            relevance_score,
        }
    }

    /// [`analyze_post`](Self::analyze_post) for every post, at most
    /// `max_concurrency` at a time. Output order is unspecified.
    pub async fn analyze_posts(&self, posts: Vec<RedditPost>, need: &Need) -> Vec<PostAnalysis> {
        let total = posts.len();
        let task_timeout = self.config.task_timeout();
        info!(count = total, "Analyzing posts");

        let analyses = run_bounded(posts, self.config.max_concurrency, |post| {
            let pipeline = self.clone();
            let need = need.clone();
            async move { pipeline.analyze_with_timeout(post, &need, task_timeout).await }
        })
        .await;

        info!(
            count = total,
            applicable = analyses.iter().filter(|a| a.applicable).count(),
            "Post analysis finished"
        );
        analyses
    }

    async fn analyze_with_timeout(
        &self,
        post: RedditPost,
        need: &Need,
        task_timeout: Duration,
    ) -> PostAnalysis {
        let original = post.clone();
        match tokio::time::timeout(task_timeout, self.analyze_post(post, need)).await {
            Ok(analysis) => analysis,
            Err(_) => {
                warn!(
                    post = %original.id,
                    timeout_secs = task_timeout.as_secs(),
                    "Post analysis timed out, marking not applicable"
                );
                PostAnalysis {
                    post: original,
                    applicable: false,
                    relevance_score: RelevanceScore::MIN,
                }
            }
        }
    }
}
