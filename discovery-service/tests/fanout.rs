use discovery_service::{FanOutConfig, FanOutScheduler};
use llm_interface::mock::ScriptedProvider;
use llm_interface::{LlmProvider, NeedClassifier, ToolRequest};
use needfinder_core::{CoreError, LlmError, Need, RelevanceScore, Subreddit};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scores each subreddit by its name length and tracks how many calls are in
/// flight at once. Calls for `slow` never finish within a test.
#[derive(Clone, Default)]
struct GaugedProvider {
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    slow: Option<&'static str>,
}

impl LlmProvider for GaugedProvider {
    fn provider_name(&self) -> &str {
        "gauged"
    }

    async fn call_tool(&self, request: &ToolRequest) -> Result<Value, CoreError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);

        let message = &request.messages[0];
        let delay = match self.slow {
            Some(name) if message.contains(&format!("interested in: {name}\n")) => {
                Duration::from_secs(30)
            }
            _ => Duration::from_millis(20),
        };
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let name = message
            .split("interested in: ")
            .nth(1)
            .and_then(|rest| rest.lines().next())
            .unwrap_or_default();
        Ok(json!({"relevance_score": (name.len() % 10 + 1) as i64}))
    }
}

fn subreddits(count: usize) -> Vec<Subreddit> {
    (0..count)
        .map(|i| Subreddit::new(format!("sub{}", "x".repeat(i)), format!("Community {i}")))
        .collect()
}

fn config(max_concurrency: usize, task_timeout: Duration) -> FanOutConfig {
    FanOutConfig {
        max_concurrency,
        task_timeout,
        fallback_score: RelevanceScore::MIN,
    }
}

#[tokio::test]
async fn test_every_subreddit_comes_back_once_with_its_own_score() {
    let provider = GaugedProvider::default();
    let scheduler = FanOutScheduler::new(
        NeedClassifier::new(provider),
        config(4, Duration::from_secs(5)),
    );

    let inputs = subreddits(12);
    let report = scheduler
        .score_subreddits(inputs.clone(), &Need::from("Track expenses"))
        .await;

    assert_eq!(report.len(), inputs.len());
    assert!(report.failures.is_empty());

    let names: HashSet<_> = report.subreddits.iter().map(|s| s.name.clone()).collect();
    let expected: HashSet<_> = inputs.iter().map(|s| s.name.clone()).collect();
    assert_eq!(names, expected);

    for subreddit in &report.subreddits {
        let expected = (subreddit.name.len() % 10 + 1) as u8;
        assert_eq!(subreddit.score.map(|s| s.value()), Some(expected));
    }
}

#[tokio::test]
async fn test_concurrency_is_capped() {
    let provider = GaugedProvider::default();
    let peak = provider.peak.clone();
    let scheduler = FanOutScheduler::new(
        NeedClassifier::new(provider),
        config(3, Duration::from_secs(5)),
    );

    let report = scheduler
        .score_subreddits(subreddits(10), &Need::from("Track expenses"))
        .await;

    assert_eq!(report.len(), 10);
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_timed_out_task_gets_fallback_score() {
    let provider = GaugedProvider {
        slow: Some("subxx"),
        ..Default::default()
    };
    let scheduler = FanOutScheduler::new(
        NeedClassifier::new(provider),
        config(8, Duration::from_millis(200)),
    );

    let report = scheduler
        .score_subreddits(subreddits(4), &Need::from("Track expenses"))
        .await;

    assert_eq!(report.len(), 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].subreddit, "subxx");
    assert!(report.is_defaulted("subxx"));

    let slow = report.subreddits.iter().find(|s| s.name == "subxx").unwrap();
    assert_eq!(slow.score, Some(RelevanceScore::MIN));
}

#[tokio::test]
async fn test_failures_are_isolated_per_task() {
    let provider = ScriptedProvider::new(|request: &ToolRequest| -> Result<Value, CoreError> {
        if request.messages[0].contains("interested in: broken\n") {
            Err(CoreError::Llm(LlmError::ServiceUnavailable {
                provider: "scripted".to_string(),
            }))
        } else {
            Ok(json!({"relevance_score": 8}))
        }
    });
    let scheduler = FanOutScheduler::new(
        NeedClassifier::new(provider.clone()),
        FanOutConfig {
            fallback_score: RelevanceScore::new(2).unwrap(),
            ..config(2, Duration::from_secs(5))
        },
    );

    let inputs = vec![
        Subreddit::new("personalfinance", "Budgeting"),
        Subreddit::new("broken", "Always fails"),
        Subreddit::new("frugal", "Saving money"),
    ];
    let report = scheduler
        .score_subreddits(inputs, &Need::from("Track expenses"))
        .await;

    assert_eq!(report.len(), 3);
    assert_eq!(provider.call_count(), 3);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.contains("unavailable"));

    for subreddit in &report.subreddits {
        let expected = if subreddit.name == "broken" { 2 } else { 8 };
        assert_eq!(subreddit.score.map(|s| s.value()), Some(expected));
    }
}

#[tokio::test]
async fn test_empty_batch() {
    let scheduler = FanOutScheduler::new(
        NeedClassifier::new(ScriptedProvider::with_answer(json!({"relevance_score": 5}))),
        FanOutConfig::default(),
    );
    let report = scheduler.score_subreddits(Vec::new(), &Need::from("x")).await;
    assert!(report.is_empty());
}
