//! Scripted in-memory provider for tests.

use crate::provider::{LlmProvider, ToolRequest};
use needfinder_core::CoreError;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Handler = dyn Fn(&ToolRequest) -> Result<Value, CoreError> + Send + Sync;

/// Answers every tool call with a caller-supplied closure and records the
/// requests it saw. Clones share the same recording.
#[derive(Clone)]
pub struct ScriptedProvider {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<ToolRequest>>>,
    latency: Option<Duration>,
}

impl fmt::Debug for ScriptedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedProvider")
            .field("calls", &self.call_count())
            .field("latency", &self.latency)
            .finish()
    }
}

impl ScriptedProvider {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ToolRequest) -> Result<Value, CoreError> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            requests: Arc::new(Mutex::new(Vec::new())),
            latency: None,
        }
    }

    /// Always answers with `arguments`.
    pub fn with_answer(arguments: Value) -> Self {
        Self::new(move |_| Ok(arguments.clone()))
    }

    /// Always fails with a fresh error from `make_error`.
    pub fn failing<F>(make_error: F) -> Self
    where
        F: Fn() -> CoreError + Send + Sync + 'static,
    {
        Self::new(move |_| Err(make_error()))
    }

    /// Delay every answer by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn requests(&self) -> Vec<ToolRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn record(&self, request: &ToolRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .map(|requests| requests.len())
            .unwrap_or_default()
    }
}

impl LlmProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn call_tool(&self, request: &ToolRequest) -> Result<Value, CoreError> {
        self.record(request);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        (self.handler)(request)
    }
}
