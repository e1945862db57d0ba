//! Mock backend for testing without a live LLM.
//!
//! [`MockBackend`] answers each call according to the task that issued it,
//! so concurrent stages get deterministic replies regardless of which one
//! reaches the backend first.
//!
//! # Example
//!
//! ```
//! use quizgen::backend::{MockBackend, MockReply};
//!
//! let mock = MockBackend::new()
//!     .route("information", MockReply::text(r#"{"information": "Sorting orders items."}"#))
//!     .route("quiz", MockReply::Status(503));
//! assert_eq!(mock.calls("quiz"), 0);
//! ```

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{Backend, LlmRequest, LlmResponse};
use crate::error::{PipelineError, Result};

/// What the mock does when a task calls it.
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Succeed with this text.
    Text(String),
    /// Fail as if the server answered with this HTTP status.
    Status(u16),
    /// Fail as if the server could not be reached.
    Unreachable,
}

impl MockReply {
    /// Shorthand for [`MockReply::Text`].
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// A test backend with replies routed by task name.
///
/// A task can be given a sequence of replies; each call consumes the next one
/// and the last one repeats. Tasks without a route get the fallback reply,
/// which defaults to [`MockReply::Unreachable`].
#[derive(Debug)]
pub struct MockBackend {
    routes: HashMap<String, Vec<MockReply>>,
    fallback: MockReply,
    latency: HashMap<String, Duration>,
    calls: Mutex<HashMap<String, usize>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
            fallback: MockReply::Unreachable,
            latency: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl MockBackend {
    /// Create a mock with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that answers every task with the same text.
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::new().fallback(MockReply::text(response))
    }

    /// Always answer `task` with `reply`.
    pub fn route(self, task: impl Into<String>, reply: MockReply) -> Self {
        self.sequence(task, vec![reply])
    }

    /// Answer successive calls from `task` with `replies` in order.
    pub fn sequence(mut self, task: impl Into<String>, replies: Vec<MockReply>) -> Self {
        self.routes.insert(task.into(), replies);
        self
    }

    /// Reply used for tasks without a route.
    pub fn fallback(mut self, reply: MockReply) -> Self {
        self.fallback = reply;
        self
    }

    /// Sleep this long before answering `task`.
    pub fn latency(mut self, task: impl Into<String>, delay: Duration) -> Self {
        self.latency.insert(task.into(), delay);
        self
    }

    /// Number of calls received from `task` so far.
    pub fn calls(&self, task: &str) -> usize {
        self.lock_calls().get(task).copied().unwrap_or(0)
    }

    /// Number of calls received across all tasks.
    pub fn total_calls(&self) -> usize {
        self.lock_calls().values().sum()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, HashMap<String, usize>> {
        // A panicking test thread must not hide the counts from the others.
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_reply(&self, task: &str) -> MockReply {
        let index = {
            let mut calls = self.lock_calls();
            let count = calls.entry(task.to_string()).or_insert(0);
            *count += 1;
            *count - 1
        };
        match self.routes.get(task) {
            Some(replies) if !replies.is_empty() => {
                replies[index.min(replies.len() - 1)].clone()
            }
            _ => self.fallback.clone(),
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn complete(
        &self,
        _client: &Client,
        _base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        let reply = self.next_reply(&request.task);
        if let Some(delay) = self.latency.get(&request.task) {
            tokio::time::sleep(*delay).await;
        }
        match reply {
            MockReply::Text(text) => Ok(LlmResponse {
                text,
                status: 200,
                metadata: None,
            }),
            MockReply::Status(status) => Err(PipelineError::HttpError {
                status,
                body: format!("mock status {}", status),
                retry_after: None,
            }),
            MockReply::Unreachable => Err(PipelineError::unavailable(
                &request.task,
                PipelineError::Other("connection refused".into()),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
