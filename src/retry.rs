//! Stage runner: per-attempt timeout and backoff retry.
//!
//! Tasks make exactly one call. [`run_stage`] wraps a task invocation with
//! the caller's policy from [`StageOptions`]: each attempt can be bounded by
//! a timeout, and attempts that end in a retryable
//! [`ServiceUnavailable`](PipelineError::ServiceUnavailable) are repeated
//! after a backoff delay. Schema violations are returned immediately.

use crate::backend::BackoffConfig;
use crate::error::{PipelineError, Result};
use crate::events::{emit, Event};
use crate::exec_ctx::ExecCtx;
use std::future::Future;
use std::time::Duration;

/// Caller-level policy for running a stage.
///
/// # Example
///
/// ```
/// use quizgen::backend::BackoffConfig;
/// use quizgen::retry::StageOptions;
/// use std::time::Duration;
///
/// let options = StageOptions::default()
///     .with_backoff(BackoffConfig::interactive())
///     .with_stage_timeout(Duration::from_secs(90));
/// assert_eq!(options.backoff.max_retries, 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOptions {
    /// Retry policy. Default: [`BackoffConfig::none()`].
    pub backoff: BackoffConfig,
    /// Upper bound on each attempt. `None` leaves it to the HTTP client timeout.
    pub stage_timeout: Option<Duration>,
}

impl StageOptions {
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = Some(timeout);
        self
    }
}

/// Run `attempt` under `options`, retrying transient unavailability.
///
/// `attempt` is called once per try and must build a fresh future each time.
pub async fn run_stage<T, F, Fut>(
    stage: &str,
    ctx: &ExecCtx,
    options: &StageOptions,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries: u32 = 0;
    loop {
        let result = match options.stage_timeout {
            Some(limit) => match tokio::time::timeout(limit, attempt()).await {
                Ok(result) => result,
                Err(_) => Err(PipelineError::ServiceUnavailable {
                    task: stage.to_string(),
                    reason: format!("timed out after {:?}", limit),
                    status: None,
                    retry_after: None,
                }),
            },
            None => attempt().await,
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if retries >= options.backoff.max_retries || !options.backoff.is_retryable(&err) {
            return Err(err);
        }

        retries += 1;
        let delay = options.backoff.delay_after(retries, &err);
        tracing::warn!(
            stage,
            attempt = retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "stage unavailable, retrying"
        );
        emit(
            &ctx.event_handler,
            Event::StageRetry {
                stage: stage.to_string(),
                attempt: retries,
                delay_ms: delay.as_millis() as u64,
                reason: err.to_string(),
            },
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::FnEventHandler;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio_test::{assert_err, assert_ok};

    fn unavailable(status: Option<u16>) -> PipelineError {
        PipelineError::ServiceUnavailable {
            task: "quiz".into(),
            reason: "overloaded".into(),
            status,
            retry_after: None,
        }
    }

    fn ctx() -> ExecCtx {
        ExecCtx::builder("http://unused").build().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_then_succeeds() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let ctx = ExecCtx::builder("http://unused")
            .event_handler(Arc::new(FnEventHandler(move |e: Event| {
                sink.lock().unwrap().push(e)
            })))
            .build()
            .unwrap();
        let options = StageOptions::default().with_backoff(BackoffConfig::standard());
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = run_stage("quiz", &ctx, &options, move || async move {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 | 1 => Err(unavailable(Some(503))),
                _ => Ok("done"),
            }
        })
        .await;

        assert_eq!(assert_ok!(result), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let retries: Vec<u32> = seen
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Event::StageRetry { attempt, .. } => Some(*attempt),
                _ => None,
            })
            .collect();
        assert_eq!(retries, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let options = StageOptions::default().with_backoff(BackoffConfig::interactive());
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = run_stage("quiz", &ctx(), &options, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(unavailable(None))
        })
        .await;
        assert_err!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_never_retries_schema_violation() {
        let options = StageOptions::default().with_backoff(BackoffConfig::aggressive());
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = run_stage("quiz", &ctx(), &options, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(PipelineError::schema("quiz", "missing field `quiz`"))
        })
        .await;
        assert_eq!(assert_err!(result).kind(), "schema_violation");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_retryable_status_returned_at_once() {
        let options = StageOptions::default().with_backoff(BackoffConfig::standard());
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = run_stage("quiz", &ctx(), &options, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(unavailable(Some(401)))
        })
        .await;
        assert_err!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_unavailable() {
        let options = StageOptions::default().with_stage_timeout(Duration::from_secs(2));
        let result: Result<()> = run_stage("flowchart", &ctx(), &options, || async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await;
        match assert_err!(result) {
            PipelineError::ServiceUnavailable { task, reason, status, .. } => {
                assert_eq!(task, "flowchart");
                assert!(reason.starts_with("timed out after"));
                assert_eq!(status, None);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
