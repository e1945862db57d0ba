use std::time::Duration;
use thiserror::Error;

/// Errors produced by the pipeline and its components.
///
/// Backends report transport problems as [`Request`](PipelineError::Request),
/// [`Json`](PipelineError::Json) or [`HttpError`](PipelineError::HttpError).
/// A [`StructuredTask`](crate::task::StructuredTask) folds all of those into
/// [`ServiceUnavailable`](PipelineError::ServiceUnavailable), so stage callers
/// only ever see the two task-level kinds plus input/config errors.
///
/// An empty model answer is not an error. It is reported as
/// [`Generated::Empty`](crate::types::Generated::Empty).
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Low-level HTTP transport failure (connection refused, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed at the serde level.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error with status code, response body, and optional Retry-After hint.
    ///
    /// Returned by [`Backend`](crate::backend::Backend) implementations when
    /// the provider returns a non-success status code.
    #[error("HTTP {status}: {body}")]
    HttpError {
        /// HTTP status code (e.g. 429, 500, 503).
        status: u16,
        /// Response body text.
        body: String,
        /// Parsed `Retry-After` header value, if present.
        retry_after: Option<Duration>,
    },

    /// The completion service could not produce an answer for a task.
    #[error("task '{task}': completion service unavailable: {reason}")]
    ServiceUnavailable {
        /// Task that issued the call.
        task: String,
        /// Human-readable cause.
        reason: String,
        /// HTTP status, when the provider answered with one.
        status: Option<u16>,
        /// Provider's `Retry-After` hint, if any.
        retry_after: Option<Duration>,
    },

    /// The model answered, but the answer does not fit the task's output schema.
    #[error("task '{task}': schema violation: {reason}")]
    SchemaViolation {
        /// Task whose output was rejected.
        task: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Caller-supplied input was rejected before any call was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration detected at build time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl PipelineError {
    /// Wrap a backend error as [`ServiceUnavailable`](PipelineError::ServiceUnavailable)
    /// for the given task, keeping the HTTP status and `Retry-After` hint.
    pub fn unavailable(task: &str, err: PipelineError) -> Self {
        match err {
            PipelineError::ServiceUnavailable { .. } => err,
            PipelineError::HttpError {
                status,
                body,
                retry_after,
            } => PipelineError::ServiceUnavailable {
                task: task.to_string(),
                reason: format!("HTTP {}: {}", status, body),
                status: Some(status),
                retry_after,
            },
            other => PipelineError::ServiceUnavailable {
                task: task.to_string(),
                reason: other.to_string(),
                status: None,
                retry_after: None,
            },
        }
    }

    /// Build a [`SchemaViolation`](PipelineError::SchemaViolation) for a task.
    pub fn schema(task: &str, reason: impl Into<String>) -> Self {
        PipelineError::SchemaViolation {
            task: task.to_string(),
            reason: reason.into(),
        }
    }

    /// Short stable name of the error kind, for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Request(_) => "request",
            PipelineError::Json(_) => "json",
            PipelineError::HttpError { .. } => "http",
            PipelineError::ServiceUnavailable { .. } => "service_unavailable",
            PipelineError::SchemaViolation { .. } => "schema_violation",
            PipelineError::InvalidInput(_) => "invalid_input",
            PipelineError::InvalidConfig(_) => "invalid_config",
            PipelineError::Other(_) => "other",
        }
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
