//! Backend trait and normalized request/response types.
//!
//! The [`Backend`] trait is the completion service seen by every stage. It
//! translates between normalized [`LlmRequest`]/[`LlmResponse`] types and
//! provider-specific HTTP APIs. Built-in implementations: [`OllamaBackend`],
//! [`OpenAiBackend`] (feature `openai`), and [`MockBackend`] for tests.
//!
//! ## Architecture
//!
//! ```text
//! StructuredTask ──► LlmRequest ──► Backend::complete() ──► LlmResponse
//!                                          │
//!                          ┌───────────────┼───────────────┐
//!                    OllamaBackend    OpenAiBackend    MockBackend
//!                   /api/generate  /v1/chat/completions  routed replies
//!                   /api/chat
//! ```

pub mod backoff;
pub mod mock;
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;

pub use backoff::BackoffConfig;
pub use mock::{MockBackend, MockReply};
pub use ollama::OllamaBackend;
#[cfg(feature = "openai")]
pub use openai::OpenAiBackend;

use crate::config::LlmConfig;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// A normalized LLM request, provider-agnostic.
///
/// [`StructuredTask`](crate::task::StructuredTask) builds this from its
/// template and config. The [`Backend`] translates it into the
/// provider-specific HTTP request.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Name of the task issuing the call, e.g. `"quiz"`. Backends may use it
    /// for logging; [`MockBackend`] routes on it.
    pub task: String,

    /// Model identifier (e.g. `"llama3.2:3b"`, `"gpt-4o"`).
    pub model: String,

    /// If `Some`, this is a chat-style call with a system prompt.
    /// If `None`, this is a generate-style call (prompt only).
    pub system_prompt: Option<String>,

    /// The fully rendered user prompt.
    pub prompt: String,

    /// LLM configuration (temperature, max_tokens, json_mode, etc.).
    pub config: LlmConfig,
}

/// A normalized LLM response.
#[derive(Debug)]
pub struct LlmResponse {
    /// The generated text content.
    pub text: String,

    /// HTTP status code (for diagnostics/logging).
    pub status: u16,

    /// Provider-specific metadata (token counts, timing, model info).
    /// Stored as raw JSON; each provider returns different fields.
    pub metadata: Option<serde_json::Value>,
}

/// Abstraction over LLM providers.
///
/// Implementors translate between the normalized [`LlmRequest`]/[`LlmResponse`]
/// and the provider's HTTP API. Errors are reported as
/// [`PipelineError::Request`](crate::PipelineError::Request),
/// [`PipelineError::Json`](crate::PipelineError::Json) or
/// [`PipelineError::HttpError`](crate::PipelineError::HttpError); the calling
/// task maps them to `ServiceUnavailable`.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute one completion call. No retries happen here.
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Parse a `Retry-After` header value given in whole seconds.
pub(crate) fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Turn a non-success response into [`PipelineError::HttpError`](crate::PipelineError::HttpError).
pub(crate) async fn http_error(resp: reqwest::Response) -> crate::PipelineError {
    let status = resp.status().as_u16();
    let retry_after = resp
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);
    let body = resp.text().await.unwrap_or_default();
    crate::PipelineError::HttpError {
        status,
        body,
        retry_after,
    }
}
