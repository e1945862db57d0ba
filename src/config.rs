//! Configuration: per-call LLM settings, quiz shape, and process-level
//! pipeline settings read from the environment.

use crate::backend::{BackoffConfig, OllamaBackend};
use crate::error::{PipelineError, Result};
use crate::exec_ctx::ExecCtx;
use crate::pipeline::QuizPipeline;
use crate::retry::StageOptions;
use crate::syllabus::SyllabusPipeline;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Per-call LLM settings, forwarded to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f64,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Request JSON format output from the model.
    pub json_mode: bool,

    /// Custom options merged into the Ollama options object.
    pub options: Option<Value>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
            json_mode: true,
            options: None,
        }
    }
}

impl LlmConfig {
    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }
}

/// Target composition of a generated quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizBlueprint {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
    /// Coding questions, on top of the difficulty bands.
    pub coding: usize,
}

impl Default for QuizBlueprint {
    fn default() -> Self {
        Self {
            easy: 3,
            medium: 4,
            hard: 3,
            coding: 5,
        }
    }
}

impl QuizBlueprint {
    pub fn non_coding(&self) -> usize {
        self.easy + self.medium + self.hard
    }

    pub fn total(&self) -> usize {
        self.non_coding() + self.coding
    }
}

/// Which completion service to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Ollama,
    OpenAi,
}

impl BackendKind {
    /// Base URL used when none is configured.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            BackendKind::Ollama => "http://localhost:11434",
            BackendKind::OpenAi => "https://api.openai.com",
        }
    }
}

impl FromStr for BackendKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(BackendKind::Ollama),
            "openai" => Ok(BackendKind::OpenAi),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown backend '{}', expected ollama or openai",
                other
            ))),
        }
    }
}

/// Process-level settings for building pipelines.
///
/// # Example
///
/// ```
/// use quizgen::config::PipelineConfig;
///
/// let config = PipelineConfig::default();
/// assert_eq!(config.base_url, "http://localhost:11434");
/// assert_eq!(config.syllabus_questions, 50);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub backend: BackendKind,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// HTTP timeout applied by the client to every call.
    pub request_timeout: Duration,
    /// Optional timeout for each stage attempt.
    pub stage_timeout: Option<Duration>,
    pub retry: BackoffConfig,
    pub blueprint: QuizBlueprint,
    /// Exact number of questions the syllabus flow must produce.
    pub syllabus_questions: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Ollama,
            base_url: BackendKind::Ollama.default_base_url().to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(120),
            stage_timeout: None,
            retry: BackoffConfig::none(),
            blueprint: QuizBlueprint::default(),
            syllabus_questions: 50,
        }
    }
}

impl PipelineConfig {
    /// Read `QUIZGEN_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset keys keep their defaults;
    /// a set key that does not parse is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let backend = parse_var(&lookup, "QUIZGEN_BACKEND")?.unwrap_or(default.backend);
        let base_url = lookup("QUIZGEN_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| backend.default_base_url().to_string());

        Ok(Self {
            backend,
            base_url,
            model: lookup("QUIZGEN_MODEL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default.model),
            api_key: lookup("QUIZGEN_API_KEY").filter(|v| !v.is_empty()),
            request_timeout: parse_var::<u64, _>(&lookup, "QUIZGEN_REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(default.request_timeout),
            stage_timeout: parse_var::<u64, _>(&lookup, "QUIZGEN_STAGE_TIMEOUT_SECS")?
                .map(Duration::from_secs),
            retry: parse_var(&lookup, "QUIZGEN_RETRY")?.unwrap_or(default.retry),
            blueprint: default.blueprint,
            syllabus_questions: parse_var(&lookup, "QUIZGEN_SYLLABUS_QUESTIONS")?
                .unwrap_or(default.syllabus_questions),
        })
    }

    /// Stage runner options derived from this config.
    pub fn stage_options(&self) -> StageOptions {
        StageOptions {
            backoff: self.retry.clone(),
            stage_timeout: self.stage_timeout,
        }
    }

    /// Build the shared execution context for the configured backend.
    pub fn build_ctx(&self) -> Result<ExecCtx> {
        let builder = ExecCtx::builder(&self.base_url)
            .model(&self.model)
            .timeout(self.request_timeout);
        let builder = match self.backend {
            BackendKind::Ollama => builder.backend(Arc::new(OllamaBackend)),
            #[cfg(feature = "openai")]
            BackendKind::OpenAi => match self.api_key {
                Some(ref key) => builder.openai_with_key(key),
                None => builder.openai(),
            },
            #[cfg(not(feature = "openai"))]
            BackendKind::OpenAi => {
                return Err(PipelineError::InvalidConfig(
                    "openai backend requested but the `openai` feature is disabled".into(),
                ))
            }
        };
        builder.build()
    }

    pub fn quiz_pipeline(&self) -> Result<QuizPipeline> {
        Ok(QuizPipeline::new(Arc::new(self.build_ctx()?))
            .with_options(self.stage_options())
            .with_blueprint(self.blueprint))
    }

    pub fn syllabus_pipeline(&self) -> Result<SyllabusPipeline> {
        Ok(SyllabusPipeline::new(Arc::new(self.build_ctx()?))
            .with_options(self.stage_options())
            .with_target_count(self.syllabus_questions))
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| PipelineError::InvalidConfig(format!("{}={}: {}", key, raw, e))),
    }
}
