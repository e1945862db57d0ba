//! Structured prompt task: one model call decoded into a typed schema.
//!
//! [`StructuredTask`] renders its template from a typed input, makes exactly
//! one backend call and decodes the answer into an [`OutputSchema`]. It never
//! retries; the caller decides that (see [`retry`](crate::retry)).

use crate::backend::LlmRequest;
use crate::config::LlmConfig;
use crate::diagnostics::ParseDiagnostics;
use crate::error::{PipelineError, Result};
use crate::exec_ctx::ExecCtx;
use crate::output_parser::{extract_json, ParseError};
use crate::prompt::{render, section};
use crate::schema::OutputSchema;
use crate::types::Generated;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;

/// What a [`StructuredTask`] produced.
#[derive(Debug, Clone)]
pub struct TaskOutput<O> {
    /// Decoded answer, or `Empty` when the model declined.
    pub value: Generated<O>,
    /// Text exactly as the backend returned it.
    pub raw_response: String,
    /// Model that answered.
    pub model: String,
    pub diagnostics: ParseDiagnostics,
}

/// A prompt template bound to an input type `I` and an output schema `O`.
///
/// # Example
///
/// ```
/// use quizgen::schema::FlowchartOutput;
/// use quizgen::task::StructuredTask;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Input<'a> {
///     topic: &'a str,
/// }
///
/// let task: StructuredTask<Input, FlowchartOutput> =
///     StructuredTask::new("flowchart", "Draw {topic} as a flowchart.")
///         .with_model("llama3.2:3b");
/// assert_eq!(task.name(), "flowchart");
/// ```
pub struct StructuredTask<I, O> {
    name: String,
    template: String,
    system: Option<String>,
    model: Option<String>,
    config: LlmConfig,
    _marker: PhantomData<fn(&I) -> O>,
}

impl<I, O> std::fmt::Debug for StructuredTask<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredTask")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("has_system", &self.system.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl<I, O> StructuredTask<I, O>
where
    I: Serialize,
    O: OutputSchema,
{
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            system: None,
            model: None,
            config: LlmConfig::default(),
            _marker: PhantomData,
        }
    }

    /// Set a system prompt (enables `/api/chat` mode on Ollama).
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Override the context's default model for this task.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_config(mut self, config: LlmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Render the full prompt: template filled from context vars and the
    /// input's fields (input wins), followed by the response format.
    pub fn render_prompt(&self, ctx: &ExecCtx, input: &I) -> Result<String> {
        let mut vars = ctx.vars.clone();
        vars.extend(input_vars(&self.name, input)?);
        let body = render(&self.template, &vars);
        Ok(format!("{}\n\n{}", body, section("Response format", O::SHAPE)))
    }

    /// Make one call and decode the answer.
    pub async fn run(&self, ctx: &ExecCtx, input: &I) -> Result<TaskOutput<O>> {
        let prompt = self.render_prompt(ctx, input)?;
        let system = self
            .system
            .as_ref()
            .map(|s| render(s, &ctx.vars));
        let model = self.model.clone().unwrap_or_else(|| ctx.model.clone());

        let request = LlmRequest {
            task: self.name.clone(),
            model: model.clone(),
            system_prompt: system,
            prompt,
            config: self.config.clone(),
        };
        tracing::debug!(
            task = %self.name,
            model = %model,
            backend = ctx.backend.name(),
            prompt_len = request.prompt.len(),
            "sending structured prompt"
        );

        let response = ctx
            .backend
            .complete(&ctx.client, &ctx.base_url, &request)
            .await
            .map_err(|e| PipelineError::unavailable(&self.name, e))?;
        tracing::debug!(task = %self.name, raw_len = response.text.len(), "model answered");

        let (value, diagnostics) = self.decode(&response.text)?;
        Ok(TaskOutput {
            value,
            raw_response: response.text,
            model,
            diagnostics,
        })
    }

    /// Decode a raw model answer against `O`.
    pub fn decode(&self, raw: &str) -> Result<(Generated<O>, ParseDiagnostics)> {
        let blank = ParseDiagnostics {
            raw_len: raw.len(),
            ..ParseDiagnostics::default()
        };
        if raw.trim().is_empty() {
            return Ok((Generated::Empty, blank));
        }

        let extracted = match extract_json(raw) {
            Ok(extracted) => extracted,
            Err(ParseError::EmptyResponse) => return Ok((Generated::Empty, blank)),
            Err(e) => return Err(PipelineError::schema(&self.name, e.to_string())),
        };
        let diagnostics = ParseDiagnostics::from_extracted(&extracted, raw.len());
        if !diagnostics.clean() {
            tracing::debug!(
                task = %self.name,
                strategy = ?diagnostics.strategy,
                repaired = diagnostics.repaired,
                auto_completed = diagnostics.auto_completed,
                "model JSON needed fixing"
            );
        }
        if extracted.value.is_null() {
            return Ok((Generated::Empty, diagnostics));
        }

        let output: O = serde_json::from_value(extracted.value)
            .map_err(|e| PipelineError::schema(&self.name, e.to_string()))?;
        output
            .validate()
            .map_err(|reason| PipelineError::schema(&self.name, reason))?;

        if output.is_empty() {
            Ok((Generated::Empty, diagnostics))
        } else {
            Ok((Generated::Content(output), diagnostics))
        }
    }
}

/// Flatten a task input into template variables.
fn input_vars<I: Serialize>(task: &str, input: &I) -> Result<HashMap<String, String>> {
    match serde_json::to_value(input)? {
        Value::Object(fields) => Ok(fields
            .into_iter()
            .map(|(k, v)| {
                let text = match v {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (k, text)
            })
            .collect()),
        other => Err(PipelineError::InvalidInput(format!(
            "task '{}': input must serialize to a JSON object, got {}",
            task, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, LlmResponse, MockBackend, MockReply};
    use crate::schema::{FlowchartOutput, QuizOutput};
    use async_trait::async_trait;
    use reqwest::Client;
    use std::sync::{Arc, Mutex};

    #[derive(Serialize)]
    struct FlowInput {
        topic: String,
        depth: u32,
    }

    fn flow_task() -> StructuredTask<FlowInput, FlowchartOutput> {
        StructuredTask::new("flowchart", "Topic: {topic}. Depth: {depth}. Audience: {audience}. Keep {unknown}.")
    }

    fn input() -> FlowInput {
        FlowInput {
            topic: "Heaps".into(),
            depth: 2,
        }
    }

    fn ctx_with(backend: Arc<dyn Backend>) -> ExecCtx {
        ExecCtx::builder("http://unused")
            .backend(backend)
            .var("audience", "students")
            .var("topic", "overridden by input")
            .build()
            .unwrap()
    }

    struct Recorder {
        reply: String,
        last: Mutex<Option<LlmRequest>>,
    }

    #[async_trait]
    impl Backend for Recorder {
        async fn complete(&self, _: &Client, _: &str, request: &LlmRequest) -> Result<LlmResponse> {
            *self.last.lock().unwrap() = Some(request.clone());
            Ok(LlmResponse {
                text: self.reply.clone(),
                status: 200,
                metadata: None,
            })
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn test_prompt_rendering_and_request() {
        let recorder = Arc::new(Recorder {
            reply: r#"{"flowchart": "Insert -> Sift up"}"#.into(),
            last: Mutex::new(None),
        });
        let ctx = ctx_with(recorder.clone());
        let out = flow_task().with_model("tiny").run(&ctx, &input()).await.unwrap();

        assert_eq!(out.value.content().unwrap().flowchart, "Insert -> Sift up");
        assert_eq!(out.model, "tiny");
        assert!(out.diagnostics.clean());

        let request = recorder.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.task, "flowchart");
        assert!(request.prompt.starts_with("Topic: Heaps. Depth: 2. Audience: students. Keep {unknown}."));
        assert!(request.prompt.contains("## Response format\n{\"flowchart\""));
        assert!(request.system_prompt.is_none());
    }

    #[test]
    fn test_decode_blank_and_null_are_empty() {
        let task = flow_task();
        assert!(task.decode("   \n").unwrap().0.is_empty());
        assert!(task.decode("<think>hmm</think>").unwrap().0.is_empty());
        assert!(task.decode("null").unwrap().0.is_empty());
        assert!(task.decode(r#"{"flowchart": "  "}"#).unwrap().0.is_empty());
    }

    #[test]
    fn test_decode_repairs_fenced_json() {
        let raw = "Sure!\n```json\n{\"flowchart\": \"A -> B\", // steps\n}\n```";
        let (value, diag) = flow_task().decode(raw).unwrap();
        assert_eq!(value.content().unwrap().flowchart, "A -> B");
        assert_eq!(diag.strategy, Some("code_block"));
        assert!(diag.repaired);
    }

    #[test]
    fn test_decode_schema_violations() {
        let task = flow_task();
        let extra = task.decode(r#"{"flowchart": "A", "notes": "x"}"#).unwrap_err();
        assert_eq!(extra.kind(), "schema_violation");

        let prose = task.decode("I cannot draw that.").unwrap_err();
        assert_eq!(prose.kind(), "schema_violation");

        let quiz: StructuredTask<FlowInput, QuizOutput> = StructuredTask::new("quiz", "");
        let raw = r#"{"quiz": [{"question": "Q", "options": {"A": "1", "B": "2", "C": "", "D": "4"},
            "correct_answer": "A", "explanation": "e", "difficulty": "easy"}]}"#;
        let err = quiz.decode(raw).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaViolation { ref reason, .. } if reason.contains("option C")));
    }

    #[tokio::test]
    async fn test_backend_failures_become_unavailable() {
        let mock = Arc::new(MockBackend::new().route("flowchart", MockReply::Status(503)));
        let ctx = ctx_with(mock.clone());
        let err = flow_task().run(&ctx, &input()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ServiceUnavailable { ref task, status: Some(503), .. } if task == "flowchart"
        ));
        assert_eq!(mock.calls("flowchart"), 1);

        let ctx = ctx_with(Arc::new(MockBackend::new()));
        let err = flow_task().run(&ctx, &input()).await.unwrap_err();
        assert!(matches!(err, PipelineError::ServiceUnavailable { status: None, .. }));
    }

    #[test]
    fn test_non_object_input_rejected() {
        let task: StructuredTask<&str, FlowchartOutput> = StructuredTask::new("flowchart", "{topic}");
        let ctx = ExecCtx::builder("http://unused").build().unwrap();
        assert!(matches!(
            task.render_prompt(&ctx, &"Heaps"),
            Err(PipelineError::InvalidInput(_))
        ));
    }
}
