//! # quizgen
//!
//! Study material from a single topic: background information, a textual
//! flowchart and a multiple-choice quiz, generated by an LLM and checked
//! against strict schemas before anything reaches the caller.
//!
//! ```text
//! topic ──► information ──┬──► flowchart ──┐
//!                         └──► quiz ───────┴──► normalized GenerationResult
//! ```
//!
//! A second flow turns a syllabus and past exam papers into exactly fifty
//! exam questions with marks.
//!
//! ## Core Concepts
//!
//! - **[`QuizPipeline`]** runs the topic flow. It never fails: failed or
//!   declined stages degrade to empty fields, and [`RunReport`] says which.
//! - **[`SyllabusPipeline`]** runs the syllabus flow and returns a
//!   [`PipelineError`] when the final stage cannot deliver.
//! - **[`ExecCtx`]** holds the HTTP client, the model backend, the model
//!   name and an optional event handler.
//! - **[`Generated`]** separates "the model had nothing to say" from real
//!   content. Empty output is data, not an error.
//!
//! ## Quick Start
//!
//! ```no_run
//! use quizgen::{ExecCtx, QuizPipeline};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> quizgen::Result<()> {
//!     let ctx = ExecCtx::builder("http://localhost:11434")
//!         .model("llama3.2")
//!         .build()?;
//!
//!     let run = QuizPipeline::new(Arc::new(ctx)).run("Binary Search Trees").await;
//!     println!("{}", run.result.flowchart);
//!     for item in &run.result.quiz {
//!         println!("[{}] {}", item.difficulty, item.question_text);
//!     }
//!     println!("quiz stage: {}", run.report.quiz.label());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! [`PipelineConfig::from_env`] reads `QUIZGEN_*` variables and builds
//! either pipeline with its retry and timeout policy applied.

pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod exec_ctx;
pub mod logging;
pub mod normalize;
pub mod output_parser;
pub mod pipeline;
pub mod prompt;
pub mod retry;
pub mod schema;
pub mod stages;
pub mod syllabus;
pub mod task;
pub mod templates;
pub mod types;

pub use backend::{Backend, BackoffConfig, MockBackend, MockReply, OllamaBackend};
#[cfg(feature = "openai")]
pub use backend::OpenAiBackend;
pub use config::{BackendKind, LlmConfig, PipelineConfig, QuizBlueprint};
pub use diagnostics::ParseDiagnostics;
pub use error::{PipelineError, Result};
pub use events::{Event, EventHandler, FnEventHandler};
pub use exec_ctx::{ExecCtx, ExecCtxBuilder};
pub use logging::{init_logging, LogFormat, LoggingOptions};
pub use pipeline::QuizPipeline;
pub use retry::StageOptions;
pub use schema::{Difficulty, Marks, OptionLabel, QuizItem, QuizOptions, SyllabusQuestion};
pub use syllabus::SyllabusPipeline;
pub use task::{StructuredTask, TaskOutput};
pub use types::{
    Generated, GenerationResult, PipelineRun, RunReport, StageStatus, SyllabusResult, Topic,
};
