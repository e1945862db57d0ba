//! Syllabus flow: exam questions from a syllabus and past papers.
//!
//! ```text
//! syllabus ──► overview flowchart ─────────────────────┐
//!          └─► core topics ──► core topics flowchart ──┼──► questions
//! past questions ──────────────────────────────────────┘
//! ```
//!
//! Intermediate stages degrade to `""`. The final stage's errors reach the
//! caller, and its answer must contain exactly the target number of questions.

use crate::error::{PipelineError, Result};
use crate::exec_ctx::ExecCtx;
use crate::pipeline::{finished, settle, started};
use crate::retry::{run_stage, StageOptions};
use crate::stages::{self, CoreTopicsInput, MaterialInput, SyllabusQuestionsInput};
use crate::types::{StageStatus, SyllabusResult};
use std::sync::Arc;

/// Default number of questions the flow must produce.
pub const DEFAULT_TARGET_COUNT: usize = 50;

const OVERVIEW_TOPIC: &str = "Overall Syllabus Structure";
const CORE_TOPICS_TOPIC: &str = "Core Syllabus Topics";

/// Orchestrates one syllabus request.
#[derive(Debug, Clone)]
pub struct SyllabusPipeline {
    ctx: Arc<ExecCtx>,
    options: StageOptions,
    target_count: usize,
}

impl SyllabusPipeline {
    pub fn new(ctx: Arc<ExecCtx>) -> Self {
        Self {
            ctx,
            options: StageOptions::default(),
            target_count: DEFAULT_TARGET_COUNT,
        }
    }

    pub fn with_options(mut self, options: StageOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_target_count(mut self, count: usize) -> Self {
        self.target_count = count;
        self
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Generate exactly [`target_count`](Self::target_count) exam questions.
    ///
    /// Fails with [`PipelineError::InvalidInput`] on a blank syllabus, and
    /// with `ServiceUnavailable` or `SchemaViolation` when the final stage
    /// does. A list of the wrong length is a `SchemaViolation`.
    pub async fn generate_syllabus_questions(
        &self,
        syllabus_text: &str,
        past_exam_questions_text: &str,
    ) -> Result<SyllabusResult> {
        if syllabus_text.trim().is_empty() {
            return Err(PipelineError::InvalidInput("syllabus text must not be empty".into()));
        }

        let (overview, core_topics) = futures::join!(
            self.flowchart(stages::SYLLABUS_FLOWCHART, OVERVIEW_TOPIC, syllabus_text),
            self.core_topics(syllabus_text, past_exam_questions_text),
        );

        let core_flowchart = if core_topics.trim().is_empty() {
            tracing::warn!(stage = stages::CORE_TOPICS_FLOWCHART, "no core topics, skipping");
            String::new()
        } else {
            self.flowchart(stages::CORE_TOPICS_FLOWCHART, CORE_TOPICS_TOPIC, &core_topics)
                .await
        };

        let input = SyllabusQuestionsInput {
            syllabus_text: syllabus_text.to_string(),
            syllabus_flowchart: overview,
            core_topics_flowchart: core_flowchart,
            past_exam_questions_text: past_exam_questions_text.to_string(),
            target_count: self.target_count,
        };
        self.questions(&input).await
    }

    async fn flowchart(&self, stage: &str, topic: &str, information: &str) -> String {
        started(&self.ctx, stage);
        let task = stages::flowchart_task(stage);
        let input = MaterialInput {
            topic: topic.to_string(),
            information: information.to_string(),
        };
        let (ctx, task, input) = (&*self.ctx, &task, &input);
        let result = run_stage(stage, ctx, &self.options, move || task.run(ctx, input))
            .await
            .map(|out| out.value.map(|f| f.flowchart));
        settle(&self.ctx, stage, result).0
    }

    async fn core_topics(&self, syllabus_text: &str, past_exam_questions_text: &str) -> String {
        started(&self.ctx, stages::CORE_TOPICS);
        let task = stages::core_topics_task();
        let input = CoreTopicsInput {
            syllabus_text: syllabus_text.to_string(),
            past_exam_questions_text: past_exam_questions_text.to_string(),
        };
        let (ctx, task, input) = (&*self.ctx, &task, &input);
        let result = run_stage(stages::CORE_TOPICS, ctx, &self.options, move || task.run(ctx, input))
            .await
            .map(|out| out.value.map(|c| c.core_topics_text));
        settle(&self.ctx, stages::CORE_TOPICS, result).0
    }

    async fn questions(&self, input: &SyllabusQuestionsInput) -> Result<SyllabusResult> {
        let stage = stages::SYLLABUS_QUESTIONS;
        started(&self.ctx, stage);
        let task = stages::syllabus_questions_task();
        let (ctx, task) = (&*self.ctx, &task);
        let result = run_stage(stage, ctx, &self.options, move || task.run(ctx, input))
            .await
            .map(|out| out.value.map(|q| q.0))
            .and_then(|generated| {
                let count = generated.content().map_or(0, Vec::len);
                if count == self.target_count {
                    Ok(generated)
                } else {
                    tracing::warn!(stage, count, expected = self.target_count, "wrong number of questions");
                    Err(PipelineError::schema(
                        stage,
                        format!("expected exactly {} questions, got {}", self.target_count, count),
                    ))
                }
            });

        match result {
            Ok(generated) => {
                finished(&self.ctx, stage, &StageStatus::from_generated(&generated));
                Ok(generated.unwrap_or_default())
            }
            Err(e) => {
                tracing::error!(stage, kind = e.kind(), error = %e, "stage failed");
                finished(&self.ctx, stage, &StageStatus::Failed(e.to_string()));
                Err(e)
            }
        }
    }
}
