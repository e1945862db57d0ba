//! Topic pipeline: information, then flowchart and quiz side by side.
//!
//! ```text
//! topic ──► information ──┬──► flowchart ──┐
//!                         │                ├──► normalize quiz ──► GenerationResult
//!                         └──► quiz ───────┘
//! ```
//!
//! Empty information ends the run early. The two branches run as separate
//! tokio tasks and settle independently: a failed flowchart becomes `""`, a
//! failed quiz becomes `[]`, and neither affects the other.

use crate::config::QuizBlueprint;
use crate::error::Result;
use crate::events::{emit, Event};
use crate::exec_ctx::ExecCtx;
use crate::normalize::normalize;
use crate::retry::{run_stage, StageOptions};
use crate::schema::QuizItem;
use crate::stages::{self, MaterialInput, QuizInput, TopicInput};
use crate::types::{Generated, GenerationResult, PipelineRun, RunReport, StageStatus, Topic};
use std::sync::Arc;
use tokio::task::JoinError;

/// Orchestrates one topic request.
///
/// Cheap to clone; all clones share the same [`ExecCtx`].
///
/// # Example
///
/// ```no_run
/// use quizgen::{ExecCtx, QuizPipeline};
/// use std::sync::Arc;
///
/// # async fn demo() -> quizgen::Result<()> {
/// let ctx = ExecCtx::builder("http://localhost:11434").build()?;
/// let pipeline = QuizPipeline::new(Arc::new(ctx));
/// let result = pipeline.generate_quiz_questions("Binary Search Trees").await;
/// println!("{} questions", result.quiz.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct QuizPipeline {
    ctx: Arc<ExecCtx>,
    options: StageOptions,
    blueprint: QuizBlueprint,
}

impl QuizPipeline {
    pub fn new(ctx: Arc<ExecCtx>) -> Self {
        Self {
            ctx,
            options: StageOptions::default(),
            blueprint: QuizBlueprint::default(),
        }
    }

    pub fn with_options(mut self, options: StageOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_blueprint(mut self, blueprint: QuizBlueprint) -> Self {
        self.blueprint = blueprint;
        self
    }

    pub fn ctx(&self) -> &ExecCtx {
        &self.ctx
    }

    pub fn blueprint(&self) -> QuizBlueprint {
        self.blueprint
    }

    /// Generate study material for `topic`. Never fails; problems show up as
    /// empty fields. Use [`run`](Self::run) to also get per-stage statuses.
    pub async fn generate_quiz_questions(&self, topic: &str) -> GenerationResult {
        self.run(topic).await.result
    }

    /// Background information for `topic`, or `""` when the topic is empty,
    /// the model declined, or the stage failed.
    pub async fn generate_information(&self, topic: &str) -> String {
        match Topic::new(topic) {
            Ok(topic) => self.information_stage(&topic).await.0,
            Err(e) => {
                tracing::warn!(error = %e, "no information for an empty topic");
                String::new()
            }
        }
    }

    /// One flowchart attempt sequence. `Empty` when the material has no
    /// sequential structure.
    pub async fn generate_flowchart(&self, topic: &str, information: &str) -> Result<Generated<String>> {
        let task = stages::flowchart_task(stages::FLOWCHART);
        let input = MaterialInput {
            topic: topic.to_string(),
            information: information.to_string(),
        };
        let (ctx, task, input) = (&*self.ctx, &task, &input);
        let out = run_stage(stages::FLOWCHART, ctx, &self.options, move || task.run(ctx, input)).await?;
        Ok(out.value.map(|f| f.flowchart))
    }

    /// One quiz attempt sequence. The list is returned as the model gave it;
    /// ordering happens in [`run`](Self::run).
    pub async fn generate_quiz(&self, topic: &str, information: &str) -> Result<Generated<Vec<QuizItem>>> {
        let task = stages::quiz_task();
        let input = QuizInput::new(topic, information, &self.blueprint);
        let (ctx, task, input) = (&*self.ctx, &task, &input);
        let out = run_stage(stages::QUIZ, ctx, &self.options, move || task.run(ctx, input)).await?;
        let quiz = out.value.map(|q| q.quiz);

        if let Generated::Content(ref items) = quiz {
            let expected = self.blueprint.total();
            if items.len() != expected {
                tracing::warn!(
                    topic,
                    items = items.len(),
                    expected,
                    "quiz size differs from blueprint"
                );
            }
        }
        Ok(quiz)
    }

    /// Run the whole flow and report how each stage settled.
    pub async fn run(&self, topic: &str) -> PipelineRun {
        let topic = match Topic::new(topic) {
            Ok(topic) => topic,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting request");
                return PipelineRun {
                    result: GenerationResult::empty(),
                    report: RunReport::skipped_after(StageStatus::Skipped),
                };
            }
        };

        let (information, info_status) = self.information_stage(&topic).await;
        if information.trim().is_empty() {
            tracing::warn!(topic = %topic, "no usable information, skipping flowchart and quiz");
            return PipelineRun {
                result: GenerationResult::empty(),
                report: RunReport::skipped_after(info_status),
            };
        }

        emit(
            &self.ctx.event_handler,
            Event::FanOut {
                stages: vec![stages::FLOWCHART.to_string(), stages::QUIZ.to_string()],
            },
        );
        let shared_topic: Arc<str> = Arc::from(topic.as_str());
        let shared_info: Arc<str> = Arc::from(information.as_str());

        let flowchart = {
            let this = self.clone();
            let (topic, info) = (Arc::clone(&shared_topic), Arc::clone(&shared_info));
            tokio::spawn(async move {
                started(&this.ctx, stages::FLOWCHART);
                let settled = this.generate_flowchart(&topic, &info).await;
                settle(&this.ctx, stages::FLOWCHART, settled)
            })
        };
        let quiz = {
            let this = self.clone();
            let (topic, info) = (Arc::clone(&shared_topic), Arc::clone(&shared_info));
            tokio::spawn(async move {
                started(&this.ctx, stages::QUIZ);
                let settled = this.generate_quiz(&topic, &info).await;
                settle(&this.ctx, stages::QUIZ, settled)
            })
        };

        let (flowchart, quiz) = tokio::join!(flowchart, quiz);
        let (flowchart, flowchart_status) = joined(&self.ctx, stages::FLOWCHART, flowchart);
        let (quiz, quiz_status) = joined(&self.ctx, stages::QUIZ, quiz);

        let quiz = if quiz.is_empty() { quiz } else { normalize(quiz) };
        tracing::info!(
            topic = %topic,
            flowchart = flowchart_status.label(),
            quiz = quiz_status.label(),
            items = quiz.len(),
            "generation finished"
        );

        PipelineRun {
            result: GenerationResult {
                information,
                flowchart,
                quiz,
            },
            report: RunReport {
                information: info_status,
                flowchart: flowchart_status,
                quiz: quiz_status,
            },
        }
    }

    async fn information_stage(&self, topic: &Topic) -> (String, StageStatus) {
        started(&self.ctx, stages::INFORMATION);
        let task = stages::information_task();
        let input = TopicInput {
            topic: topic.to_string(),
        };
        let (ctx, task, input) = (&*self.ctx, &task, &input);
        let result = run_stage(stages::INFORMATION, ctx, &self.options, move || task.run(ctx, input))
            .await
            .map(|out| out.value.map(|i| i.information));
        settle(&self.ctx, stages::INFORMATION, result)
    }
}

/// Log and announce the start of a stage.
pub(crate) fn started(ctx: &ExecCtx, stage: &str) {
    tracing::info!(stage, "stage started");
    emit(
        &ctx.event_handler,
        Event::StageStart {
            stage: stage.to_string(),
        },
    );
}

/// Degrade a stage result to its empty value, logging and announcing how it
/// settled.
pub(crate) fn settle<T: Default>(
    ctx: &ExecCtx,
    stage: &str,
    result: Result<Generated<T>>,
) -> (T, StageStatus) {
    let (value, status) = match result {
        Ok(generated) => {
            let status = StageStatus::from_generated(&generated);
            if generated.is_empty() {
                tracing::warn!(stage, "model returned nothing");
            }
            (generated.unwrap_or_default(), status)
        }
        Err(e) => {
            tracing::error!(stage, kind = e.kind(), error = %e, "stage failed");
            (T::default(), StageStatus::Failed(e.to_string()))
        }
    };
    finished(ctx, stage, &status);
    (value, status)
}

/// Settle one spawned branch. A panicked or cancelled task fails only its
/// own stage.
fn joined<T: Default>(
    ctx: &ExecCtx,
    stage: &str,
    handle: std::result::Result<(T, StageStatus), JoinError>,
) -> (T, StageStatus) {
    match handle {
        Ok(settled) => settled,
        Err(e) => {
            tracing::error!(stage, error = %e, "fan-out join failed");
            let status = StageStatus::Failed(format!("fan-out join failed: {}", e));
            finished(ctx, stage, &status);
            (T::default(), status)
        }
    }
}

pub(crate) fn finished(ctx: &ExecCtx, stage: &str, status: &StageStatus) {
    tracing::info!(stage, status = status.label(), "stage finished");
    emit(
        &ctx.event_handler,
        Event::StageEnd {
            stage: stage.to_string(),
            status: status.clone(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, BackoffConfig, LlmRequest, LlmResponse, MockBackend, MockReply};
    use crate::events::FnEventHandler;
    use crate::schema::Difficulty;
    use async_trait::async_trait;
    use reqwest::Client;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Barrier;

    const INFO: &str = r#"{"information": "A binary search tree keeps smaller keys on the left."}"#;

    fn quiz_reply(specs: &[(&str, bool)]) -> String {
        let items: Vec<_> = specs
            .iter()
            .enumerate()
            .map(|(i, (difficulty, coding))| {
                json!({
                    "question": format!("q{}", i),
                    "options": {"A": "a", "B": "b", "C": "c", "D": "d"},
                    "correct_answer": "b",
                    "explanation": "because",
                    "difficulty": difficulty,
                    "isCodingQuestion": coding,
                })
            })
            .collect();
        json!({ "quiz": items }).to_string()
    }

    fn pipeline(backend: Arc<dyn Backend>) -> QuizPipeline {
        let ctx = ExecCtx::builder("http://unused").backend(backend).build().unwrap();
        QuizPipeline::new(Arc::new(ctx))
    }

    fn full_mock() -> MockBackend {
        MockBackend::new()
            .route(stages::INFORMATION, MockReply::text(INFO))
            .route(stages::FLOWCHART, MockReply::text(r#"{"flowchart": "Insert -> Compare -> Recurse"}"#))
            .route(stages::QUIZ, MockReply::text(quiz_reply(&[("hard", false), ("easy", false), ("medium", true)])))
    }

    #[tokio::test]
    async fn test_full_run_normalizes_quiz() {
        let mock = Arc::new(full_mock());
        let run = pipeline(mock.clone()).run("Binary Search Trees").await;

        assert!(run.result.information.starts_with("A binary search tree"));
        assert_eq!(run.result.flowchart, "Insert -> Compare -> Recurse");
        let order: Vec<_> = run.result.quiz.iter().map(|q| q.question_text.as_str()).collect();
        assert_eq!(order, vec!["q1", "q0", "q2"]);
        assert_eq!(run.result.quiz[1].difficulty, Difficulty::Hard);
        assert_eq!(run.report.quiz, StageStatus::Content);
        assert_eq!(mock.total_calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_information_short_circuits() {
        for reply in [r#"{"information": ""}"#, r#"{"information": "  \n "}"#, ""] {
            let mock = Arc::new(
                full_mock().route(stages::INFORMATION, MockReply::text(reply)),
            );
            let run = pipeline(mock.clone()).run("Quantum Basket Weaving").await;

            assert_eq!(run.result, GenerationResult::empty());
            assert_eq!(run.report.information, StageStatus::Empty);
            assert_eq!(run.report.flowchart, StageStatus::Skipped);
            assert_eq!(mock.calls(stages::FLOWCHART), 0);
            assert_eq!(mock.calls(stages::QUIZ), 0);
        }
    }

    #[tokio::test]
    async fn test_information_failure_short_circuits() {
        let mock = Arc::new(full_mock().route(stages::INFORMATION, MockReply::Status(500)));
        let run = pipeline(mock.clone()).run("Graphs").await;
        assert_eq!(run.result, GenerationResult::empty());
        assert!(run.report.information.is_failed());
        assert_eq!(mock.calls(stages::QUIZ), 0);
    }

    #[tokio::test]
    async fn test_empty_topic_makes_no_calls() {
        let mock = Arc::new(full_mock());
        let p = pipeline(mock.clone());
        assert_eq!(p.generate_quiz_questions("   ").await, GenerationResult::empty());
        assert_eq!(p.generate_information("").await, "");
        assert_eq!(mock.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_quiz_unavailable_keeps_flowchart() {
        let mock = Arc::new(
            full_mock()
                .route(stages::FLOWCHART, MockReply::text(r#"{"flowchart": "A->B->C"}"#))
                .route(stages::QUIZ, MockReply::Status(503)),
        );
        let run = pipeline(mock).run("Sorting").await;

        assert!(!run.result.information.is_empty());
        assert_eq!(run.result.flowchart, "A->B->C");
        assert!(run.result.quiz.is_empty());
        assert!(matches!(run.report.quiz, StageStatus::Failed(ref r) if r.contains("503")));
        assert_eq!(run.report.flowchart, StageStatus::Content);
    }

    #[tokio::test]
    async fn test_flowchart_schema_violation_keeps_quiz() {
        let mock = Arc::new(
            full_mock().route(stages::FLOWCHART, MockReply::text(r#"{"flowchart": "A", "extra": 1}"#)),
        );
        let run = pipeline(mock).run("Sorting").await;
        assert_eq!(run.result.flowchart, "");
        assert_eq!(run.result.quiz.len(), 3);
        assert!(matches!(run.report.flowchart, StageStatus::Failed(ref r) if r.contains("schema violation")));
    }

    #[tokio::test]
    async fn test_empty_flowchart_is_not_failure() {
        let mock = Arc::new(full_mock().route(stages::FLOWCHART, MockReply::text(r#"{"flowchart": ""}"#)));
        let run = pipeline(mock).run("Trivia").await;
        assert_eq!(run.result.flowchart, "");
        assert_eq!(run.report.flowchart, StageStatus::Empty);
    }

    /// Holds flowchart and quiz at a two-party barrier, so the run only
    /// finishes if both calls are in flight at the same time.
    struct BarrierBackend {
        barrier: Barrier,
    }

    #[async_trait]
    impl Backend for BarrierBackend {
        async fn complete(&self, _: &Client, _: &str, request: &LlmRequest) -> Result<LlmResponse> {
            let text = match request.task.as_str() {
                stages::INFORMATION => INFO.to_string(),
                stages::FLOWCHART => {
                    self.barrier.wait().await;
                    r#"{"flowchart": "A -> B"}"#.to_string()
                }
                _ => {
                    self.barrier.wait().await;
                    quiz_reply(&[("easy", false)])
                }
            };
            Ok(LlmResponse {
                text,
                status: 200,
                metadata: None,
            })
        }

        fn name(&self) -> &'static str {
            "barrier"
        }
    }

    #[tokio::test]
    async fn test_flowchart_and_quiz_run_concurrently() {
        let backend = Arc::new(BarrierBackend {
            barrier: Barrier::new(2),
        });
        let run = tokio::time::timeout(Duration::from_secs(10), pipeline(backend).run("Heaps"))
            .await
            .expect("branches ran sequentially");
        assert_eq!(run.result.flowchart, "A -> B");
        assert_eq!(run.result.quiz.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_timeout_only_hits_its_branch() {
        let mock = Arc::new(full_mock().latency(stages::QUIZ, Duration::from_secs(600)));
        let p = pipeline(mock)
            .with_options(StageOptions::default().with_stage_timeout(Duration::from_secs(30)));
        let run = p.run("Tries").await;

        assert_eq!(run.result.flowchart, "Insert -> Compare -> Recurse");
        assert!(run.result.quiz.is_empty());
        assert!(matches!(run.report.quiz, StageStatus::Failed(ref r) if r.contains("timed out")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_quiz() {
        let mock = Arc::new(full_mock().sequence(
            stages::QUIZ,
            vec![
                MockReply::Status(503),
                MockReply::text(quiz_reply(&[("medium", false)])),
            ],
        ));
        let p = pipeline(mock.clone())
            .with_options(StageOptions::default().with_backoff(BackoffConfig::standard()));
        let run = p.run("Hashing").await;

        assert_eq!(run.result.quiz.len(), 1);
        assert_eq!(mock.calls(stages::QUIZ), 2);
        assert_eq!(mock.calls(stages::FLOWCHART), 1);
    }

    /// Panics on the quiz call to break the join.
    struct PanicBackend;

    #[async_trait]
    impl Backend for PanicBackend {
        async fn complete(&self, _: &Client, _: &str, request: &LlmRequest) -> Result<LlmResponse> {
            let text = match request.task.as_str() {
                stages::INFORMATION => INFO,
                stages::FLOWCHART => r#"{"flowchart": "A -> B"}"#,
                _ => panic!("backend exploded"),
            };
            Ok(LlmResponse {
                text: text.to_string(),
                status: 200,
                metadata: None,
            })
        }

        fn name(&self) -> &'static str {
            "panic"
        }
    }

    #[tokio::test]
    async fn test_panicking_branch_keeps_sibling() {
        let run = pipeline(Arc::new(PanicBackend)).run("Heaps").await;
        assert!(!run.result.information.is_empty());
        assert_eq!(run.result.flowchart, "A -> B");
        assert_eq!(run.report.flowchart, StageStatus::Content);
        assert!(run.result.quiz.is_empty());
        assert!(matches!(
            &run.report.quiz,
            StageStatus::Failed(r) if r.starts_with("fan-out join failed")
        ));
    }

    #[tokio::test]
    async fn test_events_cover_lifecycle() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let ctx = ExecCtx::builder("http://unused")
            .backend(Arc::new(full_mock()))
            .event_handler(Arc::new(FnEventHandler(move |e: Event| sink.lock().unwrap().push(e))))
            .build()
            .unwrap();
        QuizPipeline::new(Arc::new(ctx)).run("Stacks").await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], Event::StageStart { stage: "information".into() });
        assert!(seen.iter().any(|e| matches!(e, Event::FanOut { stages } if stages.len() == 2)));
        let ends = seen
            .iter()
            .filter(|e| matches!(e, Event::StageEnd { status: StageStatus::Content, .. }))
            .count();
        assert_eq!(ends, 3);
    }
}
