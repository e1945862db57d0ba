//! Task definitions for every generation stage.

use crate::config::{LlmConfig, QuizBlueprint};
use crate::schema::{
    CoreTopicsOutput, FlowchartOutput, InformationOutput, QuizOutput, SyllabusQuestions,
};
use crate::task::StructuredTask;
use crate::templates;
use serde::Serialize;

pub const INFORMATION: &str = "information";
pub const FLOWCHART: &str = "flowchart";
pub const QUIZ: &str = "quiz";
pub const SYLLABUS_FLOWCHART: &str = "syllabus_flowchart";
pub const CORE_TOPICS: &str = "core_topics";
pub const CORE_TOPICS_FLOWCHART: &str = "core_topics_flowchart";
pub const SYLLABUS_QUESTIONS: &str = "syllabus_questions";

const SYSTEM: &str = "You write accurate Computer Science study material and always answer in JSON.";

#[derive(Debug, Clone, Serialize)]
pub struct TopicInput {
    pub topic: String,
}

/// Input shared by the flowchart and quiz stages.
#[derive(Debug, Clone, Serialize)]
pub struct MaterialInput {
    pub topic: String,
    pub information: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizInput {
    pub topic: String,
    pub information: String,
    pub total: usize,
    pub non_coding: usize,
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
    pub coding: usize,
}

impl QuizInput {
    pub fn new(topic: impl Into<String>, information: impl Into<String>, blueprint: &QuizBlueprint) -> Self {
        Self {
            topic: topic.into(),
            information: information.into(),
            total: blueprint.total(),
            non_coding: blueprint.non_coding(),
            easy: blueprint.easy,
            medium: blueprint.medium,
            hard: blueprint.hard,
            coding: blueprint.coding,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CoreTopicsInput {
    pub syllabus_text: String,
    pub past_exam_questions_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyllabusQuestionsInput {
    pub syllabus_text: String,
    pub syllabus_flowchart: String,
    pub core_topics_flowchart: String,
    pub past_exam_questions_text: String,
    pub target_count: usize,
}

pub fn information_task() -> StructuredTask<TopicInput, InformationOutput> {
    StructuredTask::new(INFORMATION, templates::INFORMATION).with_system(SYSTEM)
}

/// Flowchart task; `name` tells apart the flowcharts of the syllabus flow.
pub fn flowchart_task(name: &str) -> StructuredTask<MaterialInput, FlowchartOutput> {
    StructuredTask::new(name, templates::FLOWCHART)
        .with_system(SYSTEM)
        .with_config(LlmConfig::default().with_temperature(0.3))
}

/// Quiz task. The blueprint counts travel in [`QuizInput`], so the task
/// itself is the same for every shape.
pub fn quiz_task() -> StructuredTask<QuizInput, QuizOutput> {
    StructuredTask::new(QUIZ, templates::QUIZ)
        .with_system(SYSTEM)
        .with_config(LlmConfig::default().with_max_tokens(8192))
}

pub fn core_topics_task() -> StructuredTask<CoreTopicsInput, CoreTopicsOutput> {
    StructuredTask::new(CORE_TOPICS, templates::CORE_TOPICS)
        .with_system(SYSTEM)
        .with_config(LlmConfig::default().with_temperature(0.3))
}

/// The answer is a bare array, which provider JSON modes reject, so JSON
/// mode is off and the parser does the extraction.
pub fn syllabus_questions_task() -> StructuredTask<SyllabusQuestionsInput, SyllabusQuestions> {
    StructuredTask::new(SYLLABUS_QUESTIONS, templates::SYLLABUS_QUESTIONS)
        .with_system(SYSTEM)
        .with_config(LlmConfig::default().with_json_mode(false).with_max_tokens(8192))
}
