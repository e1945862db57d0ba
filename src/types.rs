use crate::error::{PipelineError, Result};
use crate::schema::{QuizItem, SyllabusQuestion};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subject of a generation request. Never empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    /// Trim and validate a topic.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(PipelineError::InvalidInput("topic must not be empty".into()));
        }
        Ok(Topic(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Topic {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self> {
        Topic::new(value)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a task that completed without error.
///
/// `Empty` means the model deliberately declined: an empty string, an empty
/// list or `null`. It is data, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated<T> {
    Content(T),
    Empty,
}

impl<T> Generated<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Generated::Empty)
    }

    pub fn content(&self) -> Option<&T> {
        match self {
            Generated::Content(v) => Some(v),
            Generated::Empty => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Generated::Content(v) => Some(v),
            Generated::Empty => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Generated<U> {
        match self {
            Generated::Content(v) => Generated::Content(f(v)),
            Generated::Empty => Generated::Empty,
        }
    }
}

impl<T: Default> Generated<T> {
    /// The content, or `T::default()` (`""`, `[]`) when empty.
    pub fn unwrap_or_default(self) -> T {
        self.into_option().unwrap_or_default()
    }
}

/// Aggregated output of one topic request.
///
/// Every field may be empty: an empty `information` means the topic could
/// not be covered, and in that case `flowchart` and `quiz` are empty too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub information: String,
    pub flowchart: String,
    pub quiz: Vec<QuizItem>,
}

impl GenerationResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// What happened to one stage of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StageStatus {
    /// Produced non-empty content.
    Content,
    /// Ran and the model declined.
    Empty,
    /// Ran and failed; the reason is the rendered error.
    Failed(String),
    /// Not attempted because an earlier stage produced nothing.
    Skipped,
}

impl StageStatus {
    pub fn from_generated<T>(value: &Generated<T>) -> Self {
        if value.is_empty() {
            StageStatus::Empty
        } else {
            StageStatus::Content
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageStatus::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            StageStatus::Content => "content",
            StageStatus::Empty => "empty",
            StageStatus::Failed(_) => "failed",
            StageStatus::Skipped => "skipped",
        }
    }
}

/// Per-stage statuses of a topic run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub information: StageStatus,
    pub flowchart: StageStatus,
    pub quiz: StageStatus,
}

impl RunReport {
    pub(crate) fn skipped_after(information: StageStatus) -> Self {
        Self {
            information,
            flowchart: StageStatus::Skipped,
            quiz: StageStatus::Skipped,
        }
    }
}

/// A topic run's result together with its report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub result: GenerationResult,
    pub report: RunReport,
}

/// Final answer of the syllabus flow.
pub type SyllabusResult = Vec<SyllabusQuestion>;
