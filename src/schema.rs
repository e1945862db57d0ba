//! Output schemas for every generation stage.
//!
//! Each stage's model answer is decoded straight into one of these closed
//! types. Unknown fields are rejected, enumerations (option labels,
//! difficulty, marks) only accept their fixed members, and
//! [`OutputSchema::validate`] checks the invariants serde cannot express.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A JSON shape a [`StructuredTask`](crate::task::StructuredTask) can decode into.
pub trait OutputSchema: DeserializeOwned + Send + Sync + 'static {
    /// Example of the expected JSON, appended to the prompt as the response format.
    const SHAPE: &'static str;

    /// Structural checks beyond what deserialization enforces.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Whether the model declined to produce content (empty string or list).
    fn is_empty(&self) -> bool {
        false
    }
}

// ── Quiz ──

/// One of the four option labels of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            OptionLabel::A => "A",
            OptionLabel::B => "B",
            OptionLabel::C => "C",
            OptionLabel::D => "D",
        }
    }
}

impl FromStr for OptionLabel {
    type Err = String;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(OptionLabel::A),
            "B" => Ok(OptionLabel::B),
            "C" => Ok(OptionLabel::C),
            "D" => Ok(OptionLabel::D),
            _ => Err(format!("unknown option label '{}', expected A, B, C or D", s)),
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OptionLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OptionLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Question difficulty. Ordering follows [`rank`](Difficulty::rank).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Sort key: easy=0, medium=1, hard=2.
    pub fn rank(self) -> u8 {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(format!(
                "unknown difficulty '{}', expected easy, medium or hard",
                s
            )),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Difficulty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// The four answer choices. All four are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuizOptions {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
    #[serde(rename = "C")]
    pub c: String,
    #[serde(rename = "D")]
    pub d: String,
}

impl QuizOptions {
    pub fn get(&self, label: OptionLabel) -> &str {
        match label {
            OptionLabel::A => &self.a,
            OptionLabel::B => &self.b,
            OptionLabel::C => &self.c,
            OptionLabel::D => &self.d,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (OptionLabel, &str)> {
        [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D]
            .into_iter()
            .map(move |label| (label, self.get(label)))
    }
}

/// A single multiple-choice question, possibly a coding question.
///
/// Wire names follow the model-facing format: `question`, `correct_answer`,
/// `isCodingQuestion` (optional, defaults to `false`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuizItem {
    #[serde(rename = "question")]
    pub question_text: String,
    pub options: QuizOptions,
    pub correct_answer: OptionLabel,
    pub explanation: String,
    pub difficulty: Difficulty,
    #[serde(rename = "isCodingQuestion", default)]
    pub is_coding_question: bool,
}

impl QuizItem {
    /// Text of the option named by `correct_answer`.
    pub fn correct_option(&self) -> &str {
        self.options.get(self.correct_answer)
    }

    fn check(&self) -> Result<(), String> {
        if self.question_text.trim().is_empty() {
            return Err("question text is empty".into());
        }
        for (label, text) in self.options.iter() {
            if text.trim().is_empty() {
                return Err(format!("option {} is empty", label));
            }
        }
        Ok(())
    }
}

// ── Stage outputs ──

/// `{"information": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InformationOutput {
    pub information: String,
}

impl OutputSchema for InformationOutput {
    const SHAPE: &'static str = r#"{"information": "<500-700 words of explanatory text, or an empty string>"}"#;

    fn is_empty(&self) -> bool {
        self.information.trim().is_empty()
    }
}

/// `{"flowchart": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowchartOutput {
    pub flowchart: String,
}

impl OutputSchema for FlowchartOutput {
    const SHAPE: &'static str = r#"{"flowchart": "<Start -> Step A -> Step B -> End, or an empty string>"}"#;

    fn is_empty(&self) -> bool {
        self.flowchart.trim().is_empty()
    }
}

/// `{"quiz": [QuizItem, ...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuizOutput {
    pub quiz: Vec<QuizItem>,
}

impl OutputSchema for QuizOutput {
    const SHAPE: &'static str = r#"{"quiz": [{"question": "<text>", "options": {"A": "<text>", "B": "<text>", "C": "<text>", "D": "<text>"}, "correct_answer": "A", "explanation": "<one sentence>", "difficulty": "easy", "isCodingQuestion": false}]}"#;

    fn validate(&self) -> Result<(), String> {
        for (i, item) in self.quiz.iter().enumerate() {
            item.check().map_err(|e| format!("quiz[{}]: {}", i, e))?;
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.quiz.is_empty()
    }
}

/// `{"coreTopicsText": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreTopicsOutput {
    #[serde(rename = "coreTopicsText")]
    pub core_topics_text: String,
}

impl OutputSchema for CoreTopicsOutput {
    const SHAPE: &'static str = r#"{"coreTopicsText": "<numbered list of core topics>"}"#;

    fn is_empty(&self) -> bool {
        self.core_topics_text.trim().is_empty()
    }
}

// ── Syllabus questions ──

/// Mark value of a syllabus exam question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Marks {
    One,
    TwoAndHalf,
    Five,
    TwelveAndHalf,
}

impl Marks {
    pub const ALL: [Marks; 4] = [Marks::One, Marks::TwoAndHalf, Marks::Five, Marks::TwelveAndHalf];

    pub fn value(self) -> f64 {
        match self {
            Marks::One => 1.0,
            Marks::TwoAndHalf => 2.5,
            Marks::Five => 5.0,
            Marks::TwelveAndHalf => 12.5,
        }
    }

    /// Exact match against the allowed values; anything else is `None`.
    pub fn from_value(value: f64) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.value() == value)
    }
}

impl Serialize for Marks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value())
    }
}

impl<'de> Deserialize<'de> for Marks {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Marks::from_value(value).ok_or_else(|| {
            de::Error::custom(format!("invalid marks {}, expected 1, 2.5, 5 or 12.5", value))
        })
    }
}

/// One generated exam question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyllabusQuestion {
    #[serde(rename = "questionText")]
    pub question_text: String,
    pub marks: Marks,
}

/// Bare JSON array of [`SyllabusQuestion`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyllabusQuestions(pub Vec<SyllabusQuestion>);

impl OutputSchema for SyllabusQuestions {
    const SHAPE: &'static str = r#"[{"questionText": "<question>", "marks": 2.5}]"#;

    fn validate(&self) -> Result<(), String> {
        for (i, q) in self.0.iter().enumerate() {
            if q.question_text.trim().is_empty() {
                return Err(format!("[{}]: question text is empty", i));
            }
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item_json() -> serde_json::Value {
        json!({
            "question": "What is the height of a single-node BST?",
            "options": {"A": "0", "B": "1", "C": "2", "D": "undefined"},
            "correct_answer": "A",
            "explanation": "Height counts edges.",
            "difficulty": "easy"
        })
    }

    #[test]
    fn test_quiz_item_defaults_coding_flag() {
        let item: QuizItem = serde_json::from_value(item_json()).unwrap();
        assert!(!item.is_coding_question);
        assert_eq!(item.correct_option(), "0");
    }

    #[test]
    fn test_quiz_item_rejects_unknown_field() {
        let mut v = item_json();
        v["hint"] = json!("look at the root");
        assert!(serde_json::from_value::<QuizItem>(v).is_err());
    }

    #[test]
    fn test_quiz_item_rejects_missing_option() {
        let mut v = item_json();
        v["options"] = json!({"A": "0", "B": "1", "C": "2"});
        assert!(serde_json::from_value::<QuizItem>(v).is_err());
    }

    #[test]
    fn test_label_and_difficulty_case_insensitive() {
        let mut v = item_json();
        v["correct_answer"] = json!("b");
        v["difficulty"] = json!("Hard");
        let item: QuizItem = serde_json::from_value(v).unwrap();
        assert_eq!(item.correct_answer, OptionLabel::B);
        assert_eq!(item.difficulty, Difficulty::Hard);
    }

    #[test]
    fn test_label_out_of_range_rejected() {
        let mut v = item_json();
        v["correct_answer"] = json!("E");
        let err = serde_json::from_value::<QuizItem>(v).unwrap_err();
        assert!(err.to_string().contains("unknown option label"));
    }

    #[test]
    fn test_difficulty_out_of_range_rejected() {
        let mut v = item_json();
        v["difficulty"] = json!("expert");
        assert!(serde_json::from_value::<QuizItem>(v).is_err());
    }

    #[test]
    fn test_quiz_validate_empty_option() {
        let mut v = item_json();
        v["options"]["C"] = json!("  ");
        let quiz = QuizOutput {
            quiz: vec![serde_json::from_value(v).unwrap()],
        };
        assert_eq!(quiz.validate().unwrap_err(), "quiz[0]: option C is empty");
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let item: QuizItem = serde_json::from_value(item_json()).unwrap();
        let out = serde_json::to_value(&item).unwrap();
        assert_eq!(out["question"], "What is the height of a single-node BST?");
        assert_eq!(out["correct_answer"], "A");
        assert_eq!(out["difficulty"], "easy");
        assert_eq!(out["isCodingQuestion"], false);
    }

    #[test]
    fn test_difficulty_rank_order() {
        assert!(Difficulty::Easy.rank() < Difficulty::Medium.rank());
        assert!(Difficulty::Medium.rank() < Difficulty::Hard.rank());
    }

    #[test]
    fn test_marks_accepts_allowed_values() {
        let qs: SyllabusQuestions = serde_json::from_str(
            r#"[{"questionText": "Define a stack.", "marks": 1},
                {"questionText": "Compare BFS and DFS.", "marks": 5.0},
                {"questionText": "Design a cache.", "marks": 12.5}]"#,
        )
        .unwrap();
        let marks: Vec<Marks> = qs.0.iter().map(|q| q.marks).collect();
        assert_eq!(marks, vec![Marks::One, Marks::Five, Marks::TwelveAndHalf]);
    }

    #[test]
    fn test_marks_rejects_other_values() {
        let result: Result<SyllabusQuestions, _> =
            serde_json::from_str(r#"[{"questionText": "Q", "marks": 3}]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_marks_serialize_as_number() {
        let q = SyllabusQuestion {
            question_text: "Q".into(),
            marks: Marks::TwoAndHalf,
        };
        assert_eq!(serde_json::to_value(&q).unwrap()["marks"], 2.5);
    }

    #[test]
    fn test_emptiness() {
        assert!(InformationOutput { information: " \n".into() }.is_empty());
        assert!(!FlowchartOutput { flowchart: "A -> B".into() }.is_empty());
        assert!(QuizOutput { quiz: vec![] }.is_empty());
        assert!(SyllabusQuestions(vec![]).is_empty());
    }
}
