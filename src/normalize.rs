//! Deterministic quiz ordering.

use crate::schema::QuizItem;

/// Order a quiz for presentation.
///
/// Non-coding items come first, ascending by difficulty (easy, medium, hard),
/// then the coding items in their original order. Items of equal difficulty
/// keep their relative order. Nothing is dropped or changed.
///
/// # Example
///
/// ```
/// use quizgen::normalize::normalize;
///
/// assert!(normalize(Vec::new()).is_empty());
/// ```
pub fn normalize(items: Vec<QuizItem>) -> Vec<QuizItem> {
    let (mut ordered, coding): (Vec<QuizItem>, Vec<QuizItem>) =
        items.into_iter().partition(|item| !item.is_coding_question);
    // `sort_by_key` is stable.
    ordered.sort_by_key(|item| item.difficulty.rank());
    ordered.extend(coding);
    ordered
}
