//! Demo: the topic pipeline against MockBackend, no live LLM needed.
//!
//! Run with: `cargo run --example mock_pipeline`

use quizgen::stages;
use quizgen::{Event, ExecCtx, FnEventHandler, MockBackend, MockReply, QuizPipeline};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    quizgen::init_logging(&quizgen::LoggingOptions::default())?;

    let quiz = json!({
        "quiz": [
            {
                "question": "Which traversal visits BST keys in sorted order?",
                "options": {"A": "Pre-order", "B": "In-order", "C": "Post-order", "D": "Level-order"},
                "correct_answer": "B",
                "explanation": "In-order visits left subtree, node, then right subtree.",
                "difficulty": "medium",
                "isCodingQuestion": false
            },
            {
                "question": "Where is the smallest key in a BST?",
                "options": {"A": "Root", "B": "Rightmost node", "C": "Leftmost node", "D": "Any leaf"},
                "correct_answer": "C",
                "explanation": "Smaller keys always go left.",
                "difficulty": "easy",
                "isCodingQuestion": false
            }
        ]
    });

    // The flowchart stage fails with a 503; the quiz still comes through.
    let mock = MockBackend::new()
        .route(
            stages::INFORMATION,
            MockReply::text(r#"{"information": "A binary search tree keeps smaller keys to the left of each node."}"#),
        )
        .route(stages::FLOWCHART, MockReply::Status(503))
        .route(stages::QUIZ, MockReply::text(quiz.to_string()));

    let ctx = ExecCtx::builder("http://unused")
        .backend(Arc::new(mock))
        .event_handler(Arc::new(FnEventHandler(|event: Event| {
            if let Event::StageEnd { stage, status } = event {
                println!("{:<12} {}", stage, status.label());
            }
        })))
        .build()?;

    let run = QuizPipeline::new(Arc::new(ctx)).run("Binary Search Trees").await;

    println!("Information: {}", run.result.information);
    println!("Flowchart: {:?}", run.result.flowchart);
    for item in &run.result.quiz {
        println!("[{}] {} -> {}", item.difficulty, item.question_text, item.correct_answer);
    }
    Ok(())
}
