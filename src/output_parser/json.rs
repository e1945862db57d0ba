//! Multi-strategy JSON extraction.

use serde_json::Value;

use crate::output_parser::complete::auto_complete_json;
use crate::output_parser::error::{truncate, ParseError};
use crate::output_parser::extract::{dangling_start, find_bracketed_at, json_fence, preprocess};
use crate::output_parser::repair::try_repair_json;

/// A JSON value recovered from model text, plus how it was recovered.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub value: Value,
    /// Which candidate produced the value: `"direct"`, `"code_block"`,
    /// `"object"`, `"array"` or `"truncated"`.
    pub strategy: &'static str,
    /// Repair rewrote the candidate before it parsed.
    pub repaired: bool,
    /// The candidate was cut off and had to be closed.
    pub auto_completed: bool,
}

/// Pull a JSON value out of a raw model response.
///
/// Candidates, in order:
/// 1. The whole response after stripping reasoning blocks
/// 2. A fenced code block tagged `json`, or one that starts like JSON
/// 3. The last balanced `{...}` in the text
/// 4. The last balanced `[...]` in the text
/// 5. An unterminated value running to the end of the text
///
/// Each candidate is tried as-is, then repaired, then auto-completed.
///
/// ```
/// use quizgen::output_parser::extract_json;
///
/// let raw = "<think>draft</think>Here you go:\n```json\n{\"flowchart\": \"A -> B\",}\n```";
/// let got = extract_json(raw).unwrap();
/// assert_eq!(got.value["flowchart"], "A -> B");
/// assert!(got.repaired);
/// ```
pub fn extract_json(response: &str) -> Result<Extracted, ParseError> {
    let cleaned = preprocess(response);
    if cleaned.is_empty() {
        return Err(ParseError::EmptyResponse);
    }

    let mut candidates: Vec<(&'static str, &str)> = vec![("direct", cleaned.as_str())];
    if let Some(body) = json_fence(&cleaned) {
        candidates.push(("code_block", body));
    }
    // The outermost region goes first: an array of objects is an "array",
    // an object holding an array is an "object".
    let mut regions: Vec<(usize, &'static str, &str)> = Vec::new();
    if let Some((at, obj)) = find_bracketed_at(&cleaned, '{', '}') {
        regions.push((at, "object", obj));
    }
    if let Some((at, arr)) = find_bracketed_at(&cleaned, '[', ']') {
        regions.push((at, "array", arr));
    }
    regions.sort_by_key(|(at, _, _)| *at);
    candidates.extend(regions.into_iter().map(|(_, strategy, text)| (strategy, text)));
    if let Some(tail) = dangling_start(&cleaned) {
        candidates.push(("truncated", tail));
    }

    // Plain parses first so a clean answer later in the text beats a
    // repaired guess at an earlier one.
    for &(strategy, text) in &candidates {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            return Ok(Extracted {
                value,
                strategy,
                repaired: false,
                auto_completed: false,
            });
        }
    }

    for &(strategy, text) in &candidates {
        if let Some(fixed) = try_repair_json(text) {
            if let Ok(value) = serde_json::from_str::<Value>(&fixed) {
                return Ok(Extracted {
                    value,
                    strategy,
                    repaired: true,
                    auto_completed: false,
                });
            }
        }
    }

    for &(strategy, text) in &candidates {
        if let Some(fixed) = auto_complete_json(text) {
            if let Ok(value) = serde_json::from_str::<Value>(&fixed) {
                return Ok(Extracted {
                    value,
                    strategy,
                    repaired: false,
                    auto_completed: true,
                });
            }
        }
    }

    let reason = serde_json::from_str::<Value>(&cleaned)
        .err()
        .map(|e| e.to_string())
        .unwrap_or_default();
    Err(ParseError::Unparseable {
        text: truncate(&cleaned, 200),
        reason,
    })
}
