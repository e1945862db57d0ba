//! Deterministic repair of almost-JSON.
//!
//! One scanner walks the text once, tracking whether it is inside a string,
//! and rewrites the mistakes models commonly make. No regex, no second model
//! call.

use crate::output_parser::complete::close_delimiters;

/// Repair common model JSON mistakes.
///
/// Returns `Some(fixed)` only when the input was invalid and the fixed text
/// parses. Valid input returns `None`.
///
/// Fixes, in a single pass:
/// - `//` and `/* */` comments are dropped
/// - Python `True`/`False`/`None` become `true`/`false`/`null`
/// - trailing commas before `}` or `]` are dropped
/// - `'single quoted'` strings become double quoted
/// - bare object keys are quoted
/// - raw newlines and tabs inside strings are escaped
///
/// Unclosed strings, arrays and objects are then closed.
///
/// ```
/// use quizgen::output_parser::try_repair_json;
///
/// let fixed = try_repair_json("{flowchart: 'A -> B',}").unwrap();
/// assert_eq!(fixed, r#"{"flowchart": "A -> B"}"#);
/// ```
pub fn try_repair_json(broken: &str) -> Option<String> {
    if is_json(broken) {
        return None;
    }
    let fixed = close_delimiters(&rewrite(broken));
    is_json(&fixed).then_some(fixed)
}

fn is_json(s: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(s).is_ok()
}

fn rewrite(src: &str) -> String {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::with_capacity(src.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '"' => i = copy_double_quoted(&chars, i, &mut out),
            '\'' if after_value_boundary(&out) => match closing_single_quote(&chars, i + 1) {
                Some(end) => {
                    push_requoted(&chars[i + 1..end], &mut out);
                    i = end + 1;
                }
                None => {
                    out.push(c);
                    i += 1;
                }
            },
            '/' if next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i = (i + 2).min(chars.len());
            }
            ',' if next_significant(&chars, i + 1).is_some_and(|n| n == '}' || n == ']') => {
                i += 1;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let is_key = next_significant(&chars, i) == Some(':')
                    && matches!(last_significant(&out), Some('{') | Some(','));
                if is_key {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    out.push_str(match word.as_str() {
                        "True" => "true",
                        "False" => "false",
                        "None" => "null",
                        other => other,
                    });
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Copy a double-quoted string starting at `start`, escaping raw control
/// characters. Returns the index after the closing quote.
fn copy_double_quoted(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('"');
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                out.push('\\');
                if let Some(&escaped) = chars.get(i + 1) {
                    out.push(escaped);
                }
                i += 2;
                continue;
            }
            '"' => {
                out.push('"');
                return i + 1;
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch => out.push(ch),
        }
        i += 1;
    }
    chars.len()
}

fn push_requoted(body: &[char], out: &mut String) {
    out.push('"');
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            '\\' if body.get(i + 1) == Some(&'\'') => {
                out.push('\'');
                i += 1;
            }
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            ch => out.push(ch),
        }
        i += 1;
    }
    out.push('"');
}

/// A single quote opens a string only where a JSON value or key may start.
fn after_value_boundary(out: &str) -> bool {
    matches!(last_significant(out), None | Some('{') | Some('[') | Some(':') | Some(','))
}

/// Closing `'` whose next significant character can end a value.
fn closing_single_quote(chars: &[char], from: usize) -> Option<usize> {
    let mut i = from;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '\'' => {
                let follow = next_significant(chars, i + 1);
                if matches!(follow, None | Some('}') | Some(']') | Some(':') | Some(',')) {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Next character that is neither whitespace nor inside a comment.
fn next_significant(chars: &[char], from: usize) -> Option<char> {
    let mut i = from;
    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            c => return Some(c),
        }
    }
    None
}

fn last_significant(out: &str) -> Option<char> {
    out.chars().rev().find(|c| !c.is_whitespace())
}
