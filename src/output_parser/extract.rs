//! Locating the JSON payload inside raw model text.
//!
//! Models wrap answers in reasoning blocks, markdown fences and prose. These
//! helpers peel those layers off so the caller can hand a clean candidate to
//! `serde_json`.

/// Strip reasoning blocks and trim.
pub fn preprocess(text: &str) -> String {
    strip_think_tags(text).trim().to_string()
}

/// Remove every `<think>...</think>` and `<thinking>...</thinking>` block.
///
/// An unterminated block swallows the rest of the text.
///
/// ```
/// use quizgen::output_parser::strip_think_tags;
///
/// assert_eq!(strip_think_tags("<think>plan</think>{\"a\": 1}"), "{\"a\": 1}");
/// assert_eq!(strip_think_tags("<thinking>cut off"), "");
/// ```
pub fn strip_think_tags(text: &str) -> String {
    const TAGS: [(&str, &str); 2] = [("<think>", "</think>"), ("<thinking>", "</thinking>")];

    let mut out = text.to_string();
    for (open, close) in TAGS {
        let mut kept = String::with_capacity(out.len());
        let mut rest = out.as_str();
        while let Some(start) = rest.find(open) {
            kept.push_str(&rest[..start]);
            match rest[start..].find(close) {
                Some(end) => rest = &rest[start + end + close.len()..],
                None => {
                    rest = "";
                    break;
                }
            }
        }
        kept.push_str(rest);
        out = kept;
    }
    out
}

/// A fenced markdown block: its language hint and trimmed body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fence<'a> {
    pub lang: Option<&'a str>,
    pub body: &'a str,
}

/// All complete fenced blocks in order of appearance.
pub fn fences(text: &str) -> Vec<Fence<'_>> {
    let mut found = Vec::new();
    let mut offset = 0;

    while let Some(open) = text[offset..].find("```") {
        let header_start = offset + open + 3;
        let Some(header_len) = text[header_start..].find('\n') else {
            break;
        };
        let lang = text[header_start..header_start + header_len].trim();
        let body_start = header_start + header_len + 1;
        let Some(body_len) = text[body_start..].find("```") else {
            break;
        };
        found.push(Fence {
            lang: (!lang.is_empty()).then_some(lang),
            body: text[body_start..body_start + body_len].trim(),
        });
        offset = body_start + body_len + 3;
    }
    found
}

/// Body of the first fence that is tagged `json` or looks like JSON.
///
/// ```
/// use quizgen::output_parser::extract::json_fence;
///
/// let text = "Sure:\n```json\n{\"quiz\": []}\n```";
/// assert_eq!(json_fence(text), Some("{\"quiz\": []}"));
/// ```
pub fn json_fence(text: &str) -> Option<&str> {
    let all = fences(text);
    all.iter()
        .find(|f| f.lang.is_some_and(|l| l.eq_ignore_ascii_case("json")))
        .or_else(|| {
            all.iter()
                .find(|f| f.body.starts_with('{') || f.body.starts_with('['))
        })
        .map(|f| f.body)
}

/// Find the last balanced `open ... close` region, ignoring delimiters inside
/// JSON strings.
///
/// The last region wins because models tend to restate an example first and
/// give the real answer at the end.
///
/// ```
/// use quizgen::output_parser::extract::find_bracketed;
///
/// let text = r#"Example: {"a": 1}. Answer: {"a": [2, "]"]}"#;
/// assert_eq!(find_bracketed(text, '{', '}'), Some(r#"{"a": [2, "]"]}"#));
/// ```
pub fn find_bracketed(text: &str, open: char, close: char) -> Option<&str> {
    find_bracketed_at(text, open, close).map(|(_, region)| region)
}

/// [`find_bracketed`] plus the byte offset where the region starts.
pub(crate) fn find_bracketed_at(text: &str, open: char, close: char) -> Option<(usize, &str)> {
    let mut last = None;
    let mut depth = 0usize;
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        if ch == '"' && depth > 0 {
            in_string = true;
        } else if ch == open {
            if depth == 0 {
                start = i;
            }
            depth += 1;
        } else if ch == close && depth > 0 {
            depth -= 1;
            if depth == 0 {
                last = Some((start, &text[start..i + ch.len_utf8()]));
            }
        }
    }
    last
}

/// Start of an unterminated top-level value, for truncated answers.
pub(crate) fn dangling_start(text: &str) -> Option<&str> {
    let idx = text.find(['{', '['])?;
    Some(&text[idx..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn think_complete_and_multiple() {
        assert_eq!(strip_think_tags("<think>a</think>mid<think>b</think>end"), "midend");
        assert_eq!(strip_think_tags("<think>a</think>mid<thinking>b</thinking>end"), "midend");
    }

    #[test]
    fn think_unterminated() {
        assert_eq!(strip_think_tags("keep<think>reasoning without close"), "keep");
    }

    #[test]
    fn no_tags_untouched() {
        assert_eq!(strip_think_tags("just plain text"), "just plain text");
    }

    #[test]
    fn preprocess_trims() {
        assert_eq!(preprocess("  <think>x</think>  hello  "), "hello");
    }

    #[test]
    fn fences_collects_in_order() {
        let text = "```python\nprint(1)\n```\nthen\n```\n[1]\n```";
        let found = fences(text);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].lang, Some("python"));
        assert_eq!(found[1], Fence { lang: None, body: "[1]" });
    }

    #[test]
    fn json_fence_prefers_tagged_block() {
        let text = "```\n{\"a\": 1}\n```\n```JSON\n{\"b\": 2}\n```";
        assert_eq!(json_fence(text), Some("{\"b\": 2}"));
    }

    #[test]
    fn json_fence_ignores_code() {
        assert_eq!(json_fence("```python\nx = 1\n```"), None);
    }

    #[test]
    fn bracketed_nested_object() {
        let text = r#"{"outer": {"inner": [1]}}"#;
        assert_eq!(find_bracketed(text, '{', '}'), Some(text));
    }

    #[test]
    fn bracketed_prefers_later() {
        assert_eq!(find_bracketed(r#"[1, 2] and then ["a"]"#, '[', ']'), Some(r#"["a"]"#));
    }

    #[test]
    fn bracketed_none() {
        assert!(find_bracketed("no brackets", '{', '}').is_none());
        assert!(find_bracketed("{ never closed", '{', '}').is_none());
    }

    #[test]
    fn apostrophe_in_prose_is_not_a_string() {
        let text = r#"Here's the answer: {"flowchart": "A -> B"}"#;
        assert_eq!(find_bracketed(text, '{', '}'), Some(r#"{"flowchart": "A -> B"}"#));
    }
}
