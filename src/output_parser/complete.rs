//! Closing JSON that was cut off mid-answer.
//!
//! Long quiz answers regularly hit the token limit. [`auto_complete_json`]
//! drops the dangling tail (a half-written key, a trailing comma) and closes
//! every open string, array and object so the items that did arrive survive.

use serde_json::Value;

/// Delimiter state at the end of `s`: the closers still owed, innermost last,
/// and whether a string is open.
fn open_state(s: &str) -> (Vec<char>, bool) {
    let mut owed = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in s.chars() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => owed.push('}'),
            '[' => owed.push(']'),
            '}' | ']' => {
                if owed.last() == Some(&ch) {
                    owed.pop();
                }
            }
            _ => {}
        }
    }
    (owed, in_string)
}

/// Close an open string and every open array/object, innermost first.
pub(crate) fn close_delimiters(s: &str) -> String {
    let (owed, in_string) = open_state(s);
    let mut out = s.to_string();
    if in_string {
        out.push('"');
    }
    out.extend(owed.into_iter().rev());
    out
}

/// Complete a truncated JSON object or array.
///
/// Returns `None` when the text does not start like JSON or cannot be
/// completed into something `serde_json` accepts. Already-valid input is
/// returned unchanged.
///
/// ```
/// use quizgen::output_parser::auto_complete_json;
///
/// let cut = r#"{"quiz": [{"question": "Q1"}, {"question": "Q2", "opt"#;
/// let fixed = auto_complete_json(cut).unwrap();
/// let v: serde_json::Value = serde_json::from_str(&fixed).unwrap();
/// assert_eq!(v["quiz"][1]["question"], "Q2");
/// ```
pub fn auto_complete_json(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    if serde_json::from_str::<Value>(trimmed).is_ok() {
        return Some(trimmed.to_string());
    }

    let (owed, in_string) = open_state(trimmed);
    let mut body = trimmed.to_string();
    if in_string {
        body.push('"');
    }
    let inside_object = owed.last() == Some(&'}');
    let body = drop_dangling_tail(&body, inside_object);

    let mut completed = body.to_string();
    let (owed, _) = open_state(&completed);
    completed.extend(owed.into_iter().rev());

    serde_json::from_str::<Value>(&completed)
        .is_ok()
        .then_some(completed)
}

/// Strip whatever cannot stand on its own at the end of a truncated body.
fn drop_dangling_tail(body: &str, inside_object: bool) -> &str {
    let mut t = body.trim_end();
    loop {
        if let Some(rest) = t.strip_suffix(',') {
            t = rest.trim_end();
            continue;
        }
        // `, {` or `, [` opened but nothing written inside
        if let Some(rest) = t.strip_suffix(['{', '[']) {
            let rest = rest.trim_end();
            if rest.ends_with(',') {
                t = rest;
                continue;
            }
        }
        // `"key":` with no value yet
        if let Some(rest) = t.strip_suffix(':') {
            t = strip_last_string(rest.trim_end()).trim_end();
            continue;
        }
        // `, "key"` with no colon yet
        if inside_object && t.ends_with('"') {
            let before = strip_last_string(t).trim_end();
            if before.ends_with(',') || before.ends_with('{') {
                t = before;
                continue;
            }
        }
        return t;
    }
}

/// Remove a trailing `"..."` literal; unchanged if `s` does not end with one.
fn strip_last_string(s: &str) -> &str {
    let Some(inner) = s.strip_suffix('"') else {
        return s;
    };
    let mut idx = inner.len();
    while let Some(pos) = inner[..idx].rfind('"') {
        let backslashes = inner[..pos].chars().rev().take_while(|c| *c == '\\').count();
        if backslashes % 2 == 0 {
            return &inner[..pos];
        }
        idx = pos;
    }
    s
}
