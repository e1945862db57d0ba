use std::collections::HashMap;

/// Render a prompt template with variable substitution.
///
/// Replaces `{key}` placeholders with values from `vars`. Use `{{` to insert
/// a literal `{` and `}}` to insert a literal `}`. Placeholders without a
/// matching variable are left as written.
///
/// Rendering is a single left-to-right pass, so substituted values are never
/// re-scanned: background text that happens to contain `{name}` is inserted
/// verbatim.
///
/// # Example
///
/// ```
/// use quizgen::prompt::render;
/// use std::collections::HashMap;
///
/// let vars = HashMap::from([("name".to_string(), "Alice".to_string())]);
/// let result = render("Hello {name}, here is JSON: {{\"key\": \"val\"}}", &vars);
/// assert_eq!(result, r#"Hello Alice, here is JSON: {"key": "val"}"#);
/// ```
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('{') {
            if let Some(close) = tail[1..].find('}') {
                let key = &tail[1..1 + close];
                if is_placeholder_key(key) {
                    if let Some(value) = vars.get(key) {
                        out.push_str(value);
                        rest = &tail[close + 2..];
                        continue;
                    }
                }
            }
        }

        // Lone brace or unknown placeholder: keep the character.
        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }

    out.push_str(rest);
    out
}

fn is_placeholder_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

/// Wrap text in a labeled section for structured prompts.
pub fn section(label: &str, content: &str) -> String {
    format!("## {}\n{}", label, content)
}
