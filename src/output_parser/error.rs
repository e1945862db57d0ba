//! Error types for output parsing.

/// Why no JSON value could be pulled out of a model response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The response was empty or only whitespace/reasoning.
    #[error("empty model response")]
    EmptyResponse,

    /// No strategy produced valid JSON.
    #[error("no JSON found in model response: {text}")]
    Unparseable {
        /// A truncated copy of the cleaned text.
        text: String,
        /// Error reported by `serde_json` on the best candidate.
        reason: String,
    },
}

/// Truncate to at most `max_chars` characters, appending "..." if cut.
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 4), "héll...");
        assert_eq!(truncate("short", 10), "short");
    }
}
