//! Parse diagnostics for structured task output.
//!
//! [`ParseDiagnostics`] records how a model answer was turned into JSON:
//! which extraction strategy found it and whether it had to be repaired or
//! auto-completed.

use crate::output_parser::Extracted;

/// Records what happened while decoding one task response.
///
/// Attached to every [`TaskOutput`](crate::task::TaskOutput).
///
/// # Example
///
/// ```
/// use quizgen::diagnostics::ParseDiagnostics;
///
/// let diag = ParseDiagnostics::default();
/// assert!(diag.clean());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseDiagnostics {
    /// Which extraction strategy produced the JSON, e.g. `"direct"`,
    /// `"code_block"`, `"object"`. `None` when the response was blank.
    pub strategy: Option<&'static str>,

    /// Whether JSON repair was applied (trailing commas, single quotes, etc.).
    pub repaired: bool,

    /// Whether a truncated answer was closed.
    pub auto_completed: bool,

    /// Length of the raw response in bytes.
    pub raw_len: usize,
}

impl ParseDiagnostics {
    pub(crate) fn from_extracted(extracted: &Extracted, raw_len: usize) -> Self {
        Self {
            strategy: Some(extracted.strategy),
            repaired: extracted.repaired,
            auto_completed: extracted.auto_completed,
            raw_len,
        }
    }

    /// True when the answer parsed without repair or completion.
    pub fn clean(&self) -> bool {
        !self.repaired && !self.auto_completed
    }
}
