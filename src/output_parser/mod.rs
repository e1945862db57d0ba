//! # Model Output Parser
//!
//! Pulls JSON out of raw model responses without another model call.
//! Handles reasoning blocks, markdown fences, surrounding prose, malformed
//! JSON and answers truncated by the token limit.
//!
//! | Function | Purpose |
//! |----------|---------|
//! | [`extract_json`] | Best-effort JSON value from a response |
//! | [`strip_think_tags`] | Remove `<think>` blocks from text |
//! | [`try_repair_json`] | Fix common model JSON errors |
//! | [`auto_complete_json`] | Close JSON that was cut off |

pub mod complete;
pub mod error;
pub mod extract;
pub mod json;
pub mod repair;

pub use complete::auto_complete_json;
pub use error::ParseError;
pub use extract::{preprocess, strip_think_tags};
pub use json::{extract_json, Extracted};
pub use repair::try_repair_json;
