//! Validation and enhancement of generated review comments.
//!
//! Sends a batch of comments to an LLM in one call, extracts the per-comment
//! verdicts from whatever text comes back, and merges corrected bodies onto
//! the original comments by position.

pub mod llm;
pub mod merge;
pub mod pipeline;
pub mod prompt;
pub mod response;
