//! Cheap, consistent token estimation for relative sizing decisions.
//!
//! The projector compares the estimated token cost of the raw CLI transcript
//! against the serialized structured forms. The only property the rest of
//! the system depends on is that the same formula is applied to both sides;
//! tokenizer fidelity is explicitly not a goal, and the estimate is never
//! used for external token accounting.

/// Approximate LLM token count of `text`: `ceil(chars / 4)`.
///
/// O(length) and allocation-free; wrapped tools can emit megabytes of log
/// text and this runs on every projection decision.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
