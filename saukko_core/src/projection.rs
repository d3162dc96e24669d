//! Token-aware dual-representation output shaping.
//!
//! Every adapter parses its tool's raw output into a typed payload and hands
//! it here. The projector guarantees that the structured response returned
//! to the caller never costs more estimated tokens than the raw CLI
//! transcript would have, by choosing between a full and a compact
//! representation of the same data, and always produces a human-readable
//! companion string from whichever form was chosen.
//!
//! The decision is a pure, single pass with two branch points (the caller
//! override and the token comparison); there are no retries and no state.

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::tokens::estimate_tokens;

/// Which representation of the payload was returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProjectionMode {
    Full,
    Compact,
}

/// The outcome of the full-vs-compact choice.
///
/// Invariant: when a compact projection was chosen, `estimated_tokens` is
/// the compact serialization's cost and is never greater than the full
/// form's; when the full form is at or below `raw_tokens` it is returned
/// without the compact projector ever being invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionDecision {
    pub mode: ProjectionMode,
    pub estimated_tokens: usize,
    pub raw_tokens: usize,
}

/// A shaped tool response: machine-readable `structured` value plus the
/// human-readable `display` companion.
#[derive(Debug, Clone)]
pub struct Projection {
    pub structured: Value,
    pub display: String,
    pub decision: ProjectionDecision,
}

/// Per-tool projection capability: a full serializer/formatter and a
/// compact projector/formatter, supplied by each adapter as a plain set of
/// functions behind one trait rather than a class hierarchy.
///
/// Contract: `Compact` must be a strict field subset of the full payload
/// (never a different shape), so its serialization is never more expensive
/// than the full form's.
pub trait ToolView: Serialize {
    type Compact: Serialize;

    /// Human-readable rendering of the full payload.
    fn render_full(&self) -> String;

    /// Reduced-field view of the payload.
    fn to_compact(&self) -> Self::Compact;

    /// Human-readable rendering of the compact view.
    fn render_compact(compact: &Self::Compact) -> String;
}

/// Maps the caller-facing `compact` parameter (default true) onto the
/// projector's override flag.
pub fn force_full_from_compact(compact: Option<bool>) -> bool {
    !compact.unwrap_or(true)
}

/// Choose the cheapest structured representation of `payload`.
///
/// 1. Serialize the full payload and estimate its token cost.
/// 2. `force_full` is a caller override, not a heuristic: it always wins.
/// 3. If the full form is already at or below the raw transcript's cost,
///    return it without computing the compact projection.
/// 4. Otherwise return the compact projection.
///
/// The only error path is a payload that fails to serialize, which is an
/// adapter bug of the same class as a parse failure; the decision algorithm
/// itself always terminates with a value.
pub fn project<V: ToolView>(payload: &V, raw_output: &str, force_full: bool) -> Result<Projection> {
    let full_value = serde_json::to_value(payload)?;
    let full_json = serde_json::to_string(&full_value)?;
    let full_tokens = estimate_tokens(&full_json);
    let raw_tokens = estimate_tokens(raw_output);

    if force_full {
        return Ok(Projection {
            display: payload.render_full(),
            structured: full_value,
            decision: ProjectionDecision {
                mode: ProjectionMode::Full,
                estimated_tokens: full_tokens,
                raw_tokens,
            },
        });
    }

    if full_tokens <= raw_tokens {
        // Already at least as cheap as the raw transcript; skipping the
        // compact projection here is deliberate, not an optimization gap.
        return Ok(Projection {
            display: payload.render_full(),
            structured: full_value,
            decision: ProjectionDecision {
                mode: ProjectionMode::Full,
                estimated_tokens: full_tokens,
                raw_tokens,
            },
        });
    }

    let compact = payload.to_compact();
    let compact_value = serde_json::to_value(&compact)?;
    let compact_json = serde_json::to_string(&compact_value)?;
    let compact_tokens = estimate_tokens(&compact_json);

    Ok(Projection {
        display: V::render_compact(&compact),
        structured: compact_value,
        decision: ProjectionDecision {
            mode: ProjectionMode::Compact,
            estimated_tokens: compact_tokens,
            raw_tokens,
        },
    })
}
