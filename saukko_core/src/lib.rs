//! # Saukko Core
//!
//! Execution core for wrapping external command-line tools on behalf of AI
//! agents. Adapters (one per wrapped tool) depend on this crate for the
//! security-critical plumbing every wrapper needs, so that injection
//! defenses, process lifecycle, and output budgeting live in one audited
//! place instead of being re-implemented per tool.
//!
//! ## Modules
//!
//! - **`runner`**: Secure subprocess execution. Builds an argv vector (no
//!   shell), enforces timeouts with full process-tree termination, and
//!   captures complete, ANSI-stripped output.
//!
//! - **`validation`**: Pre-spawn input checks. Binary allowlisting with
//!   explicit `PATH` resolution, and flag-injection rejection with the
//!   declared-passthrough exemption.
//!
//! - **`path_security`**: Confinement of path parameters to a tool's
//!   allowed filesystem roots.
//!
//! - **`policy`**: Per-tool policy files (JSON) naming the allowed
//!   binaries, passthrough parameters, allowed roots, and timeout class,
//!   plus a semantic lint pass over them.
//!
//! - **`tokens`**: Context-budget token estimation for output text.
//!
//! - **`projection`**: Per-invocation decision between a full structured
//!   payload and a compact alternative, chosen by comparing estimated
//!   token costs against the raw tool output.
//!
//! - **`error`**: Typed errors shared by the layers above. Validation
//!   violations and runner failures are distinct enums; a non-zero exit
//!   from a wrapped tool is never an error.
//!
//! - **`utils`**: Miscellaneous utilities, currently logging setup.

// Public modules
pub mod error;
pub mod path_security;
pub mod policy;
pub mod projection;
pub mod runner;
pub mod tokens;
pub mod tree_kill;
pub mod utils;
pub mod validation;

// Re-export main types for easier use
pub use error::{Error, Result, RunnerError, ValidationViolation};
pub use policy::ToolPolicy;
pub use projection::{Projection, ProjectionDecision, ProjectionMode};
pub use runner::{ExecutionRequest, ExecutionResult};
