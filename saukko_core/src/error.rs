//! Typed error taxonomy for the execution core.
//!
//! Every failure an adapter can see maps to a stable, typed variant so the
//! agent consuming a tool can branch programmatically instead of
//! pattern-matching free text. Validation and spawn errors abort before any
//! process work occurs; timeout and non-zero exit codes are delivered as
//! structured data in `ExecutionResult`, never as errors.

use thiserror::Error;

/// A caller-supplied value rejected before execution.
///
/// Produced synchronously by the validation layer; no process is ever
/// spawned once one of these is raised. Always recoverable by the caller
/// supplying corrected input, never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationViolation {
    /// A plain-argument parameter received a value starting with `-`,
    /// which the underlying CLI would interpret as an option.
    #[error("flag injection in parameter '{parameter}': value '{value}' starts with '-'")]
    FlagInjection { parameter: String, value: String },

    /// The requested binary is not a member of the tool's allowlist.
    #[error("command '{binary}' is not in the tool allowlist")]
    DisallowedCommand { binary: String },

    /// A path parameter resolves outside every allowed root.
    #[error("path escape in parameter '{parameter}': '{value}' is outside the allowed roots")]
    PathEscape { parameter: String, value: String },
}

impl ValidationViolation {
    /// Stable category string for programmatic handling and logging.
    pub fn category(&self) -> &'static str {
        match self {
            ValidationViolation::FlagInjection { .. } => "FLAG_INJECTION",
            ValidationViolation::DisallowedCommand { .. } => "DISALLOWED_COMMAND",
            ValidationViolation::PathEscape { .. } => "PATH_ESCAPE",
        }
    }
}

/// Conditions the runner cannot attribute to the child program.
///
/// A non-zero exit code is not a `RunnerError`; wrapped tools routinely use
/// non-zero exits to signal "no results" or "findings present", which is
/// domain data for the adapter to interpret.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// An allowlisted binary could not be resolved to an executable on the
    /// execution `PATH`. Reported instead of silently falling back to shell
    /// lookup.
    #[error("binary '{binary}' was not found on PATH")]
    BinaryNotFound { binary: String },

    /// A request asked for shell interpretation, which this runner never
    /// provides. Commands are always spawned as argv vectors.
    #[error("shell features were requested for '{binary}' but are not supported")]
    ShellFeaturesUnsupported { binary: String },

    /// The OS refused to start the process (permissions, resource limits).
    #[error("failed to spawn '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading the child's stdout/stderr streams failed mid-capture.
    #[error("failed to capture output of '{binary}': {source}")]
    Capture {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The timeout fired but the process tree could not be terminated
    /// within the grace period. This is a hard cleanup contract violation.
    #[error("failed to terminate process tree of pid {pid}: {reason}")]
    KillFailed { pid: u32, reason: String },
}

impl RunnerError {
    /// Check if this error represents a potentially recoverable condition.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RunnerError::Capture { .. })
    }

    /// Stable category string for programmatic handling.
    pub fn error_category(&self) -> &'static str {
        match self {
            RunnerError::BinaryNotFound { .. } => "NOT_FOUND",
            RunnerError::ShellFeaturesUnsupported { .. } => "SPAWN",
            RunnerError::Spawn { .. } => "SPAWN",
            RunnerError::Capture { .. } => "IO",
            RunnerError::KillFailed { .. } => "KILL",
        }
    }
}

/// Umbrella error for the execution core.
///
/// `ParseFailure` belongs to adapters (their parser could not interpret the
/// child's output format) but lives here so every tool surfaces the same
/// shape: the caller can distinguish "the tool ran and failed" from "the
/// wrapper could not understand the tool".
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationViolation),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    /// An adapter's parser could not interpret the tool's raw output.
    #[error("could not parse output of '{tool}': {reason}")]
    ParseFailure { tool: String, reason: String },

    /// An adapter payload failed to serialize. This is an adapter bug, not
    /// a projection-algorithm failure.
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
