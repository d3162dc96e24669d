//! # Tool Policy Management
//!
//! Per-tool policies are loaded from `.json` files in a policy directory,
//! one file per wrapped tool. A policy is the immutable configuration the
//! validation layer consults: which binaries the tool may invoke, which
//! parameters are declared argument-passthrough, which filesystem roots the
//! tool must stay inside, and the default timeout class.
//!
//! Modelling the allowlist as data rather than code branching means adding
//! a new wrapped tool is a policy file, not a new code path. The adapters
//! themselves live outside this crate; they look their policy up by name
//! and pass it into `validation` and `runner`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};

/// Default timeout for read-only query tools. Install/build-class tools
/// declare a longer `timeout_seconds` in their policy file.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Tool names reserved by the surrounding server and not overridable by
/// user policies.
const RESERVED_TOOL_NAMES: &[&str] = &["await", "status"];

/// Immutable policy for one wrapped command-line tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ToolPolicy {
    pub name: String,
    pub description: String,
    /// Binaries this tool is permitted to invoke, as bare command names
    /// resolved on `PATH` at validation time. Usually exactly one entry.
    pub allowed_binaries: Vec<String>,
    /// Parameters whose explicit contract is "raw flags for the underlying
    /// tool". Flag-injection checks are skipped for these by declaration,
    /// never inferred at call time.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub passthrough_parameters: Vec<String>,
    /// Filesystem roots path parameters must stay inside. Empty means the
    /// tool performs no path confinement of its own.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_roots: Vec<PathBuf>,
    /// Override for the default command timeout, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ToolPolicy {
    /// Whether `parameter` was declared as an argument-passthrough field.
    pub fn is_passthrough(&self, parameter: &str) -> bool {
        self.passthrough_parameters.iter().any(|p| p == parameter)
    }

    /// Effective command timeout for this tool.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

fn default_enabled() -> bool {
    true
}

/// Load all tool policies from a directory of JSON files.
///
/// Files that fail to parse are logged and skipped; disabled policies are
/// skipped; a policy using a reserved name is a hard error. A missing
/// directory yields an empty map.
pub fn load_tool_policies(policy_dir: &Path) -> anyhow::Result<HashMap<String, ToolPolicy>> {
    use std::fs;

    if !policy_dir.exists() {
        return Ok(HashMap::new());
    }

    let mut policies = HashMap::new();

    for entry in fs::read_dir(policy_dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<ToolPolicy>(&contents) {
                Ok(policy) => {
                    if RESERVED_TOOL_NAMES.contains(&policy.name.as_str()) {
                        anyhow::bail!(
                            "Tool name '{}' conflicts with a reserved system tool. Reserved names: {:?}. Please rename your tool in {}",
                            policy.name,
                            RESERVED_TOOL_NAMES,
                            path.display()
                        );
                    }
                    if policy.enabled {
                        policies.insert(policy.name.clone(), policy);
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", path.display(), e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
            }
        }
    }

    Ok(policies)
}

/// A semantic problem found in a policy file.
#[derive(Debug, Clone)]
pub struct PolicyLintError {
    /// Path to the offending field, e.g. `allowed_binaries[0]`.
    pub field_path: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for PolicyLintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field_path, self.message)
    }
}

/// Semantic lint pass over policy files, beyond what serde's strict
/// deserialization already rejects.
#[derive(Debug, Clone, Default)]
pub struct PolicyLint;

impl PolicyLint {
    pub fn new() -> Self {
        Self
    }

    /// Parse and lint one policy file's content.
    pub fn check_file(
        &self,
        file_path: &Path,
        content: &str,
    ) -> Result<ToolPolicy, Vec<PolicyLintError>> {
        let policy: ToolPolicy = match serde_json::from_str(content) {
            Ok(p) => p,
            Err(e) => {
                return Err(vec![PolicyLintError {
                    field_path: file_path.display().to_string(),
                    message: format!("not a valid tool policy: {e}"),
                    suggestion: Some(
                        "check the field names against the ToolPolicy schema".to_string(),
                    ),
                }]);
            }
        };

        let mut errors = Vec::new();

        if policy.name.is_empty() {
            errors.push(PolicyLintError {
                field_path: "name".into(),
                message: "tool name must not be empty".into(),
                suggestion: None,
            });
        } else if !policy
            .name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            errors.push(PolicyLintError {
                field_path: "name".into(),
                message: format!("tool name '{}' is not lower_snake/kebab case", policy.name),
                suggestion: Some("use only [a-z0-9_-]".into()),
            });
        }

        if policy.allowed_binaries.is_empty() {
            errors.push(PolicyLintError {
                field_path: "allowed_binaries".into(),
                message: "allowlist must name at least one binary".into(),
                suggestion: Some("add the tool's executable name, e.g. \"git\"".into()),
            });
        }
        for (i, binary) in policy.allowed_binaries.iter().enumerate() {
            if binary.is_empty()
                || binary.contains(std::path::MAIN_SEPARATOR)
                || binary.contains('/')
                || binary.chars().any(char::is_whitespace)
            {
                errors.push(PolicyLintError {
                    field_path: format!("allowed_binaries[{i}]"),
                    message: format!(
                        "'{binary}' must be a bare command name, resolved on PATH at validation time"
                    ),
                    suggestion: Some("strip directories and arguments".into()),
                });
            }
        }

        let mut seen = std::collections::HashSet::new();
        for (i, param) in policy.passthrough_parameters.iter().enumerate() {
            if !seen.insert(param.as_str()) {
                errors.push(PolicyLintError {
                    field_path: format!("passthrough_parameters[{i}]"),
                    message: format!("duplicate passthrough parameter '{param}'"),
                    suggestion: None,
                });
            }
        }

        if policy.timeout_seconds == Some(0) {
            errors.push(PolicyLintError {
                field_path: "timeout_seconds".into(),
                message: "timeout must be a positive number of seconds".into(),
                suggestion: Some(format!("omit the field for the default ({DEFAULT_TIMEOUT_SECS}s)")),
            });
        }

        if errors.is_empty() { Ok(policy) } else { Err(errors) }
    }
}
