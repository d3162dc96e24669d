//! Pre-spawn input validation.
//!
//! Two injection classes are specific to CLI-wrapping systems: invoking an
//! arbitrary binary, and smuggling extra flags into a value that is meant
//! to be a plain argument (a branch name of `--upload-pack=evil`). Both are
//! rejected here, synchronously, before a process is ever spawned.
//!
//! Adapters are required to run every externally supplied string through
//! this module before placing it into an argv array; the runner does not
//! re-validate.

use std::path::{Path, PathBuf};

use crate::error::{Error, RunnerError, ValidationViolation};
use crate::policy::ToolPolicy;

/// Check `binary` against the tool's allowlist and resolve it to an
/// absolute executable path on the execution `PATH`.
///
/// Resolution is explicit rather than delegated to shell lookup so that a
/// maliciously modified `PATH` cannot substitute a different executable
/// silently; an allowlisted binary that fails to resolve is a typed
/// `BinaryNotFound` error, never a fallback.
pub fn assert_allowed_command(binary: &str, policy: &ToolPolicy) -> Result<PathBuf, Error> {
    if !policy.allowed_binaries.iter().any(|b| b == binary) {
        return Err(ValidationViolation::DisallowedCommand {
            binary: binary.to_string(),
        }
        .into());
    }

    resolve_on_path(binary).ok_or_else(|| {
        RunnerError::BinaryNotFound {
            binary: binary.to_string(),
        }
        .into()
    })
}

/// Reject a non-empty `value` whose first character is `-`.
///
/// Callers that own a declared passthrough parameter must not route it
/// through this check; use [`validate_parameter`] to honor the policy's
/// declaration.
pub fn assert_no_flag_injection(value: &str, parameter: &str) -> Result<(), ValidationViolation> {
    if value.starts_with('-') {
        return Err(ValidationViolation::FlagInjection {
            parameter: parameter.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Policy-aware parameter check: passthrough parameters are exempt from the
/// flag-injection rule by declaration (rejecting a leading `-` there would
/// make them useless); everything else is always checked.
pub fn validate_parameter(
    policy: &ToolPolicy,
    parameter: &str,
    value: &str,
) -> Result<(), ValidationViolation> {
    if policy.is_passthrough(parameter) {
        return Ok(());
    }
    assert_no_flag_injection(value, parameter)
}

fn resolve_on_path(binary: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let candidate = dir.join(binary);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        #[cfg(windows)]
        {
            for ext in ["exe", "cmd", "bat"] {
                let with_ext = candidate.with_extension(ext);
                if with_ext.is_file() {
                    return Some(with_ext);
                }
            }
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_for(binary: &str) -> ToolPolicy {
        serde_json::from_str(&format!(
            r#"{{
                "name": "test",
                "description": "d",
                "allowed_binaries": ["{binary}"],
                "passthrough_parameters": ["args"]
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn allowlisted_binary_resolves_to_absolute_path() {
        let policy = policy_for("sh");
        let resolved = assert_allowed_command("sh", &policy).expect("sh on PATH");
        assert!(resolved.is_absolute());
    }

    #[test]
    fn unlisted_binary_is_disallowed() {
        let policy = policy_for("git");
        let err = assert_allowed_command("rm", &policy).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationViolation::DisallowedCommand { .. })
        ));
    }

    #[test]
    fn absolute_paths_do_not_match_bare_allowlist_entries() {
        let policy = policy_for("git");
        let err = assert_allowed_command("/usr/bin/git", &policy).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationViolation::DisallowedCommand { .. })
        ));
    }

    #[test]
    fn allowlisted_but_unresolvable_binary_is_not_found() {
        let policy = policy_for("saukko-no-such-binary");
        let err = assert_allowed_command("saukko-no-such-binary", &policy).unwrap_err();
        assert!(matches!(
            err,
            Error::Runner(RunnerError::BinaryNotFound { .. })
        ));
    }

    #[test]
    fn leading_dash_is_flag_injection() {
        for value in ["-f", "--upload-pack=evil", "--", "-"] {
            let err = assert_no_flag_injection(value, "branch").unwrap_err();
            assert!(matches!(err, ValidationViolation::FlagInjection { .. }));
        }
    }

    #[test]
    fn ordinary_values_pass() {
        for value in ["main", "feature/x", "", "a-b", "v1.0-rc1"] {
            assert!(assert_no_flag_injection(value, "branch").is_ok());
        }
    }

    #[test]
    fn passthrough_parameters_are_exempt_by_declaration() {
        let policy = policy_for("git");
        assert!(validate_parameter(&policy, "args", "--force").is_ok());
        assert!(validate_parameter(&policy, "branch", "--force").is_err());
    }
}
