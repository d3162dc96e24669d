//! Confinement of path parameters to a tool's allowed roots.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::ValidationViolation;

/// Validate that `path` stays inside one of `allowed_roots`.
///
/// Relative paths are interpreted against the first allowed root. Symlinks
/// are resolved via canonicalization when the path exists; for paths that
/// do not exist yet (output files a tool is about to create) the check
/// falls back to lexical normalization, which still rejects `..` escapes.
///
/// Returns the resolved absolute path on success so callers place the
/// validated form, not the raw input, into argv.
pub fn assert_allowed_root(
    path: &Path,
    allowed_roots: &[PathBuf],
    parameter: &str,
) -> Result<PathBuf, ValidationViolation> {
    let escape = || ValidationViolation::PathEscape {
        parameter: parameter.to_string(),
        value: path.display().to_string(),
    };

    let mut canonical_roots = Vec::new();
    for root in allowed_roots {
        if let Ok(canonical) = fs::canonicalize(root) {
            canonical_roots.push(canonical);
        }
    }
    if canonical_roots.is_empty() {
        return Err(escape());
    }

    let path_to_check = if path.is_absolute() {
        path.to_path_buf()
    } else {
        canonical_roots[0].join(path)
    };

    let resolved = match fs::canonicalize(&path_to_check) {
        Ok(p) => p,
        Err(_) => normalize_path(&path_to_check),
    };

    if canonical_roots.iter().any(|root| resolved.starts_with(root)) {
        Ok(resolved)
    } else {
        Err(escape())
    }
}

/// Lexical normalization: collapses `.` and `..` without touching the
/// filesystem. Less strict than canonicalization against symlink tricks,
/// but required for paths that do not exist yet.
fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn path_inside_root_is_accepted() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let roots = vec![temp.path().to_path_buf()];
        let file = temp.path().join("notes.txt");
        fs::write(&file, "content")?;

        let validated = assert_allowed_root(&file, &roots, "path").expect("inside root");
        assert_eq!(validated, fs::canonicalize(&file)?);
        Ok(())
    }

    #[test]
    fn relative_paths_resolve_against_the_first_root() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let roots = vec![temp.path().to_path_buf()];
        fs::write(temp.path().join("a.txt"), "x")?;

        let validated = assert_allowed_root(Path::new("a.txt"), &roots, "path").expect("relative");
        assert!(validated.starts_with(fs::canonicalize(temp.path())?));
        Ok(())
    }

    #[test]
    fn dotdot_escape_is_rejected() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let roots = vec![temp.path().to_path_buf()];

        let err = assert_allowed_root(Path::new("../outside.txt"), &roots, "path").unwrap_err();
        assert!(matches!(err, ValidationViolation::PathEscape { .. }));
        Ok(())
    }

    #[test]
    fn absolute_path_outside_every_root_is_rejected() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let roots = vec![temp.path().to_path_buf()];

        let err = assert_allowed_root(Path::new("/etc/passwd"), &roots, "path").unwrap_err();
        assert!(matches!(err, ValidationViolation::PathEscape { .. }));
        Ok(())
    }

    #[test]
    fn nonexistent_file_inside_root_is_accepted() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let roots = vec![temp.path().to_path_buf()];

        let validated =
            assert_allowed_root(Path::new("to-be-created.txt"), &roots, "output").expect("lexical");
        assert!(validated.starts_with(fs::canonicalize(temp.path())?));
        Ok(())
    }

    #[test]
    fn second_root_also_admits_paths() -> anyhow::Result<()> {
        let a = TempDir::new()?;
        let b = TempDir::new()?;
        let roots = vec![a.path().to_path_buf(), b.path().to_path_buf()];
        let file = b.path().join("in_b.txt");
        fs::write(&file, "x")?;

        assert!(assert_allowed_root(&file, &roots, "path").is_ok());
        Ok(())
    }

    #[test]
    fn empty_roots_reject_everything() {
        let err = assert_allowed_root(Path::new("x"), &[], "path").unwrap_err();
        assert!(matches!(err, ValidationViolation::PathEscape { .. }));
    }
}
