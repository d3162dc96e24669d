//! Cross-platform process-tree termination.
//!
//! Many wrapped tools (npm install, docker compose up) fork helper
//! processes that would survive a kill of the immediate child and keep
//! consuming resources or holding file locks. POSIX process groups and the
//! Windows tree-kill utility are different primitives achieving the same
//! contract: terminate this process and everything it spawned. Both live
//! behind the single [`terminate_tree`] capability so call sites carry no
//! platform checks.
//!
//! On unix the runner starts every child in its own process group (see
//! `runner::run`), so the group id equals the child pid handed in here.

use crate::error::RunnerError;

#[cfg(unix)]
const TERM_GRACE: std::time::Duration = std::time::Duration::from_millis(100);

/// Terminate `pid` and all of its descendants.
///
/// Unix: SIGTERM to the process group, a short grace period, then SIGKILL.
/// A group that is already gone is success, not an error.
#[cfg(unix)]
pub async fn terminate_tree(pid: u32) -> Result<(), RunnerError> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(pid as i32);

    match killpg(pgid, Signal::SIGTERM) {
        Ok(()) => {}
        Err(Errno::ESRCH) => return Ok(()),
        Err(e) => {
            tracing::debug!("SIGTERM to process group {} failed: {}", pid, e);
        }
    }

    tokio::time::sleep(TERM_GRACE).await;

    match killpg(pgid, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(RunnerError::KillFailed {
            pid,
            reason: e.to_string(),
        }),
    }
}

/// Terminate `pid` and all of its descendants.
///
/// Windows: an explicit, synchronous `taskkill /T /F` invocation rather
/// than killing the immediate PID, because the immediate process may be a
/// thin launcher for the real worker tree.
#[cfg(windows)]
pub async fn terminate_tree(pid: u32) -> Result<(), RunnerError> {
    use std::process::Stdio;

    let status = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| RunnerError::KillFailed {
            pid,
            reason: format!("failed to invoke taskkill: {e}"),
        })?;

    // Exit code 128 means the process was already gone, which satisfies
    // the cleanup contract.
    match status.code() {
        Some(0) | Some(128) => Ok(()),
        other => Err(RunnerError::KillFailed {
            pid,
            reason: format!("taskkill exited with {:?}", other),
        }),
    }
}
