//! Secure subprocess execution with a deterministic, leak-free lifecycle.
//!
//! One [`ExecutionRequest`] is created per tool invocation, consumed once
//! by [`run`], and discarded; nothing outlives a single call. The command
//! is never passed through a shell interpreter: argv elements go to the OS
//! process-creation call as a vector, so a value containing `;`, `&&`, or
//! spaces cannot alter the invoked program or append extra commands.
//!
//! Output capture completes (streams closed) before the result is handed
//! back; parsers never see partial reads from a live process. ANSI escape
//! sequences are stripped so adapter parsers operate on clean text.
//!
//! Timeout semantics: on expiry the entire process tree is terminated via
//! `tree_kill::terminate_tree` within a bounded grace period, remaining
//! pipe output is drained, and the result carries `timed_out = true` with
//! the sentinel exit code 124 regardless of what the OS reported. A
//! non-zero exit code is never a runner error; wrapped tools use non-zero
//! exits as ordinary domain data.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::RunnerError;
use crate::policy::DEFAULT_TIMEOUT_SECS;
use crate::tree_kill;

/// Sentinel exit code reported for timed-out executions on every platform,
/// so adapters have a single timeout signal to check.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// How long to keep draining pipe output after the tree has been killed.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(100);

static ANSI_ESCAPES: LazyLock<Regex> = LazyLock::new(|| {
    // CSI sequences (colors, cursor movement) and OSC sequences (titles,
    // hyperlinks) as emitted by the tools we wrap.
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x1b\x07]*(?:\x07|\x1b\\)")
        .expect("valid ANSI regex")
});

/// One external command to execute: an already-validated binary path, an
/// argv vector of opaque strings, and execution context.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    binary: PathBuf,
    argv: Vec<String>,
    cwd: PathBuf,
    timeout: Duration,
    env: Vec<(String, String)>,
    allow_shell_features: bool,
}

impl ExecutionRequest {
    /// Start a request for `binary`, which callers obtain from
    /// `validation::assert_allowed_command` so only resolved, allowlisted
    /// executables reach the runner.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            argv: Vec::new(),
            cwd: PathBuf::from("."),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            env: Vec::new(),
            allow_shell_features: false,
        }
    }

    /// Append a single argv element. Never concatenated; a leading dash or
    /// embedded shell metacharacters stay inert data.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    /// Append multiple argv elements.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    /// Working directory for the child.
    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    /// Timeout for the whole execution. Tool policies carry the per-tool
    /// default (`ToolPolicy::timeout`).
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Request shell interpretation for this command. Defaults to `false`,
    /// and the runner rejects `true` at execution time: there is no shell
    /// code path to enable. The field exists so callers carrying the flag
    /// through from a wire request get a typed error instead of silently
    /// different semantics.
    #[must_use]
    pub fn allow_shell_features(mut self, allow: bool) -> Self {
        self.allow_shell_features = allow;
        self
    }

    pub fn binary(&self) -> &PathBuf {
        &self.binary
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

/// Outcome of one execution. Exactly one of {normal exit, `timed_out`}
/// holds; `exit_code` is the sentinel 124 whenever `timed_out` is set.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Clean zero exit within the timeout.
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Execute one external command.
///
/// Errors are limited to conditions not attributable to the child program:
/// the binary cannot be spawned, output capture fails, or the kill path
/// itself fails. Timeouts and non-zero exits come back as structured data.
pub async fn run(request: &ExecutionRequest) -> Result<ExecutionResult, RunnerError> {
    let binary_name = request.binary.display().to_string();

    if request.allow_shell_features {
        return Err(RunnerError::ShellFeaturesUnsupported {
            binary: binary_name,
        });
    }

    let start = Instant::now();

    let mut cmd = Command::new(&request.binary);
    cmd.args(&request.argv)
        .current_dir(&request.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in &request.env {
        cmd.env(key, value);
    }

    // Each child gets its own process group so a timeout can terminate the
    // full descendant tree, not just the immediate pid.
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RunnerError::BinaryNotFound {
                binary: binary_name.clone(),
            }
        } else {
            RunnerError::Spawn {
                binary: binary_name.clone(),
                source: e,
            }
        }
    })?;

    let pid = child.id();

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| RunnerError::Capture {
        binary: binary_name.clone(),
        source: std::io::Error::other("stdout pipe unavailable"),
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| RunnerError::Capture {
        binary: binary_name.clone(),
        source: std::io::Error::other("stderr pipe unavailable"),
    })?;

    let mut stdout_bytes: Vec<u8> = Vec::new();
    let mut stderr_bytes: Vec<u8> = Vec::new();

    // Scoped so the capture future's borrows end before the timeout arm
    // reaps the child and drains the pipes.
    let capture_outcome = {
        let capture = capture_to_completion(
            &mut child,
            &mut stdout_pipe,
            &mut stderr_pipe,
            &mut stdout_bytes,
            &mut stderr_bytes,
        );
        timeout(request.timeout, capture).await
    };

    match capture_outcome {
        Ok(capture_result) => {
            let status = capture_result.map_err(|source| RunnerError::Capture {
                binary: binary_name.clone(),
                source,
            })?;
            Ok(ExecutionResult {
                stdout: strip_ansi(&String::from_utf8_lossy(&stdout_bytes)),
                stderr: strip_ansi(&String::from_utf8_lossy(&stderr_bytes)),
                exit_code: status.code().unwrap_or(-1),
                timed_out: false,
                duration_ms: start.elapsed().as_millis() as u64,
            })
        }
        Err(_) => {
            if let Some(pid) = pid {
                tracing::info!("command '{}' timed out, terminating tree {}", binary_name, pid);
                tree_kill::terminate_tree(pid).await?;
            }
            // Reap the direct child and collect whatever output made it
            // into the pipes before the kill.
            let _ = child.wait().await;
            let _ = timeout(
                DRAIN_TIMEOUT,
                drain_pipes(
                    &mut stdout_pipe,
                    &mut stderr_pipe,
                    &mut stdout_bytes,
                    &mut stderr_bytes,
                ),
            )
            .await;

            Ok(ExecutionResult {
                stdout: strip_ansi(&String::from_utf8_lossy(&stdout_bytes)),
                stderr: strip_ansi(&String::from_utf8_lossy(&stderr_bytes)),
                exit_code: TIMEOUT_EXIT_CODE,
                timed_out: true,
                duration_ms: start.elapsed().as_millis() as u64,
            })
        }
    }
}

/// Read both pipes until EOF, then wait for the exit status. Completion of
/// this future means the streams are closed and the capture is whole.
async fn capture_to_completion(
    child: &mut tokio::process::Child,
    stdout_pipe: &mut tokio::process::ChildStdout,
    stderr_pipe: &mut tokio::process::ChildStderr,
    stdout_bytes: &mut Vec<u8>,
    stderr_bytes: &mut Vec<u8>,
) -> std::io::Result<std::process::ExitStatus> {
    let mut stdout_buf = vec![0u8; 8192];
    let mut stderr_buf = vec![0u8; 8192];
    let mut stdout_open = true;
    let mut stderr_open = true;

    while stdout_open || stderr_open {
        tokio::select! {
            read = stdout_pipe.read(&mut stdout_buf), if stdout_open => {
                match read? {
                    0 => stdout_open = false,
                    n => stdout_bytes.extend_from_slice(&stdout_buf[..n]),
                }
            }
            read = stderr_pipe.read(&mut stderr_buf), if stderr_open => {
                match read? {
                    0 => stderr_open = false,
                    n => stderr_bytes.extend_from_slice(&stderr_buf[..n]),
                }
            }
        }
    }

    child.wait().await
}

/// Best-effort drain of pipe remnants after a kill.
async fn drain_pipes(
    stdout_pipe: &mut tokio::process::ChildStdout,
    stderr_pipe: &mut tokio::process::ChildStderr,
    stdout_bytes: &mut Vec<u8>,
    stderr_bytes: &mut Vec<u8>,
) {
    let _ = stdout_pipe.read_to_end(stdout_bytes).await;
    let _ = stderr_pipe.read_to_end(stderr_bytes).await;
}

/// Remove ANSI escape sequences so parsers see clean text.
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPES.replace_all(text, "").into_owned()
}
