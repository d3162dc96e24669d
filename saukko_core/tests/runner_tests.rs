//! End-to-end process lifecycle tests for the runner.
//!
//! These spawn real processes, so they are unix-only; the process-shape
//! logic under test is platform independent.

#![cfg(unix)]

use std::time::{Duration, Instant};

use saukko_core::runner::{self, ExecutionRequest, TIMEOUT_EXIT_CODE};
use saukko_core::utils::logging::init_test_logging;

#[tokio::test]
async fn allowlisted_command_runs_and_captures_stdout() {
    init_test_logging();
    let request = ExecutionRequest::new("/bin/sh")
        .arg("-c")
        .arg("echo ok");

    let result = runner::run(&request).await.expect("spawn sh");
    assert_eq!(result.exit_code, 0);
    assert!(!result.timed_out);
    assert_eq!(result.stdout.trim(), "ok");
    assert!(result.success());
}

#[tokio::test]
async fn stderr_is_captured_separately() {
    let request = ExecutionRequest::new("/bin/sh")
        .arg("-c")
        .arg("echo out; echo err >&2");

    let result = runner::run(&request).await.expect("spawn sh");
    assert_eq!(result.stdout.trim(), "out");
    assert_eq!(result.stderr.trim(), "err");
}

#[tokio::test]
async fn nonzero_exit_is_data_not_an_error() {
    let request = ExecutionRequest::new("/bin/sh").arg("-c").arg("exit 3");

    let result = runner::run(&request).await.expect("spawn sh");
    assert_eq!(result.exit_code, 3);
    assert!(!result.timed_out);
    assert!(!result.success());
}

#[tokio::test]
async fn shell_metacharacters_in_argv_stay_inert() {
    // Passed as a single argv element, the metacharacters must come back
    // verbatim instead of being interpreted.
    let request = ExecutionRequest::new("/bin/echo").arg("a; echo injected && echo more");

    let result = runner::run(&request).await.expect("spawn echo");
    assert_eq!(result.stdout.trim(), "a; echo injected && echo more");
}

#[tokio::test]
async fn timeout_reports_sentinel_exit_code_within_bounds() {
    init_test_logging();
    let request = ExecutionRequest::new("/bin/sleep")
        .arg("5")
        .timeout(Duration::from_millis(100));

    let start = Instant::now();
    let result = runner::run(&request).await.expect("spawn sleep");
    let elapsed = start.elapsed();

    assert!(result.timed_out);
    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    // Timeout plus kill grace plus drain, nowhere near the 5s sleep.
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
}

#[tokio::test]
async fn partial_output_survives_a_timeout() {
    let request = ExecutionRequest::new("/bin/sh")
        .arg("-c")
        .arg("echo before; sleep 5; echo after")
        .timeout(Duration::from_millis(300));

    let result = runner::run(&request).await.expect("spawn sh");
    assert!(result.timed_out);
    assert!(result.stdout.contains("before"));
    assert!(!result.stdout.contains("after"));
}

#[tokio::test]
async fn timeout_kills_grandchildren_too() {
    init_test_logging();
    // The shell backgrounds a long sleep and prints its pid, then blocks.
    // After the timeout fires, the whole group including the grandchild
    // sleep must be gone.
    let request = ExecutionRequest::new("/bin/sh")
        .arg("-c")
        .arg("sleep 30 & echo $!; wait")
        .timeout(Duration::from_millis(300));

    let result = runner::run(&request).await.expect("spawn sh");
    assert!(result.timed_out);

    let grandchild: i32 = result
        .stdout
        .trim()
        .parse()
        .expect("grandchild pid on stdout");

    // Signal 0 probes liveness. Allow a moment for the SIGKILL to land and
    // the zombie to be reaped by init.
    let pid = nix::unistd::Pid::from_raw(grandchild);
    let mut gone = false;
    for _ in 0..250 {
        match nix::sys::signal::kill(pid, None) {
            Err(nix::errno::Errno::ESRCH) => {
                gone = true;
                break;
            }
            _ => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
    assert!(gone, "grandchild {grandchild} survived the tree kill");
}

#[tokio::test]
async fn ansi_sequences_are_stripped_from_captured_output() {
    let request = ExecutionRequest::new("/bin/sh")
        .arg("-c")
        .arg(r"printf '\033[1;32mpassed\033[0m\n'");

    let result = runner::run(&request).await.expect("spawn sh");
    assert_eq!(result.stdout.trim(), "passed");
    assert!(!result.stdout.contains('\u{1b}'));
}

#[tokio::test]
async fn missing_binary_is_a_typed_not_found_error() {
    let request = ExecutionRequest::new("/no/such/saukko-binary");
    let err = runner::run(&request).await.unwrap_err();
    assert_eq!(err.error_category(), "NOT_FOUND");
}

#[tokio::test]
async fn working_directory_applies_to_the_child() {
    let temp = tempfile::TempDir::new().expect("tempdir");
    let request = ExecutionRequest::new("/bin/sh")
        .arg("-c")
        .arg("pwd")
        .cwd(temp.path());

    let result = runner::run(&request).await.expect("spawn sh");
    let reported = std::fs::canonicalize(result.stdout.trim()).expect("canonical pwd");
    let expected = std::fs::canonicalize(temp.path()).expect("canonical tempdir");
    assert_eq!(reported, expected);
}

#[tokio::test]
async fn environment_variables_reach_the_child() {
    let request = ExecutionRequest::new("/bin/sh")
        .arg("-c")
        .arg("printf '%s' \"$SAUKKO_PROBE\"")
        .env("SAUKKO_PROBE", "value-42");

    let result = runner::run(&request).await.expect("spawn sh");
    assert_eq!(result.stdout, "value-42");
}
