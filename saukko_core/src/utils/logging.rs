//! # Logging Initialization
//!
//! Centralized setup for the `tracing` subscriber, called once at process
//! start. A `std::sync::Once` guards against repeat initialization when
//! multiple entry points (binary, tests) call in.
//!
//! Verbosity follows `RUST_LOG`; without it, the `log_level` argument
//! applies globally with `debug` for this crate. With `log_to_file = true`
//! logs go to a daily rolling file in the user cache directory (determined
//! by the `directories` crate) with ANSI disabled; otherwise, or whenever
//! the cache directory cannot be determined or created (sandboxed or
//! read-only environments), they go to `stderr` with colors enabled.

use anyhow::Result;
use directories::ProjectDirs;
use std::{io::stderr, sync::Once};
use tracing_subscriber::{EnvFilter, fmt::layer, prelude::*};

static INIT: Once = Once::new();

/// Trace-level stderr logging for tests. Safe to call from every test;
/// only the first call initializes.
pub fn init_test_logging() {
    init_logging("trace", false).expect("Failed to initialize test logging");
}

/// Initializes the logging system.
///
/// Sets up the global tracing subscriber: daily rolling file in the
/// project's cache directory when `log_to_file` is set, stderr otherwise
/// or when the file target is unavailable.
pub fn init_logging(log_level: &str, log_to_file: bool) -> Result<()> {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},saukko_core=debug")));

        // Attempt to log to a file, fall back to stderr.
        if log_to_file {
            if let Some(proj_dirs) = ProjectDirs::from("com", "Saukko", "saukko") {
                let log_dir = proj_dirs.cache_dir();

                // Try to create the log directory first
                let dir_created = std::fs::create_dir_all(log_dir).is_ok();

                // Try to create the file appender, fall back to stderr if it fails
                // Use catch_unwind to handle panics from tracing_appender
                let file_appender_result = if dir_created {
                    std::panic::catch_unwind(|| {
                        tracing_appender::rolling::daily(log_dir, "saukko.log")
                    })
                } else {
                    Err(Box::new("Failed to create log directory") as Box<dyn std::any::Any + Send>)
                };

                match file_appender_result {
                    Ok(file_appender) => {
                        let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

                        tracing_subscriber::registry()
                            .with(env_filter)
                            .with(layer().with_writer(non_blocking).with_ansi(false))
                            .init();
                        // The guard is intentionally leaked to ensure logs are flushed on exit.
                        Box::leak(Box::new(_guard));
                    }
                    Err(_) => {
                        // Fallback to stderr if file appender creation fails or panics.
                        // This handles permission denied, sandboxing issues, etc.
                        tracing_subscriber::registry()
                            .with(env_filter)
                            .with(layer().with_writer(stderr).with_ansi(true))
                            .init();
                    }
                }
            } else {
                // Fallback to stderr if project directory is not available.
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer().with_writer(stderr).with_ansi(true))
                    .init();
            }
        } else {
            // Log to stderr with ANSI colors enabled for terminal output
            tracing_subscriber::registry()
                .with(env_filter)
                .with(layer().with_writer(stderr).with_ansi(true))
                .init();
        }
    });

    Ok(())
}
