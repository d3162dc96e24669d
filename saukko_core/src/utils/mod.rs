//! # Utility Modules
//!
//! Container for cross-cutting functionality used throughout the crate.
//!
//! ## Sub-modules
//!
//! - **`logging`**: Initialization and configuration of the `tracing`-based
//!   logging infrastructure.

pub mod logging;
