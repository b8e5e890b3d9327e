// crates/mqtt-ingest-cli/src/logging.rs
// ============================================================================
// Module: Logging Setup
// Description: Installs the process-wide tracing subscriber.
// Purpose: Emit timestamped, leveled log lines to stderr.
// Dependencies: tracing-subscriber
// ============================================================================

//! ## Overview
//! The filter comes from `RUST_LOG` and defaults to `info`. Set
//! `RUST_LOG=debug` to trace every received message.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "info";

// ============================================================================
// SECTION: Init
// ============================================================================

/// Installs the stderr subscriber.
///
/// # Errors
///
/// Returns the subscriber error text when a global subscriber already exists.
pub fn init() -> Result<(), String> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| err.to_string())
}
