// crates/mqtt-ingest-cli/src/main.rs
// ============================================================================
// Module: MQTT to SQLite Entry Point
// Description: Process orchestrator for the MQTT ingest daemon.
// Purpose: Wire configuration, storage, the worker thread, and shutdown signals.
// Dependencies: clap, mqtt-ingest-{config, core, store-sqlite}, thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! `mqtt-to-sqlite` runs in the foreground until a termination signal:
//! 1. Load and validate configuration.
//! 2. Open the message store; failure exits with status 1.
//! 3. Run the connection supervisor on a worker thread.
//! 4. On SIGINT, SIGTERM, or SIGQUIT cancel the shutdown token and join the
//!    worker. A worker that stops on its own is joined the same way.
//!
//! Exit status is 0 after a clean shutdown and 1 on any fatal error.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub(crate) mod logging;
pub(crate) mod signals;
pub(crate) mod worker;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use mqtt_ingest_config::IngestConfig;
use mqtt_ingest_core::ShutdownToken;
use mqtt_ingest_store_sqlite::SqliteMessageStore;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::error;
use tracing::info;
use tracing::warn;

// ============================================================================
// SECTION: CLI Arguments
// ============================================================================

/// Subscribes to an MQTT broker and stores every message in SQLite.
#[derive(Debug, Parser)]
#[command(name = "mqtt-to-sqlite", version, about)]
struct Cli {
    /// Optional TOML configuration file (overrides `MQTT_INGEST_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for fatal startup and shutdown failures.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Runs the daemon until shutdown.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if let Err(err) = logging::init() {
        let _ = write_stderr_line(&format!("logging setup failed: {err}"));
    }

    let config = IngestConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(format!("configuration error: {err}")))?;
    log_startup(&config);

    let store = SqliteMessageStore::open(config.store.clone())
        .map_err(|err| CliError::new(format!("failed to initialize database: {err}")))?;
    match store.message_count() {
        Ok(count) => info!(rows = count, "message store ready"),
        Err(err) => warn!(error = %err, "could not count stored messages"),
    }

    let shutdown = ShutdownToken::new();
    let (finished_tx, finished_rx) = oneshot::channel();
    let handle = worker::spawn(config, store, shutdown.clone(), finished_tx)
        .map_err(|err| CliError::new(format!("failed to start worker thread: {err}")))?;

    let signal_failure = tokio::select! {
        signal = signals::wait_for_shutdown_signal() => match signal {
            Ok(name) => {
                info!(signal = name, "shutdown signal received");
                None
            }
            Err(err) => {
                error!(error = %err, "signal handler setup failed; shutting down");
                Some(err.to_string())
            }
        },
        _ = finished_rx => None,
    };
    shutdown.cancel();

    let outcome = handle
        .join()
        .map_err(|_| CliError::new("worker thread panicked".to_string()))?;
    let stats = outcome.map_err(|err| CliError::new(err.to_string()))?;
    info!(
        messages_stored = stats.messages_stored,
        insert_failures = stats.insert_failures,
        reconnects = stats.connects,
        "shutdown complete"
    );
    match signal_failure {
        Some(message) => Err(CliError::new(format!("signal handling failed: {message}"))),
        None => Ok(ExitCode::SUCCESS),
    }
}

/// Logs the effective settings.
fn log_startup(config: &IngestConfig) {
    info!(
        broker = %config.broker.host,
        port = config.broker.port,
        client_id = %config.broker.client_id,
        topic = %config.broker.topic,
        db = %config.store.path.display(),
        repair = %config.repair.command,
        "starting mqtt-to-sqlite"
    );
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
