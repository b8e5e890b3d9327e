// crates/mqtt-ingest-cli/src/worker.rs
// ============================================================================
// Module: Ingest Worker
// Description: Builds the pipeline and runs the supervisor on its own thread.
// Purpose: Keep the blocking receive loop off the signal-handling runtime.
// Dependencies: mqtt-ingest-{adapters, config, core, store-sqlite}, thiserror, tokio
// ============================================================================

//! ## Overview
//! The MQTT connection drives its own internal runtime and must not be polled
//! from inside the async main task, so the transport is built and polled on a
//! dedicated OS thread. The opened store is moved into that thread and owned
//! there exclusively. A oneshot fires when the worker returns for any reason.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;
use std::thread::JoinHandle;

use mqtt_ingest_adapters::MqttTransport;
use mqtt_ingest_adapters::ShellRepairExecutor;
use mqtt_ingest_config::IngestConfig;
use mqtt_ingest_core::ConnectionSupervisor;
use mqtt_ingest_core::RepairTrigger;
use mqtt_ingest_core::ShutdownToken;
use mqtt_ingest_core::SupervisorError;
use mqtt_ingest_core::SupervisorStats;
use mqtt_ingest_core::TransportError;
use mqtt_ingest_store_sqlite::SqliteMessageStore;
use thiserror::Error;
use tokio::sync::oneshot;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Worker thread name.
const WORKER_THREAD_NAME: &str = "mqtt-ingest";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal worker errors.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The broker session object could not be created.
    #[error("mqtt session setup failed: {0}")]
    Session(#[from] TransportError),
    /// The supervisor stopped on a fatal error.
    #[error("connection supervisor failed: {0}")]
    Supervisor(#[from] SupervisorError),
}

// ============================================================================
// SECTION: Worker
// ============================================================================

/// Builds the transport and repair trigger, then runs the supervisor to completion.
///
/// # Errors
///
/// Returns [`WorkerError`] when the session cannot be created or the
/// supervisor fails fatally.
pub fn run_pipeline(
    config: &IngestConfig,
    store: SqliteMessageStore,
    shutdown: &ShutdownToken,
) -> Result<SupervisorStats, WorkerError> {
    let transport = MqttTransport::new(&config.session_config())?;
    let executor = ShellRepairExecutor::new(config.repair.command.clone());
    let repair = RepairTrigger::new(executor, config.repair_min_interval());
    let mut supervisor =
        ConnectionSupervisor::new(transport, store, repair, config.supervisor_settings());
    Ok(supervisor.run(shutdown)?)
}

/// Spawns the worker thread.
///
/// # Errors
///
/// Returns the OS error when the thread cannot be spawned.
pub fn spawn(
    config: IngestConfig,
    store: SqliteMessageStore,
    shutdown: ShutdownToken,
    finished: oneshot::Sender<()>,
) -> std::io::Result<JoinHandle<Result<SupervisorStats, WorkerError>>> {
    thread::Builder::new().name(WORKER_THREAD_NAME.to_string()).spawn(move || {
        let result = run_pipeline(&config, store, &shutdown);
        let _ = finished.send(());
        result
    })
}
