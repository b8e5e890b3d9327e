// system-tests/tests/shutdown.rs
// ============================================================================
// Module: Shutdown Suite
// Description: Cooperative stop behavior of the running pipeline.
// Purpose: Validate clean exits and that no partial rows are written on stop.
// Dependencies: system-tests helpers
// ============================================================================

//! Shutdown tests for MQTT ingest system-tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers are permitted."
)]

mod helpers;

use std::thread;
use std::time::Duration;
use std::time::Instant;

use mqtt_ingest_core::ConnectionState;
use mqtt_ingest_core::ShutdownToken;
use system_tests::ScriptedBroker;
use system_tests::WhenExhausted;
use system_tests::connack;
use system_tests::fast_settings;
use system_tests::publish;
use system_tests::read_rows;

use helpers::Workspace;
use helpers::noop_repair;
use helpers::pipeline;

#[test]
fn shutdown_while_idle_writes_nothing() {
    let workspace = Workspace::new();
    let shutdown = ShutdownToken::new();
    let broker =
        ScriptedBroker::new(vec![connack(), None, None], &shutdown, WhenExhausted::CancelShutdown);
    let mut supervisor =
        pipeline(broker, workspace.open_store(), noop_repair(), fast_settings("#"));

    let stats = supervisor.run(&shutdown).unwrap();

    assert_eq!(supervisor.state(), ConnectionState::Disconnected);
    assert_eq!(stats.messages_stored, 0);
    assert!(read_rows(&workspace.db_path()).unwrap().is_empty());
}

#[test]
fn cancellation_from_another_thread_stops_the_worker() {
    let workspace = Workspace::new();
    let shutdown = ShutdownToken::new();
    let broker = ScriptedBroker::new(
        vec![connack(), publish("obk/a", b"1")],
        &shutdown,
        WhenExhausted::Idle,
    );
    let mut supervisor =
        pipeline(broker, workspace.open_store(), noop_repair(), fast_settings("#"));
    let worker_token = shutdown.clone();
    let worker = thread::spawn(move || supervisor.run(&worker_token));

    let waited = Instant::now();
    while read_rows(&workspace.db_path()).map(|rows| rows.len()).unwrap_or(0) < 1 {
        assert!(waited.elapsed() < Duration::from_secs(5), "message never stored");
        thread::sleep(Duration::from_millis(5));
    }
    let cancelled_at = Instant::now();
    shutdown.cancel();
    let stats = worker.join().unwrap().unwrap();

    assert!(cancelled_at.elapsed() < Duration::from_secs(2));
    assert_eq!(stats.messages_stored, 1);
    assert_eq!(stats.disconnects, 1);
    assert_eq!(read_rows(&workspace.db_path()).unwrap().len(), 1);
}

#[test]
fn cancellation_before_start_exits_without_connecting() {
    let workspace = Workspace::new();
    let shutdown = ShutdownToken::new();
    shutdown.cancel();
    let broker =
        ScriptedBroker::new(vec![connack()], &shutdown, WhenExhausted::CancelShutdown);
    let mut supervisor =
        pipeline(broker, workspace.open_store(), noop_repair(), fast_settings("#"));

    let stats = supervisor.run(&shutdown).unwrap();
    let (broker, _, _) = supervisor.into_parts();

    assert_eq!(stats.connect_attempts, 0);
    assert_eq!(broker.connect_calls, 0);
    assert!(read_rows(&workspace.db_path()).unwrap().is_empty());
}
