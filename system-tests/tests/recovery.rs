// system-tests/tests/recovery.rs
// ============================================================================
// Module: Recovery Suite
// Description: Link drops, shell repair throttling, and resubscription.
// Purpose: Validate that the pipeline heals itself without losing later messages.
// Dependencies: system-tests helpers
// ============================================================================

//! Recovery tests for MQTT ingest system-tests.

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

use std::time::Duration;

use mqtt_ingest_adapters::ShellRepairExecutor;
use mqtt_ingest_core::QualityOfService;
use mqtt_ingest_core::RepairTrigger;
use mqtt_ingest_core::ShutdownToken;
use mqtt_ingest_core::TransportEvent;
use system_tests::ScriptedBroker;
use system_tests::WhenExhausted;
use system_tests::connack;
use system_tests::drop_link;
use system_tests::fast_settings;
use system_tests::publish;
use system_tests::read_rows;

use helpers::Workspace;
use helpers::pipeline;

fn flapping_link_script() -> Vec<Option<TransportEvent>> {
    vec![
        connack(),
        publish("obk/a", b"1"),
        drop_link("connection reset by peer"),
        connack(),
        publish("obk/b", b"2"),
        drop_link("keep alive timeout"),
        connack(),
        publish("obk/c", b"3"),
    ]
}

#[test]
fn flapping_link_repairs_once_and_resubscribes_each_session() {
    let workspace = Workspace::new();
    let shutdown = ShutdownToken::new();
    let broker =
        ScriptedBroker::new(flapping_link_script(), &shutdown, WhenExhausted::CancelShutdown);
    let repair = workspace.marker_repair(Duration::from_secs(20));
    let mut supervisor =
        pipeline(broker, workspace.open_store(), repair, fast_settings("obk/#"));

    let stats = supervisor.run(&shutdown).unwrap();
    let (broker, _, _) = supervisor.into_parts();

    let topics: Vec<String> =
        read_rows(&workspace.db_path()).unwrap().into_iter().map(|row| row.topic).collect();
    assert_eq!(topics, vec!["obk/a", "obk/b", "obk/c"]);
    assert_eq!(workspace.repair_runs(), 1);
    assert_eq!(stats.repair_runs, 1);
    assert_eq!(stats.disconnects, 3);
    assert_eq!(broker.connect_calls, 3);
    assert_eq!(broker.subscriptions.len(), 3);
    assert!(
        broker
            .subscriptions
            .iter()
            .all(|(filter, qos)| filter == "obk/#" && *qos == QualityOfService::AtMostOnce)
    );
}

#[test]
fn unthrottled_repair_runs_on_every_disconnect() {
    let workspace = Workspace::new();
    let shutdown = ShutdownToken::new();
    let broker =
        ScriptedBroker::new(flapping_link_script(), &shutdown, WhenExhausted::CancelShutdown);
    let repair = workspace.marker_repair(Duration::ZERO);
    let mut supervisor =
        pipeline(broker, workspace.open_store(), repair, fast_settings("obk/#"));

    let stats = supervisor.run(&shutdown).unwrap();

    assert_eq!(workspace.repair_runs(), 3);
    assert_eq!(stats.repair_runs, 3);
    assert_eq!(stats.repair_throttled, 0);
}

#[test]
fn missing_repair_script_does_not_stop_ingestion() {
    let workspace = Workspace::new();
    let shutdown = ShutdownToken::new();
    let broker =
        ScriptedBroker::new(flapping_link_script(), &shutdown, WhenExhausted::CancelShutdown);
    let repair = RepairTrigger::new(
        ShellRepairExecutor::new("./no_such_handle_network_error.sh"),
        Duration::from_secs(20),
    );
    let mut supervisor =
        pipeline(broker, workspace.open_store(), repair, fast_settings("obk/#"));

    let stats = supervisor.run(&shutdown).unwrap();

    assert_eq!(stats.messages_stored, 3);
    assert_eq!(read_rows(&workspace.db_path()).unwrap().len(), 3);
}
