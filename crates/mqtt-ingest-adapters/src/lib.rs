// crates/mqtt-ingest-adapters/src/lib.rs
// ============================================================================
// Module: MQTT Ingest Adapters
// Description: Production transport and repair implementations.
// Purpose: Bind the core capability traits to rumqttc and the system shell.
// Dependencies: mqtt-ingest-core, rumqttc
// ============================================================================

//! ## Overview
//! Ready-made implementations of the core [`Transport`] and
//! [`RepairExecutor`] capabilities:
//! - [`MqttTransport`] speaks MQTT 3.1.1 through rumqttc.
//! - [`ShellRepairExecutor`] runs the network repair command through `sh -c`.
//!
//! [`Transport`]: mqtt_ingest_core::Transport
//! [`RepairExecutor`]: mqtt_ingest_core::RepairExecutor

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod repair;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use repair::ShellRepairExecutor;
pub use transport::DEFAULT_CONNECT_TIMEOUT;
pub use transport::DEFAULT_KEEP_ALIVE;
pub use transport::MIN_KEEP_ALIVE;
pub use transport::MqttSessionConfig;
pub use transport::MqttTransport;
