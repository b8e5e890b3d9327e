// crates/mqtt-ingest-core/src/lib.rs
// ============================================================================
// Module: MQTT Ingest Core Library
// Description: Public API surface for the MQTT ingestion core.
// Purpose: Expose message types, capability interfaces, and the supervisor runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! MQTT ingest core owns the resilient ingestion pipeline: the connection
//! lifecycle state machine, its reconnect backoff, the throttled repair
//! trigger, and the delivery of inbound messages to a storage sink. The broker
//! client, the store engine, and the repair action are reached only through the
//! capability traits in [`interfaces`], so every piece can be exercised with
//! in-memory doubles.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::DisconnectCause;
pub use interfaces::MessageSink;
pub use interfaces::RepairError;
pub use interfaces::RepairExecutor;
pub use interfaces::RepairExit;
pub use interfaces::SinkError;
pub use interfaces::Transport;
pub use interfaces::TransportError;
pub use interfaces::TransportEvent;
pub use runtime::ConnectionState;
pub use runtime::ConnectionSupervisor;
pub use runtime::DEFAULT_REPAIR_MIN_INTERVAL;
pub use runtime::ReconnectBackoff;
pub use runtime::RepairOutcome;
pub use runtime::RepairTrigger;
pub use runtime::ShutdownToken;
pub use runtime::SupervisorError;
pub use runtime::SupervisorSettings;
pub use runtime::SupervisorStats;
