// crates/mqtt-ingest-core/src/core/mod.rs
// ============================================================================
// Module: MQTT Ingest Core Types
// Description: Message and time primitives shared across the workspace.
// Purpose: Group the data model used by transports, sinks, and the supervisor.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Core types describe inbound messages, persisted message records, and the
//! wall-clock capability used for receipt and throttle timestamps.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod message;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use message::InboundMessage;
pub use message::MessageRecord;
pub use message::QualityOfService;
pub use time::Clock;
pub use time::SystemClock;
pub use time::unix_seconds;
