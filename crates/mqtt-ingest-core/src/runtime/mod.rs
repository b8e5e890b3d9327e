// crates/mqtt-ingest-core/src/runtime/mod.rs
// ============================================================================
// Module: MQTT Ingest Runtime
// Description: Connection supervisor, reconnect backoff, repair throttle, shutdown.
// Purpose: Keep one broker session alive indefinitely and feed the store.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! The runtime is single-threaded by construction: the supervisor owns the
//! transport, the sink, and the repair trigger, and runs every callback on the
//! thread that calls [`ConnectionSupervisor::run`]. The only cross-thread
//! handle is the [`ShutdownToken`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod backoff;
pub mod repair;
pub mod shutdown;
pub mod supervisor;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backoff::ReconnectBackoff;
pub use repair::DEFAULT_REPAIR_MIN_INTERVAL;
pub use repair::RepairOutcome;
pub use repair::RepairTrigger;
pub use shutdown::ShutdownToken;
pub use supervisor::ConnectionState;
pub use supervisor::ConnectionSupervisor;
pub use supervisor::SupervisorError;
pub use supervisor::SupervisorSettings;
pub use supervisor::SupervisorStats;
