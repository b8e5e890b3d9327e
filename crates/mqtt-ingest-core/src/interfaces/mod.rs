// crates/mqtt-ingest-core/src/interfaces/mod.rs
// ============================================================================
// Module: MQTT Ingest Interfaces
// Description: Capability interfaces for the broker transport, storage, and repair.
// Purpose: Define the contract surfaces the supervisor is driven through.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the ingestion core reaches external systems without
//! embedding client-library details. The supervisor owns one of each and drives
//! them from a single thread, so none of the traits require internal locking.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::core::InboundMessage;
use crate::core::QualityOfService;

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectCause {
    /// The local side asked for the disconnect (shutdown).
    LocalRequest,
    /// The peer closed the session or the network failed.
    Remote(String),
}

impl fmt::Display for DisconnectCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalRequest => f.write_str("local disconnect requested"),
            Self::Remote(reason) => write!(f, "{reason}"),
        }
    }
}

/// Connection-state and message events reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The broker accepted the session handshake.
    Connected,
    /// A connection attempt failed before the handshake completed.
    ConnectFailed(String),
    /// An established session ended.
    Disconnected(DisconnectCause),
    /// A message arrived on a subscribed topic.
    Message(InboundMessage),
}

/// Transport errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The session object could not be created.
    #[error("transport session setup failed: {0}")]
    Session(String),
    /// A connect request was rejected before reaching the broker.
    #[error("transport connect failed: {0}")]
    Connect(String),
    /// A subscribe request could not be issued.
    #[error("transport subscribe failed: {0}")]
    Subscribe(String),
    /// A disconnect request could not be issued.
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
    /// The transport can no longer deliver events.
    #[error("transport closed: {0}")]
    Closed(String),
}

/// Broker transport driven by the connection supervisor.
///
/// # Invariants
/// - `poll` blocks for at most `timeout` and returns `Ok(None)` when nothing
///   happened.
/// - `poll` returns [`TransportError::Closed`] only when no further events can
///   ever be delivered.
pub trait Transport {
    /// Starts a new session attempt. The outcome arrives later through `poll`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the attempt cannot be started.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Requests a subscription on the current session.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request cannot be issued.
    fn subscribe(&mut self, filter: &str, qos: QualityOfService) -> Result<(), TransportError>;

    /// Requests an orderly disconnect of the current session.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request cannot be issued.
    fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Waits up to `timeout` for the next event.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] when the transport is permanently gone.
    fn poll(&mut self, timeout: Duration) -> Result<Option<TransportEvent>, TransportError>;
}

// ============================================================================
// SECTION: Message Sink
// ============================================================================

/// Message sink errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The write was rejected or failed.
    #[error("message write failed: {0}")]
    Write(String),
}

/// Destination for inbound messages.
pub trait MessageSink {
    /// Persists one message and returns its sequence identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the message could not be written.
    fn insert(&mut self, message: &InboundMessage) -> Result<i64, SinkError>;
}

// ============================================================================
// SECTION: Repair Executor
// ============================================================================

/// Exit information from a completed repair action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairExit {
    /// Process exit code, absent when the action was terminated by a signal.
    pub code: Option<i32>,
}

impl RepairExit {
    /// Returns true when the action exited with code zero.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self.code, Some(0))
    }
}

impl fmt::Display for RepairExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// Repair action errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepairError {
    /// The action could not be started.
    #[error("repair action launch failed: {0}")]
    Launch(String),
}

/// External recovery action run when the broker connection drops.
pub trait RepairExecutor: Send {
    /// Short description used in log lines.
    fn describe(&self) -> String;

    /// Runs the action to completion.
    ///
    /// # Errors
    ///
    /// Returns [`RepairError::Launch`] when the action could not be started.
    fn execute(&mut self) -> Result<RepairExit, RepairError>;
}
