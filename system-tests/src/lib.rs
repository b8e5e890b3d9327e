// system-tests/src/lib.rs
// ============================================================================
// Module: MQTT Ingest System Tests Library
// Description: Shared broker stand-in and database probes for pipeline tests.
// Purpose: Drive the full supervisor and store stack without a live broker.
// Dependencies: mqtt-ingest-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate hosts the shared fixtures used by the system-test binaries in
//! `system-tests/tests`. [`ScriptedBroker`] replays a fixed session script
//! through the [`Transport`] interface; [`StoredRow`] reads back what the
//! real `SQLite` store persisted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use mqtt_ingest_core::DisconnectCause;
use mqtt_ingest_core::InboundMessage;
use mqtt_ingest_core::QualityOfService;
use mqtt_ingest_core::ShutdownToken;
use mqtt_ingest_core::SupervisorSettings;
use mqtt_ingest_core::Transport;
use mqtt_ingest_core::TransportError;
use mqtt_ingest_core::TransportEvent;
use rusqlite::Connection;
use rusqlite::params;

// ============================================================================
// SECTION: Scripted Broker
// ============================================================================

/// What the broker does once its script is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhenExhausted {
    /// Cancel the given shutdown token, then idle.
    CancelShutdown,
    /// Idle for one poll interval per call until cancelled externally.
    Idle,
}

/// Broker stand-in that replays a session script.
///
/// # Invariants
/// - A disconnect request is confirmed by the next poll.
/// - Every subscribe is recorded in call order.
pub struct ScriptedBroker {
    /// Remaining events.
    script: VecDeque<Option<TransportEvent>>,
    /// Token cancelled when the script runs dry.
    shutdown: ShutdownToken,
    /// Exhaustion behavior.
    exhausted: WhenExhausted,
    /// Pending local disconnect confirmation.
    disconnect_requested: bool,
    /// Number of connect calls.
    pub connect_calls: usize,
    /// Recorded subscriptions.
    pub subscriptions: Vec<(String, QualityOfService)>,
}

impl ScriptedBroker {
    /// Creates a broker that replays `script`; `None` entries are idle polls.
    #[must_use]
    pub fn new(
        script: Vec<Option<TransportEvent>>,
        shutdown: &ShutdownToken,
        exhausted: WhenExhausted,
    ) -> Self {
        Self {
            script: script.into(),
            shutdown: shutdown.clone(),
            exhausted,
            disconnect_requested: false,
            connect_calls: 0,
            subscriptions: Vec::new(),
        }
    }
}

impl Transport for ScriptedBroker {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.connect_calls += 1;
        Ok(())
    }

    fn subscribe(&mut self, filter: &str, qos: QualityOfService) -> Result<(), TransportError> {
        self.subscriptions.push((filter.to_string(), qos));
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.disconnect_requested = true;
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> Result<Option<TransportEvent>, TransportError> {
        if self.disconnect_requested {
            self.disconnect_requested = false;
            return Ok(Some(TransportEvent::Disconnected(DisconnectCause::LocalRequest)));
        }
        if let Some(event) = self.script.pop_front() {
            return Ok(event);
        }
        match self.exhausted {
            WhenExhausted::CancelShutdown => self.shutdown.cancel(),
            WhenExhausted::Idle => std::thread::sleep(timeout),
        }
        Ok(None)
    }
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Builds a QoS 0 message event.
#[must_use]
pub fn publish(topic: &str, payload: &[u8]) -> Option<TransportEvent> {
    Some(TransportEvent::Message(InboundMessage::new(
        topic,
        payload.to_vec(),
        QualityOfService::AtMostOnce,
        false,
    )))
}

/// Builds a handshake event.
#[must_use]
pub const fn connack() -> Option<TransportEvent> {
    Some(TransportEvent::Connected)
}

/// Builds a broker-side drop event.
#[must_use]
pub fn drop_link(reason: &str) -> Option<TransportEvent> {
    Some(TransportEvent::Disconnected(DisconnectCause::Remote(reason.to_string())))
}

/// Supervisor settings with millisecond timings.
#[must_use]
pub fn fast_settings(topic: &str) -> SupervisorSettings {
    SupervisorSettings {
        topic_filter: topic.to_string(),
        reconnect_min: Duration::from_millis(1),
        reconnect_max: Duration::from_millis(8),
        poll_interval: Duration::from_millis(2),
        shutdown_grace: Duration::from_millis(200),
    }
}

// ============================================================================
// SECTION: Database Probes
// ============================================================================

/// One persisted row read back through an independent connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    /// `id` column.
    pub id: i64,
    /// `ts` column.
    pub ts: i64,
    /// `topic` column.
    pub topic: String,
    /// `payload` column.
    pub payload: String,
    /// `qos` column.
    pub qos: i64,
    /// `retain` column.
    pub retain: i64,
}

/// Reads every row of the `messages` table in id order.
///
/// # Errors
///
/// Returns the `SQLite` error when the database cannot be read.
pub fn read_rows(path: &Path) -> rusqlite::Result<Vec<StoredRow>> {
    let connection = Connection::open(path)?;
    let mut statement = connection
        .prepare("SELECT id, ts, topic, payload, qos, retain FROM messages ORDER BY id")?;
    let rows = statement.query_map(params![], |row| {
        Ok(StoredRow {
            id: row.get(0)?,
            ts: row.get(1)?,
            topic: row.get(2)?,
            payload: row.get(3)?,
            qos: row.get(4)?,
            retain: row.get(5)?,
        })
    })?;
    rows.collect()
}
