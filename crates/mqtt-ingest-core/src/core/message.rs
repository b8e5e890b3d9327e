// crates/mqtt-ingest-core/src/core/message.rs
// ============================================================================
// Module: MQTT Ingest Messages
// Description: Inbound message and persisted record types.
// Purpose: Carry broker deliveries to the store without transformation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! [`InboundMessage`] is what the transport hands to the supervisor.
//! [`MessageRecord`] is what the store holds once the message is written.
//!
//! Payloads are persisted in a text column. The stored text is the payload up
//! to (not including) its first NUL byte; bytes after an embedded NUL are lost.
//! No UTF-8 rewriting happens on the way in.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Cow;
use std::fmt;

// ============================================================================
// SECTION: Quality of Service
// ============================================================================

/// MQTT delivery quality level as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QualityOfService {
    /// Level 0: fire and forget.
    #[default]
    AtMostOnce,
    /// Level 1: acknowledged delivery.
    AtLeastOnce,
    /// Level 2: assured delivery.
    ExactlyOnce,
}

impl QualityOfService {
    /// Returns the numeric protocol level (0, 1 or 2).
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }

    /// Parses a numeric protocol level.
    #[must_use]
    pub const fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::AtMostOnce),
            1 => Some(Self::AtLeastOnce),
            2 => Some(Self::ExactlyOnce),
            _ => None,
        }
    }
}

impl fmt::Display for QualityOfService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

// ============================================================================
// SECTION: Inbound Message
// ============================================================================

/// A message delivered by the broker.
///
/// # Invariants
/// - `topic` is the routing key the message arrived under, verbatim.
/// - `payload` holds the raw bytes as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Delivery quality level.
    pub qos: QualityOfService,
    /// True when the broker flagged the message as retained.
    pub retain: bool,
}

impl InboundMessage {
    /// Creates a new inbound message.
    #[must_use]
    pub fn new(
        topic: impl Into<String>,
        payload: impl Into<Vec<u8>>,
        qos: QualityOfService,
        retain: bool,
    ) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos,
            retain,
        }
    }

    /// Returns the bytes persisted in the text payload column.
    ///
    /// The payload is cut at the first NUL byte.
    #[must_use]
    pub fn payload_text_bytes(&self) -> &[u8] {
        self.payload.split(|byte| *byte == 0).next().unwrap_or_default()
    }

    /// Returns a printable rendering of the stored payload text.
    #[must_use]
    pub fn payload_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.payload_text_bytes())
    }
}

// ============================================================================
// SECTION: Message Record
// ============================================================================

/// A persisted message row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    /// Store-assigned sequence identifier (arrival order).
    pub sequence_id: i64,
    /// Local receipt time in unix epoch seconds.
    pub received_at: i64,
    /// Topic the message arrived under.
    pub topic: String,
    /// Stored payload text.
    pub payload: String,
    /// Delivery quality level.
    pub qos: QualityOfService,
    /// Retained flag.
    pub retain: bool,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
