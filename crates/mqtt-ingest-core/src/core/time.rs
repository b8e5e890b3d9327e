// crates/mqtt-ingest-core/src/core/time.rs
// ============================================================================
// Module: MQTT Ingest Time
// Description: Wall-clock capability and epoch helpers.
// Purpose: Let throttling and receipt timestamps run against a swappable clock.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The repair throttle compares wall-clock instants; tests drive it with a
//! manual clock instead of sleeping.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Returns the current wall-clock time.
    fn now(&self) -> SystemTime;
}

/// Clock backed by [`SystemTime::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Converts a wall-clock time into unix epoch seconds.
///
/// Times before the epoch map to zero.
#[must_use]
pub fn unix_seconds(time: SystemTime) -> i64 {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(since_epoch.as_secs()).unwrap_or(i64::MAX)
}
