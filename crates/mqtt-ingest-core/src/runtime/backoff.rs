// crates/mqtt-ingest-core/src/runtime/backoff.rs
// ============================================================================
// Module: Reconnect Backoff
// Description: Bounded exponential delay between reconnect attempts.
// Purpose: Space out reconnects after failures without ever busy-looping.
// Dependencies: std
// ============================================================================

//! ## Overview
//! [`ReconnectBackoff`] starts at the configured minimum, doubles after every
//! failed attempt, caps at the maximum, and returns to the minimum once a
//! session is established.
//!
//! ```
//! use std::time::Duration;
//!
//! use mqtt_ingest_core::ReconnectBackoff;
//!
//! let mut backoff = ReconnectBackoff::new(Duration::from_secs(2), Duration::from_secs(5));
//! assert_eq!(backoff.next_delay(), Duration::from_secs(2));
//! assert_eq!(backoff.next_delay(), Duration::from_secs(4));
//! assert_eq!(backoff.next_delay(), Duration::from_secs(5));
//! backoff.reset();
//! assert_eq!(backoff.next_delay(), Duration::from_secs(2));
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Smallest delay ever returned; a zero minimum would spin.
const MIN_DELAY_FLOOR: Duration = Duration::from_millis(1);

// ============================================================================
// SECTION: Backoff
// ============================================================================

/// Reconnect delay state.
///
/// # Invariants
/// - `min <= current <= max` at all times.
/// - `min` is never zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectBackoff {
    /// Lower bound and reset value.
    min: Duration,
    /// Upper bound.
    max: Duration,
    /// Delay returned by the next call to [`ReconnectBackoff::next_delay`].
    current: Duration,
}

impl ReconnectBackoff {
    /// Creates a backoff bounded by `min` and `max`.
    ///
    /// A zero `min` is raised to one millisecond and a `max` below `min` is
    /// raised to `min`.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        let min = min.max(MIN_DELAY_FLOOR);
        let max = max.max(min);
        Self {
            min,
            max,
            current: min,
        }
    }

    /// Returns the delay to wait now and doubles the next one, capped at max.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Returns to the minimum delay.
    pub const fn reset(&mut self) {
        self.current = self.min;
    }

    /// Returns the delay the next failure will wait.
    #[must_use]
    pub const fn current(&self) -> Duration {
        self.current
    }

    /// Returns the lower bound.
    #[must_use]
    pub const fn min(&self) -> Duration {
        self.min
    }

    /// Returns the upper bound.
    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }
}
