// crates/mqtt-ingest-core/src/runtime/shutdown.rs
// ============================================================================
// Module: Shutdown Token
// Description: Cooperative cancellation flag shared with the signal handler.
// Purpose: Stop the supervisor loop and wake it from backoff sleeps.
// Dependencies: std
// ============================================================================

//! ## Overview
//! [`ShutdownToken`] is cloned into the signal-handling side and passed by
//! reference into the supervisor run loop. Cancellation is one-way.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

// ============================================================================
// SECTION: Shutdown Token
// ============================================================================

/// Shared cancellation state.
#[derive(Debug, Default)]
struct ShutdownState {
    /// True once shutdown has been requested.
    cancelled: Mutex<bool>,
    /// Wakes waiters when `cancelled` flips.
    signal: Condvar,
}

/// Cloneable cancellation token.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    /// Shared state across clones.
    inner: Arc<ShutdownState>,
}

impl ShutdownToken {
    /// Creates an uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown and wakes every waiter.
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        drop(cancelled);
        self.inner.signal.notify_all();
    }

    /// Returns true once shutdown has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for up to `timeout`, returning early on cancellation.
    ///
    /// Returns true when the token is cancelled.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let cancelled = self.inner.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        let (cancelled, _) = self
            .inner
            .signal
            .wait_timeout_while(cancelled, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
