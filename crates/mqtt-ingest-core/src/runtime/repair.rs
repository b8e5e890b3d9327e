// crates/mqtt-ingest-core/src/runtime/repair.rs
// ============================================================================
// Module: Repair Trigger
// Description: Throttled invocation of the external network repair action.
// Purpose: Run recovery on disconnect without hammering a flapping link.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! Disconnects arrive in bursts while a link flaps, and the repair action may
//! itself bounce the interface. [`RepairTrigger`] therefore runs the action at
//! most once per minimum interval of wall-clock time. Launch failures are
//! logged and swallowed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;

use tracing::error;
use tracing::info;
use tracing::warn;

use crate::core::Clock;
use crate::core::SystemClock;
use crate::interfaces::RepairExecutor;
use crate::interfaces::RepairExit;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default minimum spacing between two repair runs.
pub const DEFAULT_REPAIR_MIN_INTERVAL: Duration = Duration::from_secs(20);

// ============================================================================
// SECTION: Repair Trigger
// ============================================================================

/// Result of a repair trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// The last run was too recent; nothing was executed.
    Throttled,
    /// The action ran to completion.
    Completed(RepairExit),
    /// The action could not be started.
    LaunchFailed(String),
}

/// Throttled repair trigger.
///
/// # Invariants
/// - `last_run` is updated before the executor runs, so a launch failure still
///   counts against the throttle.
/// - A clock that moved backwards since `last_run` is treated as throttled.
pub struct RepairTrigger {
    /// External action.
    executor: Box<dyn RepairExecutor>,
    /// Wall-clock source.
    clock: Arc<dyn Clock>,
    /// Minimum spacing between runs.
    min_interval: Duration,
    /// Time of the last run, if any.
    last_run: Option<SystemTime>,
}

impl RepairTrigger {
    /// Creates a trigger driven by the system clock.
    #[must_use]
    pub fn new(executor: impl RepairExecutor + 'static, min_interval: Duration) -> Self {
        Self::with_clock(executor, Arc::new(SystemClock), min_interval)
    }

    /// Creates a trigger with an explicit clock.
    #[must_use]
    pub fn with_clock(
        executor: impl RepairExecutor + 'static,
        clock: Arc<dyn Clock>,
        min_interval: Duration,
    ) -> Self {
        Self {
            executor: Box::new(executor),
            clock,
            min_interval,
            last_run: None,
        }
    }

    /// Runs the repair action unless it ran within the minimum interval.
    pub fn trigger_repair(&mut self) -> RepairOutcome {
        let now = self.clock.now();
        if let Some(last_run) = self.last_run {
            let due = now
                .duration_since(last_run)
                .is_ok_and(|elapsed| elapsed >= self.min_interval);
            if !due {
                info!(
                    min_interval_secs = self.min_interval.as_secs(),
                    "skipping network repair action (throttled)"
                );
                return RepairOutcome::Throttled;
            }
        }
        self.last_run = Some(now);

        let action = self.executor.describe();
        info!(action = %action, "running network repair action");
        match self.executor.execute() {
            Ok(exit) => {
                if exit.success() {
                    info!(action = %action, status = %exit, "network repair action finished");
                } else {
                    warn!(action = %action, status = %exit, "network repair action finished");
                }
                RepairOutcome::Completed(exit)
            }
            Err(err) => {
                error!(action = %action, error = %err, "network repair action could not run");
                RepairOutcome::LaunchFailed(err.to_string())
            }
        }
    }

    /// Returns the time of the last run.
    #[must_use]
    pub const fn last_run(&self) -> Option<SystemTime> {
        self.last_run
    }

    /// Returns the configured minimum interval.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
