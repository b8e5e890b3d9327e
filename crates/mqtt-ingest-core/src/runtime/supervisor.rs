// crates/mqtt-ingest-core/src/runtime/supervisor.rs
// ============================================================================
// Module: Connection Supervisor
// Description: Broker session lifecycle state machine with reconnect and repair.
// Purpose: Keep one subscribed session alive and write every message to the sink.
// Dependencies: crate::{core, interfaces, runtime}, thiserror, tracing
// ============================================================================

//! ## Overview
//! The supervisor loops through
//! `Disconnected -> Connecting -> Connected -> Disconnected` until shutdown.
//!
//! - On handshake it resets the backoff and issues one QoS 0 subscribe for the
//!   configured filter. A failed subscribe leaves the session connected but
//!   unsubscribed.
//! - On every disconnect or failed attempt it runs the repair trigger, then
//!   waits the current backoff delay before the next attempt.
//! - Every inbound message is written to the sink exactly once, in delivery
//!   order, on the calling thread. Write failures drop the message and are
//!   logged.
//! - Once the shutdown token is cancelled it requests a transport disconnect
//!   and returns when the transport reports the session end or the grace
//!   period expires.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;
use std::time::Instant;

use thiserror::Error;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::core::InboundMessage;
use crate::core::QualityOfService;
use crate::interfaces::DisconnectCause;
use crate::interfaces::MessageSink;
use crate::interfaces::Transport;
use crate::interfaces::TransportError;
use crate::interfaces::TransportEvent;
use crate::runtime::backoff::ReconnectBackoff;
use crate::runtime::repair::RepairOutcome;
use crate::runtime::repair::RepairTrigger;
use crate::runtime::shutdown::ShutdownToken;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default lower reconnect delay.
const DEFAULT_RECONNECT_MIN: Duration = Duration::from_secs(2);
/// Default upper reconnect delay.
const DEFAULT_RECONNECT_MAX: Duration = Duration::from_secs(60);
/// Default bound on a single transport poll.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Default wait for the transport to confirm a shutdown disconnect.
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
/// Subscription quality level.
const SUBSCRIBE_QOS: QualityOfService = QualityOfService::AtMostOnce;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Supervisor tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// Topic filter subscribed on every new session.
    pub topic_filter: String,
    /// Lower bound of the reconnect delay.
    pub reconnect_min: Duration,
    /// Upper bound of the reconnect delay.
    pub reconnect_max: Duration,
    /// Upper bound on a single blocking transport poll.
    pub poll_interval: Duration,
    /// How long shutdown waits for the transport to confirm the disconnect.
    pub shutdown_grace: Duration,
}

impl SupervisorSettings {
    /// Creates settings for `topic_filter` with default timings.
    #[must_use]
    pub fn new(topic_filter: impl Into<String>) -> Self {
        Self {
            topic_filter: topic_filter.into(),
            reconnect_min: DEFAULT_RECONNECT_MIN,
            reconnect_max: DEFAULT_RECONNECT_MAX,
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

// ============================================================================
// SECTION: State and Stats
// ============================================================================

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session and no attempt in flight.
    Disconnected,
    /// An attempt was started; waiting for the handshake.
    Connecting,
    /// A session is established.
    Connected {
        /// True when the topic subscribe request was issued successfully.
        subscribed: bool,
    },
}

/// Counters accumulated over a supervisor run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    /// Connection attempts started.
    pub connect_attempts: u64,
    /// Successful handshakes.
    pub connects: u64,
    /// Failed attempts.
    pub connect_failures: u64,
    /// Ended sessions.
    pub disconnects: u64,
    /// Subscribe requests issued.
    pub subscribe_requests: u64,
    /// Subscribe requests that failed.
    pub subscribe_failures: u64,
    /// Messages received from the transport.
    pub messages_received: u64,
    /// Messages written to the sink.
    pub messages_stored: u64,
    /// Messages dropped because the write failed.
    pub insert_failures: u64,
    /// Repair actions started.
    pub repair_runs: u64,
    /// Repair triggers skipped by the throttle.
    pub repair_throttled: u64,
}

/// Fatal supervisor errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    /// The transport can no longer deliver events.
    #[error("transport closed: {0}")]
    TransportClosed(String),
}

// ============================================================================
// SECTION: Supervisor
// ============================================================================

/// Owns the broker session, the sink, and the repair trigger.
pub struct ConnectionSupervisor<T, S> {
    /// Broker transport.
    transport: T,
    /// Message destination.
    sink: S,
    /// Throttled repair action.
    repair: RepairTrigger,
    /// Tuning.
    settings: SupervisorSettings,
    /// Reconnect delay state.
    backoff: ReconnectBackoff,
    /// Current lifecycle state.
    state: ConnectionState,
    /// Run counters.
    stats: SupervisorStats,
}

impl<T: Transport, S: MessageSink> ConnectionSupervisor<T, S> {
    /// Creates a supervisor in the `Disconnected` state.
    #[must_use]
    pub fn new(transport: T, sink: S, repair: RepairTrigger, settings: SupervisorSettings) -> Self {
        let backoff = ReconnectBackoff::new(settings.reconnect_min, settings.reconnect_max);
        Self {
            transport,
            sink,
            repair,
            settings,
            backoff,
            state: ConnectionState::Disconnected,
            stats: SupervisorStats::default(),
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the counters accumulated so far.
    #[must_use]
    pub const fn stats(&self) -> SupervisorStats {
        self.stats
    }

    /// Returns the reconnect backoff state.
    #[must_use]
    pub const fn backoff(&self) -> &ReconnectBackoff {
        &self.backoff
    }

    /// Consumes the supervisor and returns its collaborators.
    #[must_use]
    pub fn into_parts(self) -> (T, S, RepairTrigger) {
        (self.transport, self.sink, self.repair)
    }

    /// Runs the session loop until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::TransportClosed`] when the transport can no
    /// longer deliver events.
    pub fn run(&mut self, shutdown: &ShutdownToken) -> Result<SupervisorStats, SupervisorError> {
        info!(topic = %self.settings.topic_filter, "connection supervisor started");
        let mut stop_deadline: Option<Instant> = None;
        loop {
            if shutdown.is_cancelled() && stop_deadline.is_none() {
                if self.state == ConnectionState::Disconnected {
                    info!("shutdown requested while disconnected");
                    break;
                }
                self.request_disconnect();
                let now = Instant::now();
                stop_deadline =
                    Some(now.checked_add(self.settings.shutdown_grace).unwrap_or(now));
            }
            if let Some(deadline) = stop_deadline
                && Instant::now() >= deadline
            {
                warn!("transport did not confirm disconnect within the grace period");
                break;
            }

            if self.state == ConnectionState::Disconnected {
                if self.begin_connect() {
                    continue;
                }
                self.wait_backoff(shutdown);
                continue;
            }

            let event = match self.transport.poll(self.settings.poll_interval) {
                Ok(event) => event,
                Err(TransportError::Closed(reason)) => {
                    error!(error = %reason, "transport closed; supervisor stopping");
                    return Err(SupervisorError::TransportClosed(reason));
                }
                Err(err) => {
                    warn!(error = %err, "transport poll failed");
                    None
                }
            };
            let Some(event) = event else {
                continue;
            };
            let stopping = stop_deadline.is_some();
            match event {
                TransportEvent::Connected => self.on_connected(stopping),
                TransportEvent::Message(message) => self.on_message(&message),
                TransportEvent::ConnectFailed(reason) => {
                    self.on_connect_failed(&reason);
                    if stopping {
                        break;
                    }
                    self.wait_backoff(shutdown);
                }
                TransportEvent::Disconnected(cause) => {
                    self.on_disconnected(&cause);
                    if stopping {
                        break;
                    }
                    self.wait_backoff(shutdown);
                }
            }
        }
        self.state = ConnectionState::Disconnected;
        info!(
            messages_stored = self.stats.messages_stored,
            insert_failures = self.stats.insert_failures,
            disconnects = self.stats.disconnects,
            "connection supervisor stopped"
        );
        Ok(self.stats)
    }

    /// Starts a connection attempt. Returns false when it failed immediately.
    fn begin_connect(&mut self) -> bool {
        self.stats.connect_attempts += 1;
        self.state = ConnectionState::Connecting;
        debug!("connecting to broker");
        match self.transport.connect() {
            Ok(()) => true,
            Err(err) => {
                self.on_connect_failed(&err.to_string());
                false
            }
        }
    }

    /// Handles a completed handshake.
    fn on_connected(&mut self, stopping: bool) {
        self.stats.connects += 1;
        self.backoff.reset();
        self.state = ConnectionState::Connected {
            subscribed: false,
        };
        info!("connected to broker");
        if stopping {
            return;
        }
        self.stats.subscribe_requests += 1;
        match self.transport.subscribe(&self.settings.topic_filter, SUBSCRIBE_QOS) {
            Ok(()) => {
                self.state = ConnectionState::Connected {
                    subscribed: true,
                };
                info!(topic = %self.settings.topic_filter, "subscribed");
            }
            Err(err) => {
                self.stats.subscribe_failures += 1;
                error!(
                    topic = %self.settings.topic_filter,
                    error = %err,
                    "subscribe failed; session stays connected without a subscription"
                );
            }
        }
    }

    /// Writes one inbound message to the sink.
    fn on_message(&mut self, message: &InboundMessage) {
        self.stats.messages_received += 1;
        debug!(topic = %message.topic, payload = %message.payload_lossy(), "message received");
        match self.sink.insert(message) {
            Ok(sequence_id) => {
                self.stats.messages_stored += 1;
                debug!(sequence_id, "message stored");
            }
            Err(err) => {
                self.stats.insert_failures += 1;
                error!(
                    topic = %message.topic,
                    error = %err,
                    "message insert failed; message dropped"
                );
            }
        }
    }

    /// Handles a failed connection attempt.
    fn on_connect_failed(&mut self, reason: &str) {
        self.stats.connect_failures += 1;
        self.state = ConnectionState::Disconnected;
        error!(error = %reason, "connect attempt failed");
        self.run_repair();
    }

    /// Handles the end of an established session.
    fn on_disconnected(&mut self, cause: &DisconnectCause) {
        self.stats.disconnects += 1;
        self.state = ConnectionState::Disconnected;
        warn!(cause = %cause, "disconnected; attempting repair and reconnect");
        self.run_repair();
    }

    /// Runs the throttled repair trigger and records the outcome.
    fn run_repair(&mut self) {
        match self.repair.trigger_repair() {
            RepairOutcome::Throttled => self.stats.repair_throttled += 1,
            RepairOutcome::Completed(_) | RepairOutcome::LaunchFailed(_) => {
                self.stats.repair_runs += 1;
            }
        }
    }

    /// Sleeps the current backoff delay unless shutdown interrupts it.
    fn wait_backoff(&mut self, shutdown: &ShutdownToken) {
        let delay = self.backoff.next_delay();
        info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "waiting before reconnect"
        );
        if shutdown.wait_timeout(delay) {
            debug!("reconnect wait interrupted by shutdown");
        }
    }

    /// Asks the transport to end the session.
    fn request_disconnect(&mut self) {
        info!("shutdown requested; disconnecting from broker");
        if let Err(err) = self.transport.disconnect() {
            warn!(error = %err, "disconnect request failed");
        }
    }
}
