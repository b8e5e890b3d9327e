// crates/mqtt-ingest-core/tests/common/mod.rs
// =============================================================================
// Module: Core Test Doubles
// Description: Scripted transport, recording sink, recording repair, manual clock.
// Purpose: Drive the supervisor deterministically without a broker or database.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::SystemTime;

use mqtt_ingest_core::Clock;
use mqtt_ingest_core::DisconnectCause;
use mqtt_ingest_core::InboundMessage;
use mqtt_ingest_core::MessageSink;
use mqtt_ingest_core::QualityOfService;
use mqtt_ingest_core::RepairError;
use mqtt_ingest_core::RepairExecutor;
use mqtt_ingest_core::RepairExit;
use mqtt_ingest_core::ShutdownToken;
use mqtt_ingest_core::SinkError;
use mqtt_ingest_core::SupervisorSettings;
use mqtt_ingest_core::Transport;
use mqtt_ingest_core::TransportError;
use mqtt_ingest_core::TransportEvent;

// =============================================================================
// Manual Clock
// =============================================================================

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    pub fn rewind(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now -= by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap()
    }
}

// =============================================================================
// Recording Repair Executor
// =============================================================================

/// Repair executor that counts runs instead of spawning processes.
#[derive(Clone)]
pub struct RecordingRepair {
    runs: Arc<AtomicUsize>,
    fail_launch: bool,
    exit_code: Option<i32>,
}

impl RecordingRepair {
    pub fn new() -> Self {
        Self {
            runs: Arc::new(AtomicUsize::new(0)),
            fail_launch: false,
            exit_code: Some(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::new()
        }
    }

    pub fn with_exit_code(code: Option<i32>) -> Self {
        Self {
            exit_code: code,
            ..Self::new()
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl RepairExecutor for RecordingRepair {
    fn describe(&self) -> String {
        "recording repair".to_string()
    }

    fn execute(&mut self) -> Result<RepairExit, RepairError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch {
            return Err(RepairError::Launch("no such file".to_string()));
        }
        Ok(RepairExit {
            code: self.exit_code,
        })
    }
}

// =============================================================================
// Recording Sink
// =============================================================================

/// Sink that keeps messages in memory and can reject chosen writes.
#[derive(Default)]
pub struct RecordingSink {
    pub messages: Vec<(i64, InboundMessage)>,
    fail_calls: HashSet<usize>,
    calls: usize,
    next_id: i64,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the writes with the given zero-based call indexes.
    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            fail_calls: calls.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn topics(&self) -> Vec<&str> {
        self.messages.iter().map(|(_, message)| message.topic.as_str()).collect()
    }
}

impl MessageSink for RecordingSink {
    fn insert(&mut self, message: &InboundMessage) -> Result<i64, SinkError> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_calls.contains(&call) {
            return Err(SinkError::Write("disk I/O error".to_string()));
        }
        self.next_id += 1;
        self.messages.push((self.next_id, message.clone()));
        Ok(self.next_id)
    }
}

// =============================================================================
// Scripted Transport
// =============================================================================

/// One scripted poll result.
pub enum Step {
    /// Deliver an event.
    Event(TransportEvent),
    /// Return no event.
    Idle,
    /// Advance the shared clock, then return no event.
    Advance(Duration),
    /// Report the transport as permanently closed.
    Close,
}

/// Transport that replays a script and cancels shutdown once it runs dry.
pub struct ScriptedTransport {
    script: VecDeque<Step>,
    shutdown: ShutdownToken,
    clock: Option<Arc<ManualClock>>,
    connect_results: VecDeque<Result<(), TransportError>>,
    subscribe_results: VecDeque<Result<(), TransportError>>,
    confirm_disconnect: bool,
    pub connect_calls: usize,
    pub disconnect_calls: usize,
    pub subscriptions: Vec<(String, QualityOfService)>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Step>, shutdown: &ShutdownToken) -> Self {
        Self {
            script: script.into(),
            shutdown: shutdown.clone(),
            clock: None,
            connect_results: VecDeque::new(),
            subscribe_results: VecDeque::new(),
            confirm_disconnect: true,
            connect_calls: 0,
            disconnect_calls: 0,
            subscriptions: Vec::new(),
        }
    }

    pub fn with_clock(mut self, clock: &Arc<ManualClock>) -> Self {
        self.clock = Some(Arc::clone(clock));
        self
    }

    pub fn with_connect_results(mut self, results: Vec<Result<(), TransportError>>) -> Self {
        self.connect_results = results.into();
        self
    }

    pub fn with_subscribe_results(mut self, results: Vec<Result<(), TransportError>>) -> Self {
        self.subscribe_results = results.into();
        self
    }

    pub fn never_confirming_disconnect(mut self) -> Self {
        self.confirm_disconnect = false;
        self
    }
}

impl Transport for ScriptedTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.connect_calls += 1;
        self.connect_results.pop_front().unwrap_or(Ok(()))
    }

    fn subscribe(&mut self, filter: &str, qos: QualityOfService) -> Result<(), TransportError> {
        self.subscriptions.push((filter.to_string(), qos));
        self.subscribe_results.pop_front().unwrap_or(Ok(()))
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.disconnect_calls += 1;
        if self.confirm_disconnect {
            self.script.push_front(Step::Event(TransportEvent::Disconnected(
                DisconnectCause::LocalRequest,
            )));
        }
        Ok(())
    }

    fn poll(&mut self, _timeout: Duration) -> Result<Option<TransportEvent>, TransportError> {
        match self.script.pop_front() {
            Some(Step::Event(event)) => Ok(Some(event)),
            Some(Step::Idle) => Ok(None),
            Some(Step::Advance(by)) => {
                if let Some(clock) = &self.clock {
                    clock.advance(by);
                }
                Ok(None)
            }
            Some(Step::Close) => Err(TransportError::Closed("event loop gone".to_string())),
            None => {
                self.shutdown.cancel();
                Ok(None)
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Settings with millisecond timings so tests run fast.
pub fn fast_settings(topic: &str) -> SupervisorSettings {
    SupervisorSettings {
        topic_filter: topic.to_string(),
        reconnect_min: Duration::from_millis(1),
        reconnect_max: Duration::from_millis(4),
        poll_interval: Duration::from_millis(1),
        shutdown_grace: Duration::from_millis(50),
    }
}

pub fn message(topic: &str, payload: &str) -> TransportEvent {
    TransportEvent::Message(InboundMessage::new(
        topic,
        payload.as_bytes().to_vec(),
        QualityOfService::AtMostOnce,
        false,
    ))
}

pub fn remote_drop(reason: &str) -> Step {
    Step::Event(TransportEvent::Disconnected(DisconnectCause::Remote(reason.to_string())))
}
