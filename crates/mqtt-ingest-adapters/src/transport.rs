// crates/mqtt-ingest-adapters/src/transport.rs
// ============================================================================
// Module: MQTT Transport
// Description: Broker transport built on the rumqttc blocking client.
// Purpose: Translate rumqttc events into supervisor transport events.
// Dependencies: mqtt-ingest-core, rumqttc, tracing
// ============================================================================

//! ## Overview
//! [`MqttTransport`] wraps a rumqttc [`Client`] and its [`Connection`]. The
//! connection owns its own single-threaded runtime, so the transport must be
//! created and polled from a plain thread, never from inside an async task.
//!
//! rumqttc connects lazily: the first poll after a failure opens a new
//! network session. [`Transport::connect`] therefore only marks the start of
//! an attempt; the handshake outcome arrives through [`Transport::poll`].
//! Each bounded poll drops rumqttc's in-flight connect, so its own connection
//! timeout never fires. The transport keeps an attempt deadline instead and
//! reports `ConnectFailed` once it passes without a CONNACK.
//!
//! Requests are queued with the non-blocking `try_*` calls because the same
//! thread drains the event loop.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;
use std::time::Instant;

use mqtt_ingest_core::DisconnectCause;
use mqtt_ingest_core::InboundMessage;
use mqtt_ingest_core::QualityOfService;
use mqtt_ingest_core::Transport;
use mqtt_ingest_core::TransportError;
use mqtt_ingest_core::TransportEvent;
use rumqttc::Client;
use rumqttc::ConnectReturnCode;
use rumqttc::Connection;
use rumqttc::ConnectionError;
use rumqttc::Event;
use rumqttc::MqttOptions;
use rumqttc::Outgoing;
use rumqttc::Packet;
use rumqttc::QoS;
use rumqttc::RecvTimeoutError;
use rumqttc::SubscribeReasonCode;
use tracing::debug;
use tracing::error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Smallest keep-alive interval accepted.
pub const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);
/// Default keep-alive interval.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);
/// Default time allowed for the network connect and CONNACK.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default bound on queued client requests.
const DEFAULT_REQUEST_CAPACITY: usize = 16;

// ============================================================================
// SECTION: Session Config
// ============================================================================

/// Broker session parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttSessionConfig {
    /// Broker host name or address.
    pub host: String,
    /// Broker TCP port.
    pub port: u16,
    /// Client identifier presented to the broker.
    pub client_id: String,
    /// Keep-alive interval.
    pub keep_alive: Duration,
    /// Whether the broker discards session state on connect.
    pub clean_session: bool,
    /// Time allowed from the start of an attempt to a CONNACK.
    pub connect_timeout: Duration,
    /// Bound on client requests queued ahead of the event loop.
    pub request_capacity: usize,
}

impl MqttSessionConfig {
    /// Creates a config with the default keep-alive and a clean session.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: client_id.into(),
            keep_alive: DEFAULT_KEEP_ALIVE,
            clean_session: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_capacity: DEFAULT_REQUEST_CAPACITY,
        }
    }

    /// Checks the values rumqttc would otherwise reject by panicking.
    fn validate(&self) -> Result<(), TransportError> {
        if self.client_id.is_empty() || self.client_id.starts_with(' ') {
            return Err(TransportError::Session(
                "client id must be non-empty and must not start with a space".to_string(),
            ));
        }
        if self.host.trim().is_empty() {
            return Err(TransportError::Session("broker host must not be empty".to_string()));
        }
        if self.keep_alive < MIN_KEEP_ALIVE {
            return Err(TransportError::Session(format!(
                "keep alive must be at least {} seconds",
                MIN_KEEP_ALIVE.as_secs()
            )));
        }
        if self.connect_timeout.is_zero() {
            return Err(TransportError::Session(
                "connect timeout must be greater than zero".to_string(),
            ));
        }
        if self.request_capacity == 0 {
            return Err(TransportError::Session(
                "request capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// rumqttc-backed broker transport.
pub struct MqttTransport {
    /// Request handle.
    client: Client,
    /// Event loop driver.
    connection: Connection,
    /// Event translation state.
    mapper: EventMapper,
    /// Broker address for logs.
    endpoint: String,
    /// Time allowed for each connection attempt.
    connect_timeout: Duration,
    /// Deadline of the attempt in flight, if any.
    attempt_deadline: Option<Instant>,
}

impl MqttTransport {
    /// Creates the client session object. No network I/O happens here.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Session`] when the session parameters are
    /// invalid.
    pub fn new(config: &MqttSessionConfig) -> Result<Self, TransportError> {
        config.validate()?;
        let mut options =
            MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        options.set_keep_alive(config.keep_alive);
        options.set_clean_session(config.clean_session);
        let (client, connection) = Client::new(options, config.request_capacity);
        Ok(Self {
            client,
            connection,
            mapper: EventMapper::default(),
            endpoint: format!("{}:{}", config.host, config.port),
            connect_timeout: config.connect_timeout,
            attempt_deadline: None,
        })
    }

    /// Fails the attempt in flight once its deadline has passed.
    fn expire_attempt(&mut self) -> Option<TransportEvent> {
        let deadline = self.attempt_deadline?;
        if self.mapper.connected || Instant::now() < deadline {
            return None;
        }
        self.attempt_deadline = None;
        self.connection.eventloop.clean();
        Some(TransportEvent::ConnectFailed(format!(
            "connect to {} timed out after {} ms",
            self.endpoint,
            self.connect_timeout.as_millis()
        )))
    }
}

impl Transport for MqttTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.mapper.connected = false;
        let now = Instant::now();
        self.attempt_deadline = Some(now.checked_add(self.connect_timeout).unwrap_or(now));
        debug!(endpoint = %self.endpoint, "broker connection attempt started");
        Ok(())
    }

    fn subscribe(&mut self, filter: &str, qos: QualityOfService) -> Result<(), TransportError> {
        self.client
            .try_subscribe(filter, to_rumqttc_qos(qos))
            .map_err(|err| TransportError::Subscribe(err.to_string()))
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.client.try_disconnect().map_err(|err| TransportError::Disconnect(err.to_string()))
    }

    fn poll(&mut self, timeout: Duration) -> Result<Option<TransportEvent>, TransportError> {
        if let Some(event) = self.expire_attempt() {
            return Ok(Some(event));
        }
        match self.connection.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => Ok(self.expire_attempt()),
            Err(RecvTimeoutError::Disconnected) | Ok(Err(ConnectionError::RequestsDone)) => {
                Err(TransportError::Closed("mqtt event loop stopped".to_string()))
            }
            Ok(item) => {
                let event = self.mapper.map(item);
                if matches!(
                    event,
                    Some(TransportEvent::Connected | TransportEvent::ConnectFailed(_))
                ) {
                    self.attempt_deadline = None;
                }
                Ok(event)
            }
        }
    }
}

// ============================================================================
// SECTION: Event Mapping
// ============================================================================

/// Translates rumqttc events, tracking whether a session is established.
#[derive(Debug, Default)]
struct EventMapper {
    /// True between a successful handshake and the next session end.
    connected: bool,
}

impl EventMapper {
    /// Maps one event loop item to a transport event, if it is relevant.
    fn map(&mut self, item: Result<Event, ConnectionError>) -> Option<TransportEvent> {
        match item {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    self.connected = true;
                    Some(TransportEvent::Connected)
                } else {
                    self.connected = false;
                    Some(TransportEvent::ConnectFailed(format!(
                        "broker refused connection: {}",
                        refusal_reason(ack.code)
                    )))
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                Some(TransportEvent::Message(InboundMessage::new(
                    publish.topic,
                    publish.payload.to_vec(),
                    from_rumqttc_qos(publish.qos),
                    publish.retain,
                )))
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                let rejected = ack
                    .return_codes
                    .iter()
                    .any(|code| matches!(code, SubscribeReasonCode::Failure));
                if rejected {
                    error!(pkid = ack.pkid, "broker rejected subscription");
                } else {
                    debug!(pkid = ack.pkid, "subscription acknowledged");
                }
                None
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                self.connected = false;
                Some(TransportEvent::Disconnected(DisconnectCause::Remote(
                    "broker sent disconnect".to_string(),
                )))
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                self.connected = false;
                Some(TransportEvent::Disconnected(DisconnectCause::LocalRequest))
            }
            Ok(_) => None,
            Err(err) => {
                if self.connected {
                    self.connected = false;
                    Some(TransportEvent::Disconnected(DisconnectCause::Remote(err.to_string())))
                } else {
                    Some(TransportEvent::ConnectFailed(err.to_string()))
                }
            }
        }
    }
}

/// Describes a CONNACK refusal code.
const fn refusal_reason(code: ConnectReturnCode) -> &'static str {
    match code {
        ConnectReturnCode::Success => "accepted",
        ConnectReturnCode::RefusedProtocolVersion => "unacceptable protocol version",
        ConnectReturnCode::BadClientId => "identifier rejected",
        ConnectReturnCode::ServiceUnavailable => "server unavailable",
        ConnectReturnCode::BadUserNamePassword => "bad user name or password",
        ConnectReturnCode::NotAuthorized => "not authorized",
    }
}

/// Converts a domain QoS to rumqttc.
const fn to_rumqttc_qos(qos: QualityOfService) -> QoS {
    match qos {
        QualityOfService::AtMostOnce => QoS::AtMostOnce,
        QualityOfService::AtLeastOnce => QoS::AtLeastOnce,
        QualityOfService::ExactlyOnce => QoS::ExactlyOnce,
    }
}

/// Converts a rumqttc QoS to the domain type.
const fn from_rumqttc_qos(qos: QoS) -> QualityOfService {
    match qos {
        QoS::AtMostOnce => QualityOfService::AtMostOnce,
        QoS::AtLeastOnce => QualityOfService::AtLeastOnce,
        QoS::ExactlyOnce => QualityOfService::ExactlyOnce,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use std::io;

    use rumqttc::ConnAck;
    use rumqttc::Publish;
    use rumqttc::SubAck;

    use super::*;

    fn connack(code: ConnectReturnCode) -> Result<Event, ConnectionError> {
        Ok(Event::Incoming(Packet::ConnAck(ConnAck::new(code, false))))
    }

    fn network_error() -> Result<Event, ConnectionError> {
        Err(ConnectionError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer")))
    }

    #[test]
    fn connack_success_marks_session_connected() {
        let mut mapper = EventMapper::default();
        let event = mapper.map(connack(ConnectReturnCode::Success));
        assert_eq!(event, Some(TransportEvent::Connected));
        assert!(mapper.connected);
    }

    #[test]
    fn connack_refusal_is_connect_failure() {
        let mut mapper = EventMapper::default();
        let Some(TransportEvent::ConnectFailed(reason)) =
            mapper.map(connack(ConnectReturnCode::NotAuthorized))
        else {
            panic!("expected connect failure");
        };
        assert!(reason.contains("not authorized"));
        assert!(!mapper.connected);
    }

    #[test]
    fn error_before_handshake_is_connect_failure() {
        let mut mapper = EventMapper::default();
        assert!(matches!(mapper.map(network_error()), Some(TransportEvent::ConnectFailed(_))));
    }

    #[test]
    fn error_after_handshake_is_remote_disconnect() {
        let mut mapper = EventMapper::default();
        mapper.map(connack(ConnectReturnCode::Success));
        let event = mapper.map(network_error());
        assert!(matches!(
            event,
            Some(TransportEvent::Disconnected(DisconnectCause::Remote(reason)))
                if reason.contains("reset by peer")
        ));
        assert!(!mapper.connected);
        assert!(matches!(mapper.map(network_error()), Some(TransportEvent::ConnectFailed(_))));
    }

    #[test]
    fn publish_becomes_inbound_message() {
        let mut mapper = EventMapper::default();
        let mut publish = Publish::new("obk681BA32A/state", QoS::AtLeastOnce, "hello");
        publish.retain = true;
        let event = mapper.map(Ok(Event::Incoming(Packet::Publish(publish))));
        assert_eq!(
            event,
            Some(TransportEvent::Message(InboundMessage::new(
                "obk681BA32A/state",
                b"hello".to_vec(),
                QualityOfService::AtLeastOnce,
                true,
            )))
        );
    }

    #[test]
    fn outgoing_disconnect_is_local_request() {
        let mut mapper = EventMapper::default();
        mapper.map(connack(ConnectReturnCode::Success));
        assert_eq!(
            mapper.map(Ok(Event::Outgoing(Outgoing::Disconnect))),
            Some(TransportEvent::Disconnected(DisconnectCause::LocalRequest))
        );
    }

    #[test]
    fn suback_and_pings_are_not_surfaced() {
        let mut mapper = EventMapper::default();
        let suback = SubAck::new(1, vec![SubscribeReasonCode::Failure]);
        assert_eq!(mapper.map(Ok(Event::Incoming(Packet::SubAck(suback)))), None);
        assert_eq!(mapper.map(Ok(Event::Outgoing(Outgoing::PingReq))), None);
    }

    #[test]
    fn session_config_rejects_values_rumqttc_panics_on() {
        let mut config = MqttSessionConfig::new("192.168.4.1", 1883, "");
        assert!(matches!(MqttTransport::new(&config), Err(TransportError::Session(_))));
        config.client_id = " leading".to_string();
        assert!(matches!(MqttTransport::new(&config), Err(TransportError::Session(_))));
        config.client_id = "mqtt2sqlite-1".to_string();
        config.keep_alive = Duration::from_secs(2);
        assert!(matches!(MqttTransport::new(&config), Err(TransportError::Session(_))));
        config.keep_alive = DEFAULT_KEEP_ALIVE;
        config.host = "  ".to_string();
        assert!(matches!(MqttTransport::new(&config), Err(TransportError::Session(_))));
        config.host = "192.168.4.1".to_string();
        config.connect_timeout = Duration::ZERO;
        assert!(matches!(MqttTransport::new(&config), Err(TransportError::Session(_))));
    }

    #[test]
    fn session_config_defaults() {
        let config = MqttSessionConfig::new("broker", 1883, "mqtt2sqlite-7");
        assert_eq!(config.keep_alive, Duration::from_secs(30));
        assert!(config.clean_session);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn qos_conversion_is_symmetric() {
        for qos in [
            QualityOfService::AtMostOnce,
            QualityOfService::AtLeastOnce,
            QualityOfService::ExactlyOnce,
        ] {
            assert_eq!(from_rumqttc_qos(to_rumqttc_qos(qos)), qos);
        }
    }
}
