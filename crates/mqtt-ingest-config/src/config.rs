// crates/mqtt-ingest-config/src/config.rs
// ============================================================================
// Module: MQTT Ingest Configuration
// Description: Configuration loading, environment overlay, and validation.
// Purpose: Produce one validated configuration from file, environment, and defaults.
// Dependencies: mqtt-ingest-{adapters, core, store-sqlite}, serde, toml, tracing
// ============================================================================

//! ## Overview
//! Configuration resolves in three layers:
//! 1. Built-in defaults.
//! 2. An optional TOML file named by `--config` or `MQTT_INGEST_CONFIG`, read
//!    with strict path, size, and encoding limits.
//! 3. The deployment environment keys (`MQTT_BROKER`, `MQTT_PORT`, ...).
//!
//! Empty environment values count as unset. Integer keys that fail to parse or
//! fall outside `0..=1_000_000` keep the value from the lower layers and log a
//! warning. The merged result is validated and fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use mqtt_ingest_adapters::MIN_KEEP_ALIVE;
use mqtt_ingest_adapters::MqttSessionConfig;
use mqtt_ingest_core::SupervisorSettings;
use mqtt_ingest_store_sqlite::SqliteStoreConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "MQTT_INGEST_CONFIG";
/// Broker host override.
pub const ENV_BROKER: &str = "MQTT_BROKER";
/// Broker port override.
pub const ENV_PORT: &str = "MQTT_PORT";
/// Client identifier override.
pub const ENV_CLIENT_ID: &str = "MQTT_CLIENT_ID";
/// Topic filter override.
pub const ENV_TOPIC: &str = "MQTT_TOPIC";
/// Database path override.
pub const ENV_DB_PATH: &str = "MQTT_DB_PATH";
/// Repair command override.
pub const ENV_REPAIR_COMMAND: &str = "NETWORK_FIX_SCRIPT";
/// Repair throttle override (seconds).
pub const ENV_REPAIR_MIN_INTERVAL: &str = "NETWORK_FIX_MIN_INTERVAL_S";
/// Minimum reconnect delay override (seconds).
pub const ENV_RECONNECT_MIN: &str = "RECONNECT_MIN_S";
/// Maximum reconnect delay override (seconds).
pub const ENV_RECONNECT_MAX: &str = "RECONNECT_MAX_S";

/// Largest integer accepted from the environment.
const MAX_ENV_INTEGER: u64 = 1_000_000;
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Prefix of generated client identifiers.
const CLIENT_ID_PREFIX: &str = "mqtt2sqlite-";

/// Default broker host.
const DEFAULT_BROKER_HOST: &str = "192.168.4.1";
/// Default broker port.
const DEFAULT_BROKER_PORT: u16 = 1883;
/// Default topic filter.
const DEFAULT_TOPIC: &str = "#";
/// Default keep-alive (seconds).
const DEFAULT_KEEP_ALIVE_SECS: u64 = 30;
/// Default connect attempt timeout (seconds).
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
/// Default repair command.
const DEFAULT_REPAIR_COMMAND: &str = "./handle_network_error.sh";
/// Default repair throttle (seconds).
const DEFAULT_REPAIR_MIN_INTERVAL_SECS: u64 = 20;
/// Default minimum reconnect delay (seconds).
const DEFAULT_RECONNECT_MIN_SECS: u64 = 2;
/// Default maximum reconnect delay (seconds).
const DEFAULT_RECONNECT_MAX_SECS: u64 = 60;
/// Default receive poll bound (milliseconds).
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
/// Default shutdown grace (milliseconds).
const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 5_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Complete ingest configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct IngestConfig {
    /// Broker session settings.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Message store settings.
    #[serde(default)]
    pub store: SqliteStoreConfig,
    /// Network repair settings.
    #[serde(default)]
    pub repair: RepairConfig,
    /// Reconnect and shutdown timing.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Broker session settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BrokerConfig {
    /// Broker host name or address.
    #[serde(default = "default_broker_host")]
    pub host: String,
    /// Broker TCP port.
    #[serde(default = "default_broker_port")]
    pub port: u16,
    /// Client identifier; generated from the process id when absent.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Topic filter subscribed on every session.
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Keep-alive interval in seconds.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Whether each session starts clean.
    #[serde(default = "default_true")]
    pub clean_session: bool,
    /// Seconds allowed for the network connect and CONNACK.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: DEFAULT_BROKER_PORT,
            client_id: default_client_id(),
            topic: default_topic(),
            keep_alive_secs: DEFAULT_KEEP_ALIVE_SECS,
            clean_session: true,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

/// Network repair settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepairConfig {
    /// Command line run through `sh -c` on disconnect.
    #[serde(default = "default_repair_command")]
    pub command: String,
    /// Minimum seconds between two repair runs.
    #[serde(default = "default_repair_min_interval_secs")]
    pub min_interval_secs: u64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            command: default_repair_command(),
            min_interval_secs: DEFAULT_REPAIR_MIN_INTERVAL_SECS,
        }
    }
}

/// Reconnect and shutdown timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ReconnectConfig {
    /// Minimum reconnect delay in seconds.
    #[serde(default = "default_reconnect_min_secs")]
    pub min_secs: u64,
    /// Maximum reconnect delay in seconds.
    #[serde(default = "default_reconnect_max_secs")]
    pub max_secs: u64,
    /// Upper bound on one blocking receive, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Wait for the broker to confirm a shutdown disconnect, in milliseconds.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            min_secs: DEFAULT_RECONNECT_MIN_SECS,
            max_secs: DEFAULT_RECONNECT_MAX_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
        }
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl IngestConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Loads configuration using `lookup` in place of the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match resolve_path(path, &lookup)? {
            Some(resolved) => Self::from_file(&resolved)?,
            None => Self::default(),
        };
        config.apply_env(&lookup);
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file without applying the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Layers the deployment environment keys over the current values.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(host) = read(ENV_BROKER) {
            self.broker.host = host;
        }
        if let Some(client_id) = read(ENV_CLIENT_ID) {
            self.broker.client_id = client_id;
        }
        if let Some(topic) = read(ENV_TOPIC) {
            self.broker.topic = topic;
        }
        if let Some(path) = read(ENV_DB_PATH) {
            self.store.path = PathBuf::from(path);
        }
        if let Some(command) = read(ENV_REPAIR_COMMAND) {
            self.repair.command = command;
        }
        if let Some(port) = env_integer(ENV_PORT, read(ENV_PORT)) {
            match u16::try_from(port) {
                Ok(port) => self.broker.port = port,
                Err(_) => warn!(key = ENV_PORT, value = port, "port out of range; keeping default"),
            }
        }
        if let Some(secs) = env_integer(ENV_REPAIR_MIN_INTERVAL, read(ENV_REPAIR_MIN_INTERVAL)) {
            self.repair.min_interval_secs = secs;
        }
        let min_secs = env_integer(ENV_RECONNECT_MIN, read(ENV_RECONNECT_MIN))
            .unwrap_or(self.reconnect.min_secs);
        let max_secs = env_integer(ENV_RECONNECT_MAX, read(ENV_RECONNECT_MAX))
            .unwrap_or(self.reconnect.max_secs);
        if min_secs == 0 || max_secs < min_secs {
            warn!(
                min_secs,
                max_secs,
                kept_min_secs = self.reconnect.min_secs,
                kept_max_secs = self.reconnect.max_secs,
                "reconnect delays from environment rejected; keeping previous bounds"
            );
        } else {
            self.reconnect.min_secs = min_secs;
            self.reconnect.max_secs = max_secs;
        }
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.broker.validate()?;
        validate_path_string("store.path", &self.store.path.to_string_lossy())?;
        if self.repair.command.trim().is_empty() {
            return Err(ConfigError::Invalid("repair.command must be non-empty".to_string()));
        }
        self.reconnect.validate()
    }

    /// Returns the broker session parameters.
    #[must_use]
    pub fn session_config(&self) -> MqttSessionConfig {
        MqttSessionConfig {
            keep_alive: Duration::from_secs(self.broker.keep_alive_secs),
            clean_session: self.broker.clean_session,
            connect_timeout: Duration::from_secs(self.broker.connect_timeout_secs),
            ..MqttSessionConfig::new(
                self.broker.host.clone(),
                self.broker.port,
                self.broker.client_id.clone(),
            )
        }
    }

    /// Returns the supervisor tuning.
    #[must_use]
    pub fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            topic_filter: self.broker.topic.clone(),
            reconnect_min: Duration::from_secs(self.reconnect.min_secs),
            reconnect_max: Duration::from_secs(self.reconnect.max_secs),
            poll_interval: Duration::from_millis(self.reconnect.poll_interval_ms),
            shutdown_grace: Duration::from_millis(self.reconnect.shutdown_grace_ms),
        }
    }

    /// Returns the minimum spacing between repair runs.
    #[must_use]
    pub const fn repair_min_interval(&self) -> Duration {
        Duration::from_secs(self.repair.min_interval_secs)
    }
}

impl BrokerConfig {
    /// Validates broker settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("broker.host must be non-empty".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("broker.port must be greater than zero".to_string()));
        }
        if self.client_id.is_empty() || self.client_id.starts_with(' ') {
            return Err(ConfigError::Invalid(
                "broker.client_id must be non-empty and must not start with a space".to_string(),
            ));
        }
        if self.topic.is_empty() {
            return Err(ConfigError::Invalid("broker.topic must be non-empty".to_string()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "broker.connect_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.keep_alive_secs < MIN_KEEP_ALIVE.as_secs() {
            return Err(ConfigError::Invalid(format!(
                "broker.keep_alive_secs must be at least {}",
                MIN_KEEP_ALIVE.as_secs()
            )));
        }
        Ok(())
    }
}

impl ReconnectConfig {
    /// Validates reconnect timing.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_secs == 0 {
            return Err(ConfigError::Invalid(
                "reconnect.min_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_secs < self.min_secs {
            return Err(ConfigError::Invalid(
                "reconnect.max_secs must be at least reconnect.min_secs".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "reconnect.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.shutdown_grace_ms == 0 {
            return Err(ConfigError::Invalid(
                "reconnect.shutdown_grace_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the CLI or the environment.
fn resolve_path<F>(path: Option<&Path>, lookup: &F) -> Result<Option<PathBuf>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    match lookup(CONFIG_ENV_VAR).filter(|value| !value.is_empty()) {
        Some(env_path) if env_path.len() > MAX_TOTAL_PATH_LENGTH => {
            Err(ConfigError::Invalid("config path exceeds max length".to_string()))
        }
        Some(env_path) => Ok(Some(PathBuf::from(env_path))),
        None => Ok(None),
    }
}

/// Validates the config file path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Parses an environment integer, warning and returning `None` when invalid.
fn env_integer(key: &str, value: Option<String>) -> Option<u64> {
    let raw = value?;
    match raw.trim().parse::<u64>() {
        Ok(parsed) if parsed <= MAX_ENV_INTEGER => Some(parsed),
        _ => {
            warn!(key, value = %raw, "invalid integer in environment; keeping default");
            None
        }
    }
}

/// Default broker host.
fn default_broker_host() -> String {
    DEFAULT_BROKER_HOST.to_string()
}

/// Default broker port.
const fn default_broker_port() -> u16 {
    DEFAULT_BROKER_PORT
}

/// Generated client identifier for this process.
fn default_client_id() -> String {
    format!("{CLIENT_ID_PREFIX}{}", std::process::id())
}

/// Default topic filter.
fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

/// Default connect attempt timeout.
const fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

/// Default keep-alive.
const fn default_keep_alive_secs() -> u64 {
    DEFAULT_KEEP_ALIVE_SECS
}

/// Serde default for enabled flags.
const fn default_true() -> bool {
    true
}

/// Default repair command.
fn default_repair_command() -> String {
    DEFAULT_REPAIR_COMMAND.to_string()
}

/// Default repair throttle.
const fn default_repair_min_interval_secs() -> u64 {
    DEFAULT_REPAIR_MIN_INTERVAL_SECS
}

/// Default minimum reconnect delay.
const fn default_reconnect_min_secs() -> u64 {
    DEFAULT_RECONNECT_MIN_SECS
}

/// Default maximum reconnect delay.
const fn default_reconnect_max_secs() -> u64 {
    DEFAULT_RECONNECT_MAX_SECS
}

/// Default receive poll bound.
const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Default shutdown grace.
const fn default_shutdown_grace_ms() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_MS
}
