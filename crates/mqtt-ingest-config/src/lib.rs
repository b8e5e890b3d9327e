// crates/mqtt-ingest-config/src/lib.rs
// ============================================================================
// Module: MQTT Ingest Config
// Description: Canonical configuration model and validation.
// Purpose: Provide one fail-closed source of runtime settings.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Loads [`IngestConfig`] from defaults, an optional TOML file, and the
//! deployment environment, then validates it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::BrokerConfig;
pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::IngestConfig;
pub use config::ReconnectConfig;
pub use config::RepairConfig;
