// crates/mqtt-ingest-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Message Store
// Description: Durable message sink backend using SQLite.
// Purpose: Persist every inbound MQTT message as one row.
// Dependencies: mqtt-ingest-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`MessageSink`] that appends inbound
//! messages to a single `messages` table with configurable journal and sync
//! modes.
//!
//! [`MessageSink`]: mqtt_ingest_core::MessageSink

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::DEFAULT_DB_PATH;
pub use store::SqliteMessageStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
