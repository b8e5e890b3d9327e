// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared wiring for pipeline system-tests.
// Purpose: Build supervisors over real stores with observable repair runs.
// Dependencies: system-tests, mqtt-ingest-adapters, mqtt-ingest-core, mqtt-ingest-store-sqlite
// ============================================================================

//! ## Overview
//! Shared helpers for MQTT ingest system-tests.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use mqtt_ingest_adapters::ShellRepairExecutor;
use mqtt_ingest_core::ConnectionSupervisor;
use mqtt_ingest_core::RepairTrigger;
use mqtt_ingest_core::SupervisorSettings;
use mqtt_ingest_store_sqlite::SqliteMessageStore;
use mqtt_ingest_store_sqlite::SqliteStoreConfig;
use system_tests::ScriptedBroker;
use tempfile::TempDir;

/// Supervisor over the scripted broker and a real store.
pub type Pipeline = ConnectionSupervisor<ScriptedBroker, SqliteMessageStore>;

/// Temporary directory holding the database and the repair marker.
pub struct Workspace {
    /// Owned temporary directory.
    pub dir: TempDir,
}

impl Workspace {
    /// Creates a fresh temporary directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Database file inside the directory.
    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("mqtt_messages.db")
    }

    /// File the repair command appends to.
    pub fn marker_path(&self) -> PathBuf {
        self.dir.path().join("repair_runs.log")
    }

    /// Opens the real store with default pragmas.
    pub fn open_store(&self) -> SqliteMessageStore {
        SqliteMessageStore::open(SqliteStoreConfig::for_path(self.db_path())).unwrap()
    }

    /// Repair command that appends one line to the marker file per run.
    pub fn marker_repair(&self, min_interval: Duration) -> RepairTrigger {
        let command = format!("echo run >> '{}'", self.marker_path().display());
        RepairTrigger::new(ShellRepairExecutor::new(command), min_interval)
    }

    /// Number of repair runs observed on disk.
    pub fn repair_runs(&self) -> usize {
        read_lines(&self.marker_path())
    }
}

/// Repair trigger that runs a no-op command.
pub fn noop_repair() -> RepairTrigger {
    RepairTrigger::new(ShellRepairExecutor::new("true"), Duration::from_secs(20))
}

/// Builds a pipeline from its parts.
pub fn pipeline(
    broker: ScriptedBroker,
    store: SqliteMessageStore,
    repair: RepairTrigger,
    settings: SupervisorSettings,
) -> Pipeline {
    ConnectionSupervisor::new(broker, store, repair, settings)
}

/// Counts lines in `path`; a missing file counts as zero.
fn read_lines(path: &Path) -> usize {
    std::fs::read_to_string(path).map(|text| text.lines().count()).unwrap_or(0)
}
