// crates/mqtt-ingest-adapters/src/repair.rs
// ============================================================================
// Module: Shell Repair Executor
// Description: Runs the configured network repair command through a shell.
// Purpose: Provide the production repair action behind the core trait.
// Dependencies: mqtt-ingest-core, tracing
// ============================================================================

//! ## Overview
//! The repair command is an operator-supplied shell snippet, typically a
//! script that bounces the network interface. It runs synchronously on the
//! calling thread with stdin closed and stdout/stderr inherited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use mqtt_ingest_core::RepairError;
use mqtt_ingest_core::RepairExecutor;
use mqtt_ingest_core::RepairExit;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Shell used when none is given.
const DEFAULT_SHELL: &str = "sh";

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Runs a command line with `<shell> -c <command>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellRepairExecutor {
    /// Shell program.
    shell: PathBuf,
    /// Command line passed to the shell.
    command: String,
}

impl ShellRepairExecutor {
    /// Creates an executor that runs `command` through `sh`.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self::with_shell(DEFAULT_SHELL, command)
    }

    /// Creates an executor with an explicit shell program.
    #[must_use]
    pub fn with_shell(shell: impl Into<PathBuf>, command: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            command: command.into(),
        }
    }

    /// Returns the command line.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl RepairExecutor for ShellRepairExecutor {
    fn describe(&self) -> String {
        self.command.clone()
    }

    fn execute(&mut self) -> Result<RepairExit, RepairError> {
        debug!(shell = %self.shell.display(), command = %self.command, "spawning repair command");
        let status = Command::new(&self.shell)
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .status()
            .map_err(|err| {
                RepairError::Launch(format!("{}: {err}", self.shell.display()))
            })?;
        Ok(RepairExit {
            code: status.code(),
        })
    }
}
