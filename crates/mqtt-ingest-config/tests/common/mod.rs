// crates/mqtt-ingest-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Fake environment and temporary config files.
// Purpose: Keep config tests independent of the real process environment.
// =============================================================================

#![allow(
    dead_code,
    clippy::unwrap_used,
    reason = "Test helpers are selectively used across suites."
)]

use std::collections::HashMap;
use std::io::Write;

use tempfile::NamedTempFile;

/// Environment stand-in backed by a map.
#[derive(Debug, Default, Clone)]
pub struct FakeEnv {
    values: HashMap<String, String>,
}

impl FakeEnv {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            values: pairs
                .iter()
                .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
                .collect(),
        }
    }

    pub fn lookup(&self) -> impl Fn(&str) -> Option<String> + '_ {
        move |key: &str| self.values.get(key).cloned()
    }
}

/// Writes `content` to a temporary TOML file.
pub fn toml_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}
