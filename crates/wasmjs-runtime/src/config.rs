//! Runtime configuration.
//!
//! Loaded from JSON; every field has a default so an empty object (or no
//! file at all) yields the stock behavior of the reference host.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RuntimeResult;

/// Where guest writes to fd 1 and fd 2 go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdioMode {
    /// Pass through to the process streams.
    #[default]
    Inherit,
    /// Buffer in the context.
    Capture,
}

/// Configuration of a [`Context`](crate::Context).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Leading argv strings; `Go.argv` entries are appended.
    pub argv: Vec<String>,
    /// Environment passed to the program.
    pub env: BTreeMap<String, String>,
    /// Terminate the host process on `runtime.wasmExit`.
    pub exit_process: bool,
    pub stdio: StdioMode,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            argv: vec!["js".to_string()],
            env: BTreeMap::new(),
            exit_process: true,
            stdio: StdioMode::Inherit,
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(text: &str) -> RuntimeResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> RuntimeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Environment as sorted `KEY=VALUE` strings.
    pub fn env_strings(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}
