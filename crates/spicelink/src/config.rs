//! Driver configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for a [`RunDriver`](crate::RunDriver).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Path the netlist is written to in the engine file store.
    pub netlist_path: String,
    /// Path the engine writes its rawfile to.
    pub output_path: String,
    /// Command returned when no command is pending.
    pub idle_command: String,
    /// Maximum number of diagnostic lines retained per run.
    pub diagnostic_capacity: usize,
    /// Diagnostic lines that are informational rather than errors.
    pub benign_diagnostics: BTreeSet<String>,
    /// Files written into the engine file store before its loop starts.
    pub preload_files: BTreeMap<String, String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            netlist_path: "/test.cir".to_string(),
            output_path: "out.raw".to_string(),
            idle_command: " ".to_string(),
            diagnostic_capacity: 1000,
            benign_diagnostics: [
                "Warning: can't find the initialization file spinit.",
                "Using SPARSE 1.3 as Direct Linear Solver",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            preload_files: [
                ("/spinit", "* Standard ngspice init file\n"),
                ("/proc/meminfo", ""),
            ]
            .into_iter()
            .map(|(path, text)| (path.to_string(), text.to_string()))
            .collect(),
        }
    }
}

impl DriverConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_netlist_path(mut self, path: impl Into<String>) -> Self {
        self.netlist_path = path.into();
        self
    }

    pub fn with_output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_diagnostic_capacity(mut self, lines: usize) -> Self {
        self.diagnostic_capacity = lines;
        self
    }

    /// Treat `line` as informational.
    pub fn with_benign_diagnostic(mut self, line: impl Into<String>) -> Self {
        self.benign_diagnostics.insert(line.into());
        self
    }

    /// Add a file (e.g., a model card) to write before the engine starts.
    pub fn with_preload_file(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.preload_files.insert(path.into(), text.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DriverConfig::default();
        assert_eq!(config.netlist_path, "/test.cir");
        assert_eq!(config.output_path, "out.raw");
        assert_eq!(config.benign_diagnostics.len(), 2);
        assert!(config.preload_files.contains_key("/spinit"));
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: DriverConfig =
            serde_json::from_str(r#"{ "output_path": "result.raw", "diagnostic_capacity": 5 }"#)
                .unwrap();
        assert_eq!(config.output_path, "result.raw");
        assert_eq!(config.diagnostic_capacity, 5);
        assert_eq!(config.netlist_path, "/test.cir");
    }

    #[test]
    fn test_builder() {
        let config = DriverConfig::default()
            .with_preload_file("/modelcard.CMOS90", ".model N90 nmos level=54")
            .with_benign_diagnostic("Note: no compatibility mode selected!");
        assert_eq!(config.preload_files.len(), 3);
        assert_eq!(config.benign_diagnostics.len(), 3);
    }
}
