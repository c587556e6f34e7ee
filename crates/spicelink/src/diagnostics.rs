//! Engine diagnostic capture.
//!
//! Every line the engine prints lands in a bounded ring buffer. Lines on the
//! error stream that are not in the benign set are also recorded as errors.

use std::collections::{BTreeSet, VecDeque};

use crate::config::DriverConfig;

/// Classifies engine error-stream lines as informational or errors.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticFilter {
    benign: BTreeSet<String>,
}

impl DiagnosticFilter {
    pub fn new(benign: impl IntoIterator<Item = String>) -> Self {
        Self {
            benign: benign.into_iter().collect(),
        }
    }

    pub fn is_benign(&self, line: &str) -> bool {
        self.benign.contains(line)
    }
}

/// Diagnostics accumulated for the current run.
#[derive(Debug)]
pub struct Diagnostics {
    lines: VecDeque<String>,
    capacity: usize,
    errors: Vec<String>,
    init_info: String,
    filter: DiagnosticFilter,
}

impl Diagnostics {
    pub fn new(config: &DriverConfig) -> Self {
        let capacity = config.diagnostic_capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            errors: Vec::new(),
            init_info: String::new(),
            filter: DiagnosticFilter::new(config.benign_diagnostics.iter().cloned()),
        }
    }

    /// Record a line from the engine's output stream.
    pub fn stdout(&mut self, line: &str) {
        log::debug!("engine: {}", line);
        self.push(format!("{}\n", line));
    }

    /// Record a line from the engine's error stream.
    ///
    /// Error-stream lines are followed by a blank line in [`info`](Self::info).
    pub fn stderr(&mut self, line: &str) {
        self.push(format!("{}\n\n", line));
        if self.filter.is_benign(line) {
            log::debug!("engine: {}", line);
        } else {
            log::warn!("engine: {}", line);
            self.errors.push(line.to_string());
        }
    }

    fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Forget the previous run's lines and errors.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.errors.clear();
    }

    /// Keep the current text as the initialization info.
    pub fn snapshot_init(&mut self) {
        self.init_info = self.info();
    }

    /// Retained lines with their terminators.
    pub fn info(&self) -> String {
        self.lines.iter().map(String::as_str).collect()
    }

    pub fn init_info(&self) -> &str {
        &self.init_info
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign_lines_are_not_errors() {
        let mut diag = Diagnostics::new(&DriverConfig::default());
        diag.stderr("Using SPARSE 1.3 as Direct Linear Solver");
        diag.stderr("Error: no such vector v(9)");
        diag.stdout("Circuit: rc");

        assert_eq!(diag.errors(), &["Error: no such vector v(9)"]);
        assert_eq!(
            diag.info(),
            "Using SPARSE 1.3 as Direct Linear Solver\n\nError: no such vector v(9)\n\nCircuit: rc\n"
        );
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let config = DriverConfig::default().with_diagnostic_capacity(3);
        let mut diag = Diagnostics::new(&config);
        for i in 0..5 {
            diag.stdout(&format!("line {}", i));
        }
        assert_eq!(diag.info(), "line 2\nline 3\nline 4\n");
    }

    #[test]
    fn test_error_lines_are_separated() {
        let mut diag = Diagnostics::new(&DriverConfig::default());
        diag.stdout("Circuit: rc");
        diag.stderr("Error: singular matrix");
        diag.stdout("Done.");
        assert_eq!(diag.info(), "Circuit: rc\nError: singular matrix\n\nDone.\n");
    }

    #[test]
    fn test_init_snapshot_survives_clear() {
        let mut diag = Diagnostics::new(&DriverConfig::default());
        diag.stdout("ngspice ready");
        diag.snapshot_init();
        diag.stderr("Error: bad netlist");
        diag.clear();

        assert_eq!(diag.init_info(), "ngspice ready\n");
        assert!(diag.info().is_empty());
        assert!(diag.errors().is_empty());
    }

    #[test]
    fn test_custom_filter() {
        let filter = DiagnosticFilter::new(["Note: ok".to_string()]);
        assert!(filter.is_benign("Note: ok"));
        assert!(!filter.is_benign("Note: ok "));
    }
}
