//! Comparison report generation.

use serde::{Deserialize, Serialize};

/// Comparison result for a single series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesComparison {
    /// Series name (e.g., "v(2)").
    pub name: String,
    /// Whether every sample matched.
    pub passed: bool,
    /// Number of samples outside tolerance.
    pub mismatches: usize,
    /// Index of the largest deviation, if any sample differs.
    pub worst_index: Option<usize>,
    /// Largest absolute deviation observed.
    pub max_error: f64,
}

/// Complete comparison report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Whether the overall comparison passed.
    pub passed: bool,
    /// Per-series results, in reference order.
    pub series: Vec<SeriesComparison>,
}

impl ComparisonReport {
    pub fn new() -> Self {
        Self {
            passed: true,
            series: Vec::new(),
        }
    }

    /// Add a series comparison result.
    pub fn add(&mut self, comp: SeriesComparison) {
        if !comp.passed {
            self.passed = false;
        }
        self.series.push(comp);
    }

    /// Names of failed series.
    pub fn failures(&self) -> impl Iterator<Item = &str> {
        self.series
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name.as_str())
    }

    /// Format as human-readable text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("Status: {}\n", if self.passed { "PASS" } else { "FAIL" }));
        out.push_str(&format!(
            "Series: {}/{} passed\n",
            self.series.iter().filter(|c| c.passed).count(),
            self.series.len()
        ));

        for comp in &self.series {
            let status = if comp.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!("  {}: {}", comp.name, status));
            if let Some(index) = comp.worst_index {
                out.push_str(&format!(
                    " ({} mismatches, worst at {} err={:.6e})",
                    comp.mismatches, index, comp.max_error
                ));
            }
            out.push('\n');
        }

        out
    }
}

impl Default for ComparisonReport {
    fn default() -> Self {
        Self::new()
    }
}
