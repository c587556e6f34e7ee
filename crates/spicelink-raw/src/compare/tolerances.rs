//! Tolerance configuration for comparing results against a reference.

use serde::{Deserialize, Serialize};

/// Absolute and relative tolerances applied per sample.
///
/// Complex samples are compared component-wise with the same tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Absolute tolerance.
    pub abs: f64,
    /// Relative tolerance (fraction of the reference value).
    pub rel: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { abs: 1e-9, rel: 1e-6 }
    }
}

impl Tolerances {
    /// Exact comparison.
    pub fn exact() -> Self {
        Self { abs: 0.0, rel: 0.0 }
    }

    pub fn with_abs(mut self, abs: f64) -> Self {
        self.abs = abs;
        self
    }

    pub fn with_rel(mut self, rel: f64) -> Self {
        self.rel = rel;
        self
    }
}

/// Check if two values match within absolute and relative tolerances.
pub fn values_match(expected: f64, actual: f64, abs_tol: f64, rel_tol: f64) -> bool {
    if expected == actual {
        return true;
    }

    let abs_diff = (expected - actual).abs();
    if abs_diff <= abs_tol {
        return true;
    }

    if expected.abs() > 0.0 {
        let rel_diff = abs_diff / expected.abs();
        if rel_diff <= rel_tol {
            return true;
        }
    }

    false
}
