//! Comparison of a result against a reference result.
//!
//! Structural disagreement (data type, variable names, point counts) is an
//! [`Error::InvariantViolation`]; numeric disagreement is reported per series
//! in a [`ComparisonReport`].

pub mod report;
pub mod tolerances;

pub use report::{ComparisonReport, SeriesComparison};
pub use tolerances::{Tolerances, values_match};

use crate::error::{Error, Result};
use crate::types::{Samples, SimResult};

/// Compare `actual` against `reference`.
pub fn compare(
    reference: &SimResult,
    actual: &SimResult,
    tolerances: &Tolerances,
) -> Result<ComparisonReport> {
    check_structure(reference)?;
    check_structure(actual)?;

    if reference.data_type != actual.data_type {
        return Err(Error::InvariantViolation(format!(
            "data type mismatch: expected {:?}, got {:?}",
            reference.data_type, actual.data_type
        )));
    }
    if reference.variable_names != actual.variable_names {
        return Err(Error::InvariantViolation(format!(
            "variable mismatch: expected {:?}, got {:?}",
            reference.variable_names, actual.variable_names
        )));
    }
    if reference.num_points != actual.num_points {
        return Err(Error::InvariantViolation(format!(
            "point count mismatch: expected {}, got {}",
            reference.num_points, actual.num_points
        )));
    }

    let mut report = ComparisonReport::new();
    for (expected, got) in reference.data.iter().zip(&actual.data) {
        let deviations = deviations(&expected.values, &got.values, tolerances).ok_or_else(|| {
            Error::InvariantViolation(format!("sample type mismatch in {}", expected.name))
        })?;

        let mut comp = SeriesComparison {
            name: expected.name.clone(),
            passed: true,
            mismatches: 0,
            worst_index: None,
            max_error: 0.0,
        };
        for (i, (error, ok)) in deviations.into_iter().enumerate() {
            if !ok {
                comp.passed = false;
                comp.mismatches += 1;
            }
            if error > comp.max_error {
                comp.max_error = error;
                comp.worst_index = Some(i);
            }
        }
        report.add(comp);
    }

    Ok(report)
}

/// Check the count invariants of a single result.
pub fn check_structure(result: &SimResult) -> Result<()> {
    if result.num_variables != result.data.len() {
        return Err(Error::InvariantViolation(format!(
            "numVariables is {} but {} series present",
            result.num_variables,
            result.data.len()
        )));
    }
    if let Some(series) = result.data.iter().find(|s| s.values.len() != result.num_points) {
        return Err(Error::InvariantViolation(format!(
            "{} has {} samples, expected {}",
            series.name,
            series.values.len(),
            result.num_points
        )));
    }
    Ok(())
}

/// Per-sample (absolute error, within tolerance), or `None` if the sample
/// types differ.
fn deviations(expected: &Samples, actual: &Samples, tol: &Tolerances) -> Option<Vec<(f64, bool)>> {
    match (expected, actual) {
        (Samples::Real(e), Samples::Real(a)) => Some(
            e.iter()
                .zip(a)
                .map(|(&e, &a)| ((e - a).abs(), values_match(e, a, tol.abs, tol.rel)))
                .collect(),
        ),
        (Samples::Complex(e), Samples::Complex(a)) => Some(
            e.iter()
                .zip(a)
                .map(|(e, a)| {
                    let error = (e.real - a.real).abs().max((e.img - a.img).abs());
                    let ok = values_match(e.real, a.real, tol.abs, tol.rel)
                        && values_match(e.img, a.img, tol.abs, tol.rel);
                    (error, ok)
                })
                .collect(),
        ),
        // An empty series deserializes as real regardless of the data type.
        (e, a) if e.is_empty() && a.is_empty() => Some(Vec::new()),
        _ => None,
    }
}
