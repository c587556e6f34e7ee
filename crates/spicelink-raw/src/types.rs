//! Types for decoded simulation results.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Physical kind of a rawfile variable (third column of a `Variables:` line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    Voltage,
    Current,
    Time,
    Frequency,
    /// Any kind this crate does not classify (`notype`, `impedance`, ...).
    #[serde(other)]
    NoType,
}

impl VariableKind {
    /// Classify a kind column from a rawfile header.
    pub fn from_column(column: &str) -> Self {
        match column {
            "voltage" => VariableKind::Voltage,
            "current" => VariableKind::Current,
            "time" => VariableKind::Time,
            "frequency" => VariableKind::Frequency,
            _ => VariableKind::NoType,
        }
    }

    /// Whether variables of this kind are kept in a [`SimResult`].
    pub fn is_retained(self) -> bool {
        !matches!(self, VariableKind::NoType)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VariableKind::Voltage => "voltage",
            VariableKind::Current => "current",
            VariableKind::Time => "time",
            VariableKind::Frequency => "frequency",
            VariableKind::NoType => "notype",
        }
    }
}

/// Whether the payload holds real scalars or (real, imaginary) pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Real,
    Complex,
}

/// A complex sample in the serialized `{ "real", "img" }` shape.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComplexNumber {
    pub real: f64,
    pub img: f64,
}

impl ComplexNumber {
    pub fn new(real: f64, img: f64) -> Self {
        Self { real, img }
    }

    /// Magnitude in dB.
    pub fn magnitude_db(&self) -> f64 {
        20.0 * Complex64::from(*self).norm().log10()
    }

    /// Phase in degrees.
    pub fn phase_deg(&self) -> f64 {
        Complex64::from(*self).arg().to_degrees()
    }
}

impl From<ComplexNumber> for Complex64 {
    fn from(c: ComplexNumber) -> Self {
        Complex64::new(c.real, c.img)
    }
}

impl From<Complex64> for ComplexNumber {
    fn from(c: Complex64) -> Self {
        ComplexNumber::new(c.re, c.im)
    }
}

/// A variable declared in the rawfile header.
#[derive(Debug, Clone, PartialEq)]
pub struct RawVariable {
    /// Variable name (e.g., "time", "v(out)", "i(v1)").
    pub name: String,
    pub kind: VariableKind,
}

/// Parameter block parsed from the rawfile header.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHeader {
    /// Plot title, when present.
    pub title: Option<String>,
    /// Plot name (e.g., "Transient Analysis"), when present.
    pub plotname: Option<String>,
    /// Number of variables the header declares.
    pub num_variables: usize,
    /// Number of points the header declares.
    pub num_points: usize,
    /// Exactly `num_variables` variable definitions, in payload order.
    pub variables: Vec<RawVariable>,
    pub data_type: DataType,
}

/// Payload matrix indexed `[variable][point]`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawData {
    Real(Vec<Vec<f64>>),
    Complex(Vec<Vec<ComplexNumber>>),
}

/// Unfiltered decode of one rawfile.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    /// Header text up to the `Binary:` marker, with a trailing newline.
    pub header: String,
    pub param: RawHeader,
    pub data: RawData,
}

/// Samples of one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Samples {
    Real(Vec<f64>),
    Complex(Vec<ComplexNumber>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::Real(v) => v.len(),
            Samples::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_real(&self) -> Option<&[f64]> {
        match self {
            Samples::Real(v) => Some(v),
            Samples::Complex(_) => None,
        }
    }

    pub fn as_complex(&self) -> Option<&[ComplexNumber]> {
        match self {
            Samples::Complex(v) => Some(v),
            Samples::Real(_) => None,
        }
    }
}

/// One retained variable and its samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSeries {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: VariableKind,
    pub values: Samples,
}

/// Filtered, typed result of one simulation run.
///
/// Only voltage, current, time and frequency variables are kept, so
/// `num_variables == data.len()` and every series holds `num_points` samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimResult {
    pub header: String,
    pub num_variables: usize,
    pub variable_names: Vec<String>,
    pub num_points: usize,
    pub data_type: DataType,
    pub data: Vec<DataSeries>,
}

impl SimResult {
    /// Find a series by name (case-insensitive).
    pub fn series(&self, name: &str) -> Option<&DataSeries> {
        self.data.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// The independent axis: the first time or frequency series.
    pub fn sweep(&self) -> Option<&DataSeries> {
        self.data
            .iter()
            .find(|s| matches!(s.kind, VariableKind::Time | VariableKind::Frequency))
    }
}
