//! Decoder for ngspice binary rawfiles.
//!
//! This crate turns the bytes an ngspice `write` command produces into a
//! [`SimResult`]: the filtered, typed view of a simulation that callers
//! consume. It also provides:
//! - JSON snapshots of results, in the plain shape external tooling expects
//! - Structural and numeric comparison of a result against a reference
//!
//! # Example
//!
//! ```
//! use spicelink_raw::{decode, DataType};
//!
//! let mut raw = b"Title: rc\nFlags: real\nNo. Variables: 1\nNo. Points: 2\n\
//! Variables:\n\t0\ttime\ttime\nBinary:\n".to_vec();
//! for v in [0.0f64, 1e-3] {
//!     raw.extend_from_slice(&v.to_le_bytes());
//! }
//!
//! let result = decode(&raw).unwrap();
//! assert_eq!(result.data_type, DataType::Real);
//! assert_eq!(result.variable_names, vec!["time"]);
//! ```

pub mod compare;
pub mod error;
pub mod rawfile;
pub mod snapshot;
pub mod types;

pub use compare::{ComparisonReport, SeriesComparison, Tolerances, compare, values_match};
pub use error::{Error, Result};
pub use rawfile::{decode, decode_raw, parse_header};
pub use types::{
    ComplexNumber, DataSeries, DataType, RawData, RawHeader, RawResult, RawVariable, Samples,
    SimResult, VariableKind,
};
