//! Decoder for the ngspice binary rawfile format.
//!
//! A binary rawfile is a UTF-8 text header terminated by the `Binary:`
//! marker, an 8-byte sentinel (the marker's own 7 bytes plus its newline),
//! and a flat array of little-endian f64 values.
//!
//! Header fields are matched by line prefix, in any order:
//! - `No. Variables: <int>`
//! - `No. Points: <int>`
//! - `Flags: ...` (contains "complex" for complex data)
//! - `Variables:` followed by one line per variable: `index name kind`
//!
//! Floats cycle through all variables before advancing to the next point.
//! Complex data stores each value as an interleaved (real, imaginary) pair.

use crate::error::{Error, Result};
use crate::types::{
    ComplexNumber, DataSeries, DataType, RawData, RawHeader, RawResult, RawVariable, Samples,
    SimResult, VariableKind,
};

const BINARY_MARKER: &[u8] = b"Binary:";

/// Distance from the start of the marker to the first payload byte.
const SENTINEL_LEN: usize = 8;

/// Decode a binary rawfile into a filtered [`SimResult`].
pub fn decode(bytes: &[u8]) -> Result<SimResult> {
    let raw = decode_raw(bytes)?;
    Ok(filter(raw))
}

/// Decode a binary rawfile without filtering variables.
pub fn decode_raw(bytes: &[u8]) -> Result<RawResult> {
    let offset = find_bytes(bytes, BINARY_MARKER)
        .ok_or_else(|| Error::malformed("Binary: marker not found"))?;

    let header = format!("{}\n", String::from_utf8_lossy(&bytes[..offset]));
    let param = parse_header(&header)?;

    let payload = bytes.get(offset + SENTINEL_LEN..).ok_or_else(|| {
        Error::malformed(format!(
            "payload truncated: {} bytes after marker at {}",
            bytes.len() - offset,
            offset
        ))
    })?;

    let width = match param.data_type {
        DataType::Real => 8,
        DataType::Complex => 16,
    };
    check_payload(&param, payload.len() / width)?;

    let data = match param.data_type {
        DataType::Real => RawData::Real(scatter(
            payload.chunks_exact(8).map(read_f64_le),
            &param,
            0.0,
        )),
        DataType::Complex => RawData::Complex(scatter(
            payload
                .chunks_exact(16)
                .map(|pair| ComplexNumber::new(read_f64_le(&pair[..8]), read_f64_le(&pair[8..]))),
            &param,
            ComplexNumber::default(),
        )),
    };

    log::debug!(
        "decoded rawfile: {} variables, {} points, {:?}, {} payload bytes",
        param.num_variables,
        param.num_points,
        param.data_type,
        payload.len()
    );

    Ok(RawResult {
        header,
        param,
        data,
    })
}

/// Parse the parameter block from header text.
pub fn parse_header(header: &str) -> Result<RawHeader> {
    let lines: Vec<&str> = header.split('\n').collect();

    let num_variables = parse_count(&lines, "No. Variables")?;
    let num_points = parse_count(&lines, "No. Points")?;

    let flags = field(&lines, "Flags").ok_or_else(|| Error::malformed("missing Flags line"))?;
    let data_type = if flags.contains("complex") {
        DataType::Complex
    } else {
        DataType::Real
    };

    let start = lines
        .iter()
        .position(|line| line.trim_end() == "Variables:")
        .ok_or_else(|| Error::malformed("missing Variables: section"))?;

    let mut variables = Vec::with_capacity(num_variables);
    for i in 0..num_variables {
        let line = lines.get(start + 1 + i).ok_or_else(|| {
            Error::malformed(format!(
                "Variables: section has {} of {} entries",
                i, num_variables
            ))
        })?;
        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.len() < 3 {
            return Err(Error::malformed(format!("invalid variable line: {:?}", line)));
        }
        variables.push(RawVariable {
            name: columns[1].to_string(),
            kind: VariableKind::from_column(columns[2]),
        });
    }

    Ok(RawHeader {
        title: field(&lines, "Title").map(|s| s.trim().to_string()),
        plotname: field(&lines, "Plotname").map(|s| s.trim().to_string()),
        num_variables,
        num_points,
        variables,
        data_type,
    })
}

/// Keep only voltage, current, time and frequency variables.
fn filter(raw: RawResult) -> SimResult {
    let RawResult {
        header,
        param,
        data,
    } = raw;

    let series: Vec<Samples> = match data {
        RawData::Real(columns) => columns.into_iter().map(Samples::Real).collect(),
        RawData::Complex(columns) => columns.into_iter().map(Samples::Complex).collect(),
    };

    let data: Vec<DataSeries> = param
        .variables
        .into_iter()
        .zip(series)
        .filter(|(var, _)| var.kind.is_retained())
        .map(|(var, values)| DataSeries {
            name: var.name,
            kind: var.kind,
            values,
        })
        .collect();

    SimResult {
        header,
        num_variables: data.len(),
        variable_names: data.iter().map(|s| s.name.clone()).collect(),
        num_points: param.num_points,
        data_type: param.data_type,
        data,
    }
}

/// Reject a header whose declared size the payload cannot back.
///
/// The payload must reach the last declared point; only that point may be
/// partial. This bounds the columns `scatter` allocates by the payload size.
fn check_payload(param: &RawHeader, values: usize) -> Result<()> {
    let vars = param.num_variables;
    if vars == 0 || param.num_points == 0 {
        return Ok(());
    }

    let declared = vars.checked_mul(param.num_points).ok_or_else(|| {
        Error::malformed(format!(
            "{} variables x {} points overflows",
            vars, param.num_points
        ))
    })?;
    if values < declared - vars {
        return Err(Error::malformed(format!(
            "payload holds {} values, header declares {} variables x {} points",
            values, vars, param.num_points
        )));
    }
    Ok(())
}

/// Place flat value `i` at `[i % num_variables][i / num_variables]`.
///
/// Columns are pre-filled with `zero`; values past the last full point are
/// dropped.
fn scatter<T: Copy>(values: impl Iterator<Item = T>, param: &RawHeader, zero: T) -> Vec<Vec<T>> {
    let vars = param.num_variables;
    let mut columns = vec![vec![zero; param.num_points]; vars];
    if vars == 0 {
        return columns;
    }

    for (i, value) in values.enumerate() {
        let point = i / vars;
        if point >= param.num_points {
            break;
        }
        columns[i % vars][point] = value;
    }
    columns
}

/// Text after the first `:` of the first line starting with `prefix`.
fn field<'a>(lines: &[&'a str], prefix: &str) -> Option<&'a str> {
    let line = lines.iter().find(|line| line.starts_with(prefix))?;
    line.split(':').nth(1)
}

fn parse_count(lines: &[&str], prefix: &str) -> Result<usize> {
    let value = field(lines, prefix)
        .ok_or_else(|| Error::malformed(format!("missing {} line", prefix)))?
        .trim();
    value
        .parse()
        .map_err(|_| Error::malformed(format!("invalid {}: {:?}", prefix, value)))
}

/// Read a little-endian f64 from an 8-byte chunk.
fn read_f64_le(data: &[u8]) -> f64 {
    let bytes: [u8; 8] = data[..8].try_into().unwrap_or([0; 8]);
    f64::from_le_bytes(bytes)
}

/// Find a byte sequence in a slice.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
