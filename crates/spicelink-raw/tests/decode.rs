//! Integration tests for the rawfile decoder.

use spicelink_raw::{
    ComplexNumber, DataType, Error, Samples, Tolerances, VariableKind, compare, decode, snapshot,
};

/// Encode a rawfile the way ngspice's binary writer lays it out.
fn encode(flags: &str, variables: &[(&str, &str)], points: &[Vec<f64>]) -> Vec<u8> {
    let mut text = String::new();
    text.push_str("Title: synthetic\n");
    text.push_str("Date: Mon Oct 19 12:00:00  2026\n");
    text.push_str("Plotname: Synthetic Analysis\n");
    text.push_str(&format!("Flags: {}\n", flags));
    text.push_str(&format!("No. Variables: {}\n", variables.len()));
    text.push_str(&format!("No. Points: {}\n", points.len()));
    text.push_str("Variables:\n");
    for (i, (name, kind)) in variables.iter().enumerate() {
        text.push_str(&format!("\t{}\t{}\t{}\n", i, name, kind));
    }
    text.push_str("Binary:\n");

    let mut bytes = text.into_bytes();
    for point in points {
        for value in point {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    bytes
}

#[test]
fn test_real_round_trip() {
    let variables = [("time", "time"), ("v(out)", "voltage"), ("i(v1)", "current")];
    let points: Vec<Vec<f64>> = (0..5)
        .map(|p| {
            let t = p as f64 * 1e-6;
            vec![t, (t * 1e6).sin(), -1e-3 * t]
        })
        .collect();

    let result = decode(&encode("real", &variables, &points)).unwrap();

    assert_eq!(result.data_type, DataType::Real);
    assert_eq!(result.num_points, 5);
    assert_eq!(result.variable_names, vec!["time", "v(out)", "i(v1)"]);
    assert_eq!(result.data[2].kind, VariableKind::Current);
    for (k, series) in result.data.iter().enumerate() {
        let values = series.values.as_real().unwrap();
        for (p, point) in points.iter().enumerate() {
            assert_eq!(values[p].to_bits(), point[k].to_bits());
        }
    }
}

#[test]
fn test_complex_round_trip() {
    let variables = [("frequency", "frequency"), ("v(2)", "voltage")];
    // Each variable contributes an interleaved (real, imaginary) pair.
    let points: Vec<Vec<f64>> = (0..4)
        .map(|p| {
            let f = 10f64.powi(p);
            vec![f, 0.0, 1.0 / (1.0 + f), -f / (1.0 + f)]
        })
        .collect();

    let result = decode(&encode("complex", &variables, &points)).unwrap();

    assert_eq!(result.data_type, DataType::Complex);
    let v2 = result.series("V(2)").unwrap().values.as_complex().unwrap();
    for (p, point) in points.iter().enumerate() {
        assert_eq!(v2[p], ComplexNumber::new(point[2], point[3]));
    }
    assert_eq!(result.sweep().unwrap().name, "frequency");
}

#[test]
fn test_noise_plot_keeps_only_classified_kinds() {
    let variables = [
        ("frequency", "frequency"),
        ("inoise_spectrum", "notype"),
        ("onoise_spectrum", "notype"),
    ];
    let points = vec![vec![1.0, 2e-9, 3e-9], vec![10.0, 4e-9, 5e-9]];

    let result = decode(&encode("real", &variables, &points)).unwrap();

    assert_eq!(result.num_variables, 1);
    assert_eq!(result.data.len(), result.num_variables);
    assert_eq!(result.data[0].values, Samples::Real(vec![1.0, 10.0]));
}

#[test]
fn test_missing_header_line_is_malformed() {
    let mut bytes = encode("real", &[("time", "time")], &[vec![0.0]]);
    let text = String::from_utf8_lossy(&bytes).replace("No. Variables: 1\n", "");
    bytes = text.into_bytes();

    assert!(matches!(decode(&bytes), Err(Error::MalformedOutput(_))));
}

#[test]
fn test_snapshot_compare() {
    let variables = [("time", "time"), ("v(1)", "voltage")];
    let points = vec![vec![0.0, 1.0], vec![1.0, 0.5]];
    let result = decode(&encode("real", &variables, &points)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ref.json");
    snapshot::save(&path, &result).unwrap();
    let reference = snapshot::load(&path).unwrap();

    let report = compare(&reference, &result, &Tolerances::exact()).unwrap();
    assert!(report.passed, "{}", report.to_text());
}
