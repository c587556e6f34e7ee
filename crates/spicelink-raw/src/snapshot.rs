//! JSON snapshots of simulation results.
//!
//! Snapshots are the plain serialized [`SimResult`] with no envelope, so
//! files written by other tooling in the same shape load directly.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::SimResult;

/// Write a result to `path` as pretty-printed JSON.
pub fn save(path: &Path, result: &SimResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a result snapshot from disk.
pub fn load(path: &Path) -> Result<SimResult> {
    if !path.exists() {
        return Err(Error::SnapshotNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Load every `.json` snapshot in a directory, sorted by file name.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_directory(dir: &Path) -> Result<Vec<(String, SimResult)>> {
    if !dir.is_dir() {
        return Err(Error::SnapshotNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut snapshots = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            match load(&path) {
                Ok(result) => snapshots.push((name, result)),
                Err(e) => log::warn!("skipping snapshot {}: {}", path.display(), e),
            }
        }
    }

    snapshots.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataSeries, DataType, Samples, VariableKind};

    fn sample() -> SimResult {
        SimResult {
            header: "Title: divider\n".to_string(),
            num_variables: 1,
            variable_names: vec!["v(2)".to_string()],
            num_points: 1,
            data_type: DataType::Real,
            data: vec![DataSeries {
                name: "v(2)".to_string(),
                kind: VariableKind::Voltage,
                values: Samples::Real(vec![5.0]),
            }],
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("divider.json");

        save(&path, &sample()).unwrap();
        assert_eq!(load(&path).unwrap(), sample());
    }

    #[test]
    fn test_missing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::SnapshotNotFound { .. }));
    }

    #[test]
    fn test_load_directory_skips_invalid() {
        let dir = tempfile::tempdir().unwrap();
        save(&dir.path().join("b.json"), &sample()).unwrap();
        save(&dir.path().join("a.json"), &sample()).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let names: Vec<String> = load_directory(dir.path())
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
