//! File stores the engine reads netlists from and writes results to.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;

/// A filesystem owned by an engine.
///
/// Paths are plain strings as they appear in engine commands; a leading `/`
/// is the store root.
pub trait FileStore {
    fn write_file(&mut self, path: &str, contents: &[u8]) -> io::Result<()>;

    /// Fails with [`io::ErrorKind::NotFound`] for a missing file.
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Removing a missing file is not an error.
    fn remove_file(&mut self, path: &str) -> io::Result<()>;
}

fn normalize(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

/// In-memory file store.
#[derive(Debug, Default, Clone)]
pub struct MemoryFs {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(&normalize(path))
    }
}

impl FileStore for MemoryFs {
    fn write_file(&mut self, path: &str, contents: &[u8]) -> io::Result<()> {
        self.files.insert(normalize(path), contents.to_vec());
        Ok(())
    }

    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        self.files
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }

    fn remove_file(&mut self, path: &str) -> io::Result<()> {
        self.files.remove(&normalize(path));
        Ok(())
    }
}

/// File store rooted in a temporary directory, removed on drop.
#[derive(Debug)]
pub struct DirFs {
    root: TempDir,
}

impl DirFs {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            root: tempfile::Builder::new().prefix("spicelink-").tempdir()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Host path for a store path. Rejects paths escaping the root.
    pub fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path escapes file store: {}", path),
            ));
        }
        Ok(self.root.path().join(relative))
    }
}

impl FileStore for DirFs {
    fn write_file(&mut self, path: &str, contents: &[u8]) -> io::Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target, contents)
    }

    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(path)?)
    }

    fn remove_file(&mut self, path: &str) -> io::Result<()> {
        match std::fs::remove_file(self.resolve(path)?) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_fs_root_paths() {
        let mut fs = MemoryFs::new();
        fs.write_file("/test.cir", b"* rc").unwrap();
        assert_eq!(fs.read_file("test.cir").unwrap(), b"* rc");
        fs.remove_file("test.cir").unwrap();
        fs.remove_file("test.cir").unwrap();
        let err = fs.read_file("/test.cir").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_dir_fs() {
        let mut fs = DirFs::new().unwrap();
        fs.write_file("/proc/meminfo", b"").unwrap();
        fs.write_file("out.raw", b"raw").unwrap();
        assert!(fs.root().join("proc/meminfo").exists());
        assert_eq!(fs.read_file("/out.raw").unwrap(), b"raw");

        fs.remove_file("out.raw").unwrap();
        fs.remove_file("out.raw").unwrap();
        assert!(fs.read_file("out.raw").is_err());
    }

    #[test]
    fn test_dir_fs_rejects_escape() {
        let mut fs = DirFs::new().unwrap();
        let err = fs.write_file("../outside", b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
