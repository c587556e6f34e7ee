//! Engine backed by the `ngspice` executable.
//!
//! Each `run` invokes ngspice in batch mode on the sourced netlist with the
//! file store's directory as working directory, so `.include` of preloaded
//! model cards resolves.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::fs::DirFs;
use super::interpreter::{Backend, CommandEngine};
use super::{EngineError, EngineHost};

/// Configuration for the ngspice backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NgspiceConfig {
    /// Path to ngspice executable (default: "ngspice" in PATH).
    pub executable: String,
    /// Timeout for one ngspice invocation in seconds.
    pub timeout_secs: u64,
}

impl Default for NgspiceConfig {
    fn default() -> Self {
        Self {
            executable: "ngspice".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Check if ngspice is available.
pub fn is_ngspice_available(config: &NgspiceConfig) -> bool {
    Command::new(&config.executable)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Engine driving ngspice over a temporary directory.
pub type NgspiceEngine = CommandEngine<NgspiceBackend, DirFs>;

impl NgspiceEngine {
    /// Create the file store and check the executable.
    pub fn create(config: NgspiceConfig) -> Result<Self, EngineError> {
        if !is_ngspice_available(&config) {
            return Err(EngineError::Construction(format!(
                "ngspice not found: {}",
                config.executable
            )));
        }
        let fs = DirFs::new()?;
        let backend = NgspiceBackend {
            config,
            root: fs.root().to_path_buf(),
        };
        log::info!("ngspice engine rooted at {}", fs.root().display());
        Ok(CommandEngine::new(backend, fs))
    }
}

/// Runs one netlist through ngspice in batch mode.
#[derive(Debug)]
pub struct NgspiceBackend {
    config: NgspiceConfig,
    root: std::path::PathBuf,
}

const RAW_SCRATCH: &str = ".spicelink-run.raw";

impl Backend for NgspiceBackend {
    fn simulate(
        &mut self,
        netlist_path: &str,
        _netlist: &[u8],
        host: &mut dyn EngineHost,
    ) -> Result<Vec<u8>, String> {
        let netlist = self.root.join(netlist_path.trim_start_matches('/'));
        let raw = self.root.join(RAW_SCRATCH);
        let _ = std::fs::remove_file(&raw);

        // -b: batch mode, -r: write binary rawfile
        let child = Command::new(&self.config.executable)
            .current_dir(&self.root)
            .arg("-b")
            .arg("-r")
            .arg(&raw)
            .arg(&netlist)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to spawn {}: {}", self.config.executable, e))?;

        let output = wait_with_timeout(child, Duration::from_secs(self.config.timeout_secs))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            host.on_stdout(line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            host.on_stderr(line);
        }

        if !output.status.success() {
            return Err(format!("ngspice exited with {}", output.status));
        }

        read_raw(&raw)
    }
}

fn read_raw(path: &Path) -> Result<Vec<u8>, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("failed to read rawfile: {}", e))?;
    if bytes.is_empty() {
        return Err("ngspice produced empty rawfile".to_string());
    }
    Ok(bytes)
}

/// Wait for a child process with timeout.
///
/// Output pipes are drained on separate threads so a chatty run cannot
/// block on a full pipe.
fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<Output, String> {
    let stdout = child.stdout.take().map(|s| std::thread::spawn(move || drain(s)));
    let stderr = child.stderr.take().map(|s| std::thread::spawn(move || drain(s)));

    let start = Instant::now();
    let poll_interval = Duration::from_millis(20);

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(format!("ngspice timed out after {} seconds", timeout.as_secs()));
                }
                std::thread::sleep(poll_interval);
            }
            Err(e) => return Err(format!("ngspice execution failed: {}", e)),
        }
    };

    let join = |handle: Option<std::thread::JoinHandle<Vec<u8>>>| {
        handle.and_then(|h| h.join().ok()).unwrap_or_default()
    };
    Ok(Output {
        status,
        stdout: join(stdout),
        stderr: join(stderr),
    })
}

fn drain(mut stream: impl Read) -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = stream.read_to_end(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NgspiceConfig::default();
        assert_eq!(config.executable, "ngspice");
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_missing_executable_fails_construction() {
        let config = NgspiceConfig {
            executable: "/nonexistent/ngspice".to_string(),
            ..NgspiceConfig::default()
        };
        assert!(matches!(
            NgspiceEngine::create(config),
            Err(EngineError::Construction(_))
        ));
    }
}
