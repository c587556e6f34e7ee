//! A command-interpreting engine over a pluggable simulation backend.
//!
//! Understands the driver's command vocabulary:
//! - `source <path>`: select the netlist file
//! - `destroy all`: drop all plots from previous runs
//! - `run`: simulate the sourced netlist; the last plot produced becomes current
//! - `setplot <type><n>`: make the n-th plot of a type current (`noise1`, `tran1`, ...)
//! - `write <path>`: write the current plot as a binary rawfile
//! - blank: no-op

use std::ops::Range;
use std::sync::{Arc, Mutex, PoisonError};

use spicelink_raw::parse_header;

use super::fs::FileStore;
use super::{Engine, EngineError, EngineHost};

/// Produces rawfile bytes for a netlist.
pub trait Backend {
    /// Simulate the netlist stored at `netlist_path` (contents in `netlist`).
    ///
    /// Returns the rawfile, possibly holding several concatenated plots.
    /// Progress lines go to `host`.
    fn simulate(
        &mut self,
        netlist_path: &str,
        netlist: &[u8],
        host: &mut dyn EngineHost,
    ) -> Result<Vec<u8>, String>;
}

/// One plot sliced out of a multi-plot rawfile.
#[derive(Debug, Clone)]
struct Plot {
    plotname: String,
    bytes: Vec<u8>,
}

/// Engine that executes textual commands against a [`FileStore`].
pub struct CommandEngine<B, F> {
    backend: B,
    fs: F,
    sourced: Option<String>,
    plots: Vec<Plot>,
    current: Option<usize>,
    transcript: Option<Arc<Mutex<Vec<String>>>>,
}

impl<B: Backend, F: FileStore> CommandEngine<B, F> {
    pub fn new(backend: B, fs: F) -> Self {
        Self {
            backend,
            fs,
            sourced: None,
            plots: Vec::new(),
            current: None,
            transcript: None,
        }
    }

    /// Record every executed command into `transcript`.
    pub fn with_transcript(mut self, transcript: Arc<Mutex<Vec<String>>>) -> Self {
        self.transcript = Some(transcript);
        self
    }

    fn execute(&mut self, command: &str, host: &mut dyn EngineHost) {
        if let Some(transcript) = &self.transcript {
            transcript
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(command.to_string());
        }

        let command = command.trim();
        let (verb, arg) = match command.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (command, ""),
        };

        match verb {
            "" => {}
            "source" => self.source(arg, host),
            "destroy" => {
                self.plots.clear();
                self.current = None;
            }
            "run" => self.run_sourced(host),
            "setplot" => self.setplot(arg, host),
            "write" => self.write(arg, host),
            _ => host.on_stderr(&format!("{}: no such command available", verb)),
        }
    }

    fn source(&mut self, path: &str, host: &mut dyn EngineHost) {
        match self.fs.read_file(path) {
            Ok(netlist) => {
                let title = String::from_utf8_lossy(&netlist)
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                host.on_stdout(&format!("Circuit: {}", title));
                self.sourced = Some(path.to_string());
            }
            Err(e) => {
                host.on_stderr(&format!("Error: can't open {}: {}", path, e));
                self.sourced = None;
            }
        }
    }

    fn run_sourced(&mut self, host: &mut dyn EngineHost) {
        let Some(path) = self.sourced.clone() else {
            host.on_stderr("Error: there aren't any circuits loaded.");
            return;
        };
        let netlist = match self.fs.read_file(&path) {
            Ok(netlist) => netlist,
            Err(e) => {
                host.on_stderr(&format!("Error: can't open {}: {}", path, e));
                return;
            }
        };

        match self.backend.simulate(&path, &netlist, host) {
            Ok(raw) => {
                for range in split_plots(&raw) {
                    let bytes = raw[range].to_vec();
                    let plotname = plotname(&bytes);
                    self.plots.push(Plot { plotname, bytes });
                }
                self.current = self.plots.len().checked_sub(1);
            }
            Err(message) => host.on_stderr(&format!("Error: simulation failed: {}", message)),
        }
    }

    fn setplot(&mut self, name: &str, host: &mut dyn EngineHost) {
        match find_plot(&self.plots, name) {
            Some(index) => self.current = Some(index),
            None => host.on_stderr(&format!("Error: no such plot {}", name)),
        }
    }

    fn write(&mut self, path: &str, host: &mut dyn EngineHost) {
        let Some(plot) = self.current.and_then(|i| self.plots.get(i)) else {
            host.on_stderr("Error: no plot to write");
            return;
        };
        if let Err(e) = self.fs.write_file(path, &plot.bytes) {
            host.on_stderr(&format!("Error: can't write {}: {}", path, e));
        }
    }
}

impl<B: Backend, F: FileStore> Engine for CommandEngine<B, F> {
    fn run(&mut self, host: &mut dyn EngineHost) -> Result<(), EngineError> {
        host.on_before_run(&mut self.fs);
        loop {
            if host.on_idle_pull(&mut self.fs).is_break() {
                return Ok(());
            }
            let command = host.next_command();
            self.execute(&command, host);
        }
    }
}

/// Byte ranges of the plots in a (possibly multi-plot) binary rawfile.
///
/// Plot sizes come from each header; anything unparsable, or a size that
/// overflows, is kept as one trailing plot.
fn split_plots(raw: &[u8]) -> Vec<Range<usize>> {
    const MARKER: &[u8] = b"Binary:";

    let mut plots = Vec::new();
    let mut start = 0;
    while start < raw.len() {
        let rest = &raw[start..];
        let size = rest
            .windows(MARKER.len())
            .position(|w| w == MARKER)
            .and_then(|marker| {
                let header = String::from_utf8_lossy(&rest[..marker]);
                let param = parse_header(&format!("{}\n", header)).ok()?;
                let width = match param.data_type {
                    spicelink_raw::DataType::Real => 8,
                    spicelink_raw::DataType::Complex => 16,
                };
                param
                    .num_variables
                    .checked_mul(param.num_points)?
                    .checked_mul(width)?
                    .checked_add(marker + 8)
            })
            .unwrap_or(rest.len())
            .min(rest.len());
        plots.push(start..start + size);
        start += size;
    }
    plots
}

fn plotname(plot: &[u8]) -> String {
    String::from_utf8_lossy(plot)
        .lines()
        .take_while(|line| !line.starts_with("Binary:"))
        .find_map(|line| line.strip_prefix("Plotname:"))
        .map(|name| name.trim().to_lowercase())
        .unwrap_or_default()
}

/// Resolve a plot name like `noise1` or `tran2` to an index.
fn find_plot(plots: &[Plot], name: &str) -> Option<usize> {
    let split = name.find(|c: char| c.is_ascii_digit())?;
    let (kind, ordinal) = name.split_at(split);
    let ordinal: usize = ordinal.parse().ok()?;
    let keyword = match kind.to_lowercase().as_str() {
        "noise" => "noise",
        "tran" => "transient",
        "ac" => "ac analysis",
        "dc" => "dc transfer",
        "op" => "operating point",
        _ => return None,
    };

    plots
        .iter()
        .enumerate()
        .filter(|(_, plot)| plot.plotname.contains(keyword))
        .nth(ordinal.checked_sub(1)?)
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plot(plotname: &str, values: &[f64]) -> Vec<u8> {
        let mut bytes = format!(
            "Title: t\nPlotname: {}\nFlags: real\nNo. Variables: 1\nNo. Points: {}\n\
Variables:\n\t0\tfrequency\tfrequency\nBinary:\n",
            plotname,
            values.len()
        )
        .into_bytes();
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_split_plots() {
        let first = plot("Noise Spectral Density Curves", &[1.0, 2.0]);
        let second = plot("Integrated Noise", &[3.0]);
        let raw = [first.clone(), second.clone()].concat();

        let ranges = split_plots(&raw);
        assert_eq!(ranges, vec![0..first.len(), first.len()..raw.len()]);
        assert_eq!(plotname(&raw[ranges[1].clone()]), "integrated noise");
    }

    #[test]
    fn test_split_unparsable_is_one_plot() {
        let raw = b"garbage without a header".to_vec();
        assert_eq!(split_plots(&raw), vec![0..raw.len()]);
    }

    #[test]
    fn test_split_oversized_header_is_one_plot() {
        let mut raw = b"Title: t\nPlotname: Transient Analysis\nFlags: real\nNo. Variables: 4\n\
No. Points: 4611686018427387904\nVariables:\n\t0\ttime\ttime\n\t1\ta\tvoltage\n\
\t2\tb\tvoltage\n\t3\tc\tvoltage\nBinary:\n"
            .to_vec();
        raw.extend_from_slice(&1.0f64.to_le_bytes());
        assert_eq!(split_plots(&raw), vec![0..raw.len()]);
    }

    #[test]
    fn test_find_plot() {
        let plots = vec![
            Plot {
                plotname: "noise spectral density curves".to_string(),
                bytes: Vec::new(),
            },
            Plot {
                plotname: "integrated noise".to_string(),
                bytes: Vec::new(),
            },
        ];
        assert_eq!(find_plot(&plots, "noise1"), Some(0));
        assert_eq!(find_plot(&plots, "noise2"), Some(1));
        assert_eq!(find_plot(&plots, "noise3"), None);
        assert_eq!(find_plot(&plots, "tran1"), None);
        assert_eq!(find_plot(&plots, "noise0"), None);
    }
}
