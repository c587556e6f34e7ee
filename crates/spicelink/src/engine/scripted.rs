//! In-memory engine whose `run` is a caller-supplied function.
//!
//! Used to exercise the driver without an ngspice installation.

use super::fs::MemoryFs;
use super::interpreter::{Backend, CommandEngine};
use super::EngineHost;

type SimulateFn = dyn FnMut(&str) -> Result<Vec<u8>, String> + Send;

/// Backend mapping netlist text to rawfile bytes.
pub struct ScriptedBackend {
    simulate: Box<SimulateFn>,
}

impl ScriptedBackend {
    pub fn new(simulate: impl FnMut(&str) -> Result<Vec<u8>, String> + Send + 'static) -> Self {
        Self {
            simulate: Box::new(simulate),
        }
    }
}

impl Backend for ScriptedBackend {
    fn simulate(
        &mut self,
        _netlist_path: &str,
        netlist: &[u8],
        host: &mut dyn EngineHost,
    ) -> Result<Vec<u8>, String> {
        host.on_stderr("Using SPARSE 1.3 as Direct Linear Solver");
        let raw = (self.simulate)(&String::from_utf8_lossy(netlist))?;
        host.on_stdout("Done.");
        Ok(raw)
    }
}

/// Engine over an in-memory file store.
pub type ScriptedEngine = CommandEngine<ScriptedBackend, MemoryFs>;

impl ScriptedEngine {
    pub fn scripted(
        simulate: impl FnMut(&str) -> Result<Vec<u8>, String> + Send + 'static,
    ) -> Self {
        CommandEngine::new(ScriptedBackend::new(simulate), MemoryFs::new())
    }
}

/// Encode one binary plot the way ngspice lays it out.
///
/// `points[p]` holds the values of every variable at point `p`; complex
/// plots hold interleaved (real, imaginary) pairs.
pub fn encode_plot(
    plotname: &str,
    complex: bool,
    variables: &[(&str, &str)],
    points: &[Vec<f64>],
) -> Vec<u8> {
    let mut header = format!(
        "Title: scripted\nDate: Thu Jan  1 00:00:00  1970\nPlotname: {}\nFlags: {}\n\
No. Variables: {}\nNo. Points: {}\nVariables:\n",
        plotname,
        if complex { "complex" } else { "real" },
        variables.len(),
        points.len()
    );
    for (i, (name, kind)) in variables.iter().enumerate() {
        header.push_str(&format!("\t{}\t{}\t{}\n", i, name, kind));
    }
    header.push_str("Binary:\n");

    let mut bytes = header.into_bytes();
    for value in points.iter().flatten() {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_plot_decodes() {
        let raw = encode_plot(
            "Transient Analysis",
            false,
            &[("time", "time"), ("v(1)", "voltage")],
            &[vec![0.0, 1.0], vec![1e-3, 0.5]],
        );
        let result = spicelink_raw::decode(&raw).unwrap();
        assert_eq!(result.variable_names, vec!["time", "v(1)"]);
        assert_eq!(result.num_points, 2);
    }
}
