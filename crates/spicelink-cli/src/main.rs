//! Spicelink command-line interface.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use spicelink::{DriverConfig, NgspiceConfig, Simulation};
use spicelink_raw::{Tolerances, compare, snapshot};

#[derive(Parser)]
#[command(name = "spicelink")]
#[command(about = "Run SPICE netlists through ngspice and emit decoded results", long_about = None)]
#[command(version)]
struct Cli {
    /// Input netlist files, run in order on one engine
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<PathBuf>,

    /// Driver configuration (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// ngspice executable
    #[arg(long, default_value = "ngspice")]
    ngspice: String,

    /// Timeout for one ngspice invocation, in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Directory to write one JSON snapshot per input (default: print to stdout)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Directory of reference snapshots to compare each result against
    #[arg(long, value_name = "DIR")]
    reference: Option<PathBuf>,

    /// Relative tolerance for reference comparison
    #[arg(long, default_value_t = 1e-6)]
    rel_tol: f64,

    /// Print engine diagnostics
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DriverConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DriverConfig::default(),
    };
    let ngspice = NgspiceConfig {
        executable: cli.ngspice.clone(),
        timeout_secs: cli.timeout,
    };

    let sim = Simulation::ngspice(ngspice, config);
    sim.start().await.context("failed to start ngspice engine")?;
    if cli.verbose {
        eprint!("{}", sim.init_info());
    }

    let mut failures = 0;
    for input in &cli.inputs {
        if !run_one(&sim, input, &cli).await? {
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{} of {} runs did not match their reference", failures, cli.inputs.len());
    }
    Ok(())
}

/// Run one netlist; returns false if it disagrees with its reference.
async fn run_one(sim: &Simulation, input: &Path, cli: &Cli) -> Result<bool> {
    let netlist = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let name = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "result".to_string());

    sim.set_netlist(netlist);
    let result = sim.run_sim().await;

    if cli.verbose {
        eprint!("{}", sim.info());
    }
    for line in sim.errors() {
        log::warn!("{}: {}", name, line);
    }
    let result = result.with_context(|| format!("simulation of {} failed", input.display()))?;

    match &cli.output {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let path = dir.join(format!("{}.json", name));
            snapshot::save(&path, &result)?;
            log::info!("wrote {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    let Some(dir) = &cli.reference else {
        return Ok(true);
    };
    let reference = snapshot::load(&dir.join(format!("{}.json", name)))?;
    let tolerances = Tolerances::default().with_rel(cli.rel_tol);
    let report = compare(&reference, &result, &tolerances)
        .with_context(|| format!("{} does not match its reference", name))?;
    eprint!("{}: {}", name, report.to_text());
    Ok(report.passed)
}
