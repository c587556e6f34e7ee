//! Caller-facing simulation handle.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use spicelink_raw::SimResult;

use crate::command::CommandSequence;
use crate::config::DriverConfig;
use crate::driver::{Phase, RunDriver};
use crate::engine::{EngineFactory, NgspiceConfig, NgspiceEngine};
use crate::error::Result;

struct Netlist {
    text: String,
    sequence: CommandSequence,
}

/// A simulation session bound to one engine instance.
///
/// ```no_run
/// # async fn demo() -> spicelink::Result<()> {
/// use spicelink::{DriverConfig, NgspiceConfig, Simulation};
///
/// let sim = Simulation::ngspice(NgspiceConfig::default(), DriverConfig::default());
/// sim.start().await?;
/// sim.set_netlist("Divider\nV1 1 0 DC 10\nR1 1 2 1k\nR2 2 0 1k\n.op\n.end\n");
/// let result = sim.run_sim().await?;
/// println!("{:?}", result.variable_names);
/// # Ok(())
/// # }
/// ```
pub struct Simulation {
    driver: RunDriver,
    netlist: Mutex<Netlist>,
}

impl Simulation {
    pub fn new(factory: impl EngineFactory) -> Self {
        Self::with_config(factory, DriverConfig::default())
    }

    pub fn with_config(factory: impl EngineFactory, config: DriverConfig) -> Self {
        let netlist = Netlist {
            text: String::new(),
            sequence: CommandSequence::for_netlist("", &config),
        };
        Self {
            driver: RunDriver::new(factory, config),
            netlist: Mutex::new(netlist),
        }
    }

    /// Session driving the `ngspice` executable.
    pub fn ngspice(ngspice: NgspiceConfig, config: DriverConfig) -> Self {
        Self::with_config(move || NgspiceEngine::create(ngspice), config)
    }

    /// Start the engine; resolves once it first goes idle.
    pub async fn start(&self) -> Result<()> {
        self.driver.start().await
    }

    /// Replace the netlist used by subsequent runs.
    ///
    /// Runs already requested keep the netlist they were requested with.
    pub fn set_netlist(&self, text: impl Into<String>) {
        let text = text.into();
        let sequence = CommandSequence::for_netlist(&text, self.driver.config());
        log::debug!("netlist set ({} bytes, {:?} mode)", text.len(), sequence.mode());
        *self.netlist.lock().unwrap_or_else(PoisonError::into_inner) = Netlist { text, sequence };
    }

    /// Run the current netlist.
    ///
    /// Starts the engine if needed. Overlapping calls queue; each future
    /// resolves to its own run's result.
    pub fn run_sim(&self) -> impl Future<Output = Result<SimResult>> + Send + 'static {
        let (text, sequence) = {
            let netlist = self.netlist.lock().unwrap_or_else(PoisonError::into_inner);
            (netlist.text.clone(), netlist.sequence.clone())
        };
        self.driver.run(text, sequence)
    }

    /// Commands the next run will be fed.
    pub fn command_list(&self) -> Vec<String> {
        self.netlist
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sequence
            .commands()
            .to_vec()
    }

    /// Diagnostic text of the most recently released run.
    pub fn info(&self) -> String {
        self.driver.info()
    }

    /// Diagnostic text captured during initialization.
    pub fn init_info(&self) -> String {
        self.driver.init_info()
    }

    /// Error lines of the most recently released run.
    pub fn errors(&self) -> Vec<String> {
        self.driver.errors()
    }

    pub fn is_initialized(&self) -> bool {
        self.driver.is_initialized()
    }

    pub fn phase(&self) -> Phase {
        self.driver.phase()
    }

    pub fn engine_constructions(&self) -> usize {
        self.driver.engine_constructions()
    }

    /// Stop the engine, waiting for any in-flight run to finish.
    pub fn shutdown(self) {
        self.driver.shutdown();
    }
}
