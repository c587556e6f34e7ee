//! Async driver for a long-running, pull-driven SPICE engine.
//!
//! The engine is synchronous and asks its host for one command at a time.
//! This crate runs it on a dedicated thread and exposes an async API:
//! set a netlist, run it, and await the decoded result. Overlapping runs
//! queue and complete in request order.
//!
//! # Example
//!
//! ```
//! use spicelink::engine::ScriptedEngine;
//! use spicelink::engine::scripted::encode_plot;
//! use spicelink::{EngineError, Simulation};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let sim = Simulation::new(|| {
//!     Ok::<_, EngineError>(ScriptedEngine::scripted(|_netlist: &str| {
//!         Ok(encode_plot("Operating Point", false, &[("v(2)", "voltage")], &[vec![5.0]]))
//!     }))
//! });
//!
//! sim.set_netlist("Divider\nV1 1 0 DC 10\nR1 1 2 1k\nR2 2 0 1k\n.op\n.end\n");
//! let result = sim.run_sim().await.unwrap();
//! assert_eq!(result.variable_names, vec!["v(2)"]);
//! # });
//! ```

pub mod command;
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod engine;
pub mod error;
pub mod simulation;

pub use command::{AnalysisMode, CommandFeed, CommandSequence};
pub use config::DriverConfig;
pub use diagnostics::{DiagnosticFilter, Diagnostics};
pub use driver::{Phase, RunDriver};
pub use engine::{Engine, EngineError, EngineFactory, EngineHost, FileStore, NgspiceConfig};
pub use error::{Error, Result};
pub use simulation::Simulation;

pub use spicelink_raw::{ComplexNumber, DataSeries, DataType, Samples, SimResult, VariableKind};
