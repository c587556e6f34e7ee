//! The engine collaborator.
//!
//! An engine is a synchronous program organized as a perpetual input-pull
//! loop. It runs on a dedicated thread owned by the driver and calls back
//! into an [`EngineHost`] for every line it prints and every command it
//! needs. Blocking inside [`EngineHost::on_idle_pull`] suspends the engine
//! without unwinding its state.

pub mod fs;
pub mod interpreter;
pub mod ngspice;
pub mod scripted;

use std::ops::ControlFlow;

use thiserror::Error;

pub use fs::{DirFs, FileStore, MemoryFs};
pub use interpreter::{Backend, CommandEngine};
pub use ngspice::{NgspiceBackend, NgspiceConfig, NgspiceEngine, is_ngspice_available};
pub use scripted::{ScriptedBackend, ScriptedEngine};

/// Errors raised by an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine could not be constructed.
    #[error("{0}")]
    Construction(String),

    /// The engine loop failed.
    #[error("engine failed: {0}")]
    Failed(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Callbacks an engine makes into its host, always on the engine thread.
pub trait EngineHost {
    /// Called once, before the first pull.
    fn on_before_run(&mut self, fs: &mut dyn FileStore);

    fn on_stdout(&mut self, line: &str);

    fn on_stderr(&mut self, line: &str);

    /// Called before every [`next_command`](Self::next_command).
    ///
    /// May block. `Break` tells the engine to leave its loop.
    fn on_idle_pull(&mut self, fs: &mut dyn FileStore) -> ControlFlow<()>;

    /// The next command to execute.
    fn next_command(&mut self) -> String;
}

/// A long-running engine.
pub trait Engine {
    /// Run the pull loop until the host answers `Break`.
    fn run(&mut self, host: &mut dyn EngineHost) -> Result<(), EngineError>;
}

/// Builds the engine. Invoked at most once per driver, on the engine thread.
pub trait EngineFactory: Send + 'static {
    fn construct(self: Box<Self>) -> Result<Box<dyn Engine>, EngineError>;
}

impl<F, E> EngineFactory for F
where
    F: FnOnce() -> Result<E, EngineError> + Send + 'static,
    E: Engine + 'static,
{
    fn construct(self: Box<Self>) -> Result<Box<dyn Engine>, EngineError> {
        let engine = (*self)()?;
        Ok(Box::new(engine))
    }
}
