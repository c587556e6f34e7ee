//! Run driver: owns the engine thread and the run state machine.
//!
//! The engine runs on a dedicated thread and pulls commands through
//! [`EngineHost::next_command`]. Before every pull it calls
//! [`EngineHost::on_idle_pull`], where the driver:
//!
//! 1. If the command feed is idle and a run is in flight, reads and decodes
//!    the output file and resolves that run's future. The first idle ever
//!    also completes initialization.
//! 2. If the feed is idle, blocks on the run-request channel. This is the
//!    only suspension point. A request installs its command sequence and
//!    writes its netlist before the engine continues.
//! 3. Otherwise returns immediately so the engine keeps consuming the
//!    current sequence.
//!
//! Requests queue on a single channel, so runs complete in request order.

use std::future::Future;
use std::io;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use spicelink_raw::SimResult;
use tokio::sync::{mpsc, oneshot, watch};

use crate::command::{CommandFeed, CommandSequence};
use crate::config::DriverConfig;
use crate::diagnostics::Diagnostics;
use crate::engine::{EngineFactory, EngineHost, FileStore};
use crate::error::{Error, Result};

/// Lifecycle state of a driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No engine yet.
    Created,
    /// Engine thread started, first idle not reached.
    Initializing,
    /// Engine suspended, waiting for a run.
    Idle,
    /// Engine consuming a run's command sequence.
    Running,
    /// Terminal: construction failed or the engine stopped.
    Failed(String),
}

impl Phase {
    pub fn is_ready(&self) -> bool {
        matches!(self, Phase::Idle | Phase::Running)
    }

    fn is_settled(&self) -> bool {
        !matches!(self, Phase::Created | Phase::Initializing)
    }
}

struct RunRequest {
    netlist: String,
    sequence: CommandSequence,
    responder: oneshot::Sender<Result<SimResult>>,
}

/// State shared between the caller side and the engine thread.
struct Shared {
    phase: watch::Sender<Phase>,
    diagnostics: Mutex<Diagnostics>,
    constructions: AtomicUsize,
    initialized: AtomicBool,
}

impl Shared {
    fn diagnostics(&self) -> MutexGuard<'_, Diagnostics> {
        lock(&self.diagnostics)
    }

    fn set_phase(&self, phase: Phase) {
        log::debug!("driver phase -> {:?}", phase);
        self.phase.send_replace(phase);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What the engine thread needs; taken by the first `start`.
struct Launch {
    factory: Box<dyn EngineFactory>,
    requests: mpsc::UnboundedReceiver<RunRequest>,
}

/// Drives one engine instance for its whole lifetime.
pub struct RunDriver {
    config: Arc<DriverConfig>,
    shared: Arc<Shared>,
    requests: mpsc::UnboundedSender<RunRequest>,
    launch: Mutex<Option<Launch>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl RunDriver {
    pub fn new(factory: impl EngineFactory, config: DriverConfig) -> Self {
        let (requests, receiver) = mpsc::unbounded_channel();
        let (phase, _) = watch::channel(Phase::Created);

        Self {
            shared: Arc::new(Shared {
                phase,
                diagnostics: Mutex::new(Diagnostics::new(&config)),
                constructions: AtomicUsize::new(0),
                initialized: AtomicBool::new(false),
            }),
            config: Arc::new(config),
            requests,
            launch: Mutex::new(Some(Launch {
                factory: Box::new(factory),
                requests: receiver,
            })),
            thread: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.shared.phase.borrow().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::SeqCst)
    }

    /// Number of times the engine factory has been invoked (0 or 1).
    pub fn engine_constructions(&self) -> usize {
        self.shared.constructions.load(Ordering::SeqCst)
    }

    /// Diagnostic text of the current run.
    pub fn info(&self) -> String {
        self.shared.diagnostics().info()
    }

    /// Diagnostic text captured up to the engine's first idle.
    pub fn init_info(&self) -> String {
        self.shared.diagnostics().init_info().to_string()
    }

    /// Error lines of the current run.
    pub fn errors(&self) -> Vec<String> {
        self.shared.diagnostics().errors().to_vec()
    }

    /// Start the engine and wait for its first idle.
    ///
    /// Idempotent: every call shares the one engine, and calls made while
    /// it initializes wait on the same transition.
    pub async fn start(&self) -> Result<()> {
        self.launch()?;
        wait_ready(self.shared.clone()).await
    }

    /// Queue a run of `netlist` with `sequence`.
    ///
    /// The request is queued when this is called, not when the future is
    /// first polled, so runs execute in call order. The future resolves to
    /// exactly this run's result.
    pub fn run(
        &self,
        netlist: String,
        sequence: CommandSequence,
    ) -> impl Future<Output = Result<SimResult>> + Send + 'static {
        let (responder, response) = oneshot::channel();
        let queued = self.launch().and_then(|()| {
            self.requests
                .send(RunRequest {
                    netlist,
                    sequence,
                    responder,
                })
                .map_err(|_| Error::EngineStopped)
        });
        let shared = self.shared.clone();

        async move {
            wait_ready(shared).await?;
            queued?;
            response.await.map_err(|_| Error::EngineStopped)?
        }
    }

    /// Stop accepting runs and wait for the engine thread to exit.
    ///
    /// Blocks until any in-flight run finishes its sequence.
    pub fn shutdown(self) {
        let RunDriver {
            requests, thread, ..
        } = self;
        drop(requests);

        let handle = thread.into_inner().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::warn!("engine thread panicked during shutdown");
            }
        }
    }

    /// Spawn the engine thread unless already done.
    fn launch(&self) -> Result<()> {
        let Some(Launch { factory, requests }) = lock(&self.launch).take() else {
            return Ok(());
        };

        self.shared.set_phase(Phase::Initializing);
        let shared = self.shared.clone();
        let config = self.config.clone();
        let spawned = thread::Builder::new()
            .name("spicelink-engine".to_string())
            .spawn(move || engine_main(factory, requests, shared, config));

        match spawned {
            Ok(handle) => {
                *lock(&self.thread) = Some(handle);
                Ok(())
            }
            Err(e) => {
                let message = format!("failed to spawn engine thread: {}", e);
                self.shared.set_phase(Phase::Failed(message.clone()));
                Err(Error::Construction(message))
            }
        }
    }
}

async fn wait_ready(shared: Arc<Shared>) -> Result<()> {
    let mut phase = shared.phase.subscribe();
    let settled = phase
        .wait_for(Phase::is_settled)
        .await
        .map_err(|_| Error::EngineStopped)?
        .clone();

    match settled {
        Phase::Failed(message) if !shared.initialized.load(Ordering::SeqCst) => {
            Err(Error::Construction(message))
        }
        Phase::Failed(_) => Err(Error::EngineStopped),
        _ => Ok(()),
    }
}

fn engine_main(
    factory: Box<dyn EngineFactory>,
    requests: mpsc::UnboundedReceiver<RunRequest>,
    shared: Arc<Shared>,
    config: Arc<DriverConfig>,
) {
    shared.constructions.fetch_add(1, Ordering::SeqCst);
    let mut engine = match factory.construct() {
        Ok(engine) => engine,
        Err(e) => {
            log::warn!("engine construction failed: {}", e);
            shared.set_phase(Phase::Failed(e.to_string()));
            return;
        }
    };
    log::info!("engine constructed");

    let mut host = DriverHost::new(config, shared.clone(), requests);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| engine.run(&mut host)));

    match outcome {
        Ok(Ok(())) if host.shutdown => log::debug!("engine left its loop"),
        Ok(Ok(())) => shared.set_phase(Phase::Failed("engine exited unexpectedly".to_string())),
        Ok(Err(e)) => {
            log::warn!("engine failed: {}", e);
            shared.set_phase(Phase::Failed(e.to_string()));
        }
        Err(_) => {
            log::warn!("engine panicked");
            shared.set_phase(Phase::Failed("engine panicked".to_string()));
        }
    }
}

/// The driver's side of the engine callbacks. Lives on the engine thread.
struct DriverHost {
    config: Arc<DriverConfig>,
    shared: Arc<Shared>,
    requests: mpsc::UnboundedReceiver<RunRequest>,
    feed: CommandFeed,
    in_flight: Option<oneshot::Sender<Result<SimResult>>>,
    initialized: bool,
    shutdown: bool,
}

impl DriverHost {
    fn new(
        config: Arc<DriverConfig>,
        shared: Arc<Shared>,
        requests: mpsc::UnboundedReceiver<RunRequest>,
    ) -> Self {
        Self {
            feed: CommandFeed::new(&config),
            config,
            shared,
            requests,
            in_flight: None,
            initialized: false,
            shutdown: false,
        }
    }

    /// Decode the finished run's output and resolve its future.
    fn complete(&mut self, responder: oneshot::Sender<Result<SimResult>>, fs: &dyn FileStore) {
        let result = read_output(fs, &self.config.output_path);
        match &result {
            Ok(r) => log::debug!(
                "run completed: {} variables x {} points",
                r.num_variables,
                r.num_points
            ),
            Err(e) => log::warn!("run failed: {}", e),
        }
        self.shared.set_phase(Phase::Idle);
        if responder.send(result).is_err() {
            log::debug!("run result dropped: caller went away");
        }
    }

    fn initialize(&mut self) {
        self.initialized = true;
        self.shared.diagnostics().snapshot_init();
        self.shared.initialized.store(true, Ordering::SeqCst);
        self.shared.set_phase(Phase::Idle);
        log::info!("engine initialized");
    }

    /// Block until the next run request; `Break` once the driver is gone.
    fn suspend(&mut self, fs: &mut dyn FileStore) -> ControlFlow<()> {
        log::debug!("waiting for next run");
        while let Some(request) = self.requests.blocking_recv() {
            if self.release(request, fs) {
                return ControlFlow::Continue(());
            }
        }
        self.shutdown = true;
        ControlFlow::Break(())
    }

    /// Prepare the file store and feed for a run. Only called at cursor 0.
    fn release(&mut self, request: RunRequest, fs: &mut dyn FileStore) -> bool {
        let RunRequest {
            netlist,
            sequence,
            responder,
        } = request;

        self.shared.diagnostics().clear();

        let prepared = fs
            .remove_file(&self.config.output_path)
            .and_then(|()| fs.write_file(&self.config.netlist_path, netlist.as_bytes()));
        if let Err(e) = prepared {
            log::warn!("failed to prepare run: {}", e);
            let _ = responder.send(Err(Error::Io(e)));
            return false;
        }

        log::debug!("releasing engine for {:?} run", sequence.mode());
        self.feed.install(sequence);
        self.in_flight = Some(responder);
        self.shared.set_phase(Phase::Running);
        true
    }
}

impl EngineHost for DriverHost {
    fn on_before_run(&mut self, fs: &mut dyn FileStore) {
        for (path, text) in &self.config.preload_files {
            if let Err(e) = fs.write_file(path, text.as_bytes()) {
                log::warn!("failed to preload {}: {}", path, e);
            }
        }
    }

    fn on_stdout(&mut self, line: &str) {
        self.shared.diagnostics().stdout(line);
    }

    fn on_stderr(&mut self, line: &str) {
        self.shared.diagnostics().stderr(line);
    }

    fn on_idle_pull(&mut self, fs: &mut dyn FileStore) -> ControlFlow<()> {
        if !self.feed.is_idle() {
            return ControlFlow::Continue(());
        }

        if let Some(responder) = self.in_flight.take() {
            self.complete(responder, fs);
        }
        if !self.initialized {
            self.initialize();
        }
        self.suspend(fs)
    }

    fn next_command(&mut self) -> String {
        let command = self.feed.next();
        log::debug!("cmd -> {:?}", command);
        command
    }
}

fn read_output(fs: &dyn FileStore, path: &str) -> Result<SimResult> {
    let bytes = match fs.read_file(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::MissingOutput(path.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(spicelink_raw::decode(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::AnalysisMode;
    use crate::engine::MemoryFs;
    use crate::engine::scripted::encode_plot;

    fn host() -> (DriverHost, mpsc::UnboundedSender<RunRequest>) {
        let config = DriverConfig::default();
        let (tx, rx) = mpsc::unbounded_channel();
        let (phase, _) = watch::channel(Phase::Initializing);
        let shared = Arc::new(Shared {
            phase,
            diagnostics: Mutex::new(Diagnostics::new(&config)),
            constructions: AtomicUsize::new(1),
            initialized: AtomicBool::new(false),
        });
        (DriverHost::new(Arc::new(config), shared, rx), tx)
    }

    fn request(
        netlist: &str,
        config: &DriverConfig,
    ) -> (RunRequest, oneshot::Receiver<Result<SimResult>>) {
        let (responder, response) = oneshot::channel();
        let request = RunRequest {
            netlist: netlist.to_string(),
            sequence: CommandSequence::for_netlist(netlist, config),
            responder,
        };
        (request, response)
    }

    #[test]
    fn test_one_cycle() {
        let (mut host, tx) = host();
        let mut fs = MemoryFs::new();
        let config = host.config.clone();

        let (req, mut response) = request("* rc\n.tran 1u 1m\n", &config);
        tx.send(req).ok();

        // First idle: initializes, then releases the queued run.
        assert!(host.on_idle_pull(&mut fs).is_continue());
        assert!(host.shared.initialized.load(Ordering::SeqCst));
        assert_eq!(*host.shared.phase.borrow(), Phase::Running);
        assert_eq!(fs.read_file("/test.cir").unwrap(), b"* rc\n.tran 1u 1m\n");

        let mut pulled = Vec::new();
        loop {
            let command = host.next_command();
            if host.feed.is_idle() {
                break;
            }
            pulled.push(command);
            assert!(host.on_idle_pull(&mut fs).is_continue());
            assert!(response.try_recv().is_err());
        }
        assert_eq!(
            pulled,
            vec![" ", "source /test.cir", "destroy all", "run", "write out.raw"]
        );

        let raw = encode_plot("Transient Analysis", false, &[("time", "time")], &[vec![0.0]]);
        fs.write_file("out.raw", &raw).unwrap();

        // Sequence exhausted: decode, resolve, then shut down on closed channel.
        drop(tx);
        assert!(host.on_idle_pull(&mut fs).is_break());
        let result = response.try_recv().unwrap().unwrap();
        assert_eq!(result.variable_names, vec!["time"]);
        assert_eq!(*host.shared.phase.borrow(), Phase::Idle);
    }

    #[test]
    fn test_stale_output_is_not_reused() {
        let (mut host, tx) = host();
        let mut fs = MemoryFs::new();
        let config = host.config.clone();

        let raw = encode_plot("Transient Analysis", false, &[("time", "time")], &[vec![0.0]]);
        fs.write_file("out.raw", &raw).unwrap();

        let (req, mut response) = request("* noise\n.noise v(2) vin dec 2 1 10Meg\n", &config);
        tx.send(req).ok();
        assert!(host.on_idle_pull(&mut fs).is_continue());
        assert_eq!(host.feed.sequence().mode(), AnalysisMode::Noise);
        assert!(!fs.contains("out.raw"));

        while {
            host.next_command();
            !host.feed.is_idle()
        } {}

        drop(tx);
        assert!(host.on_idle_pull(&mut fs).is_break());
        assert!(matches!(
            response.try_recv().unwrap(),
            Err(Error::MissingOutput(_))
        ));
    }

    #[test]
    fn test_mid_sequence_pull_does_not_block() {
        let (mut host, tx) = host();
        let mut fs = MemoryFs::new();
        let config = host.config.clone();
        let (req, _response) = request("* rc\n", &config);
        tx.send(req).ok();

        assert!(host.on_idle_pull(&mut fs).is_continue());
        host.next_command();
        // Channel is empty; a blocking receive here would hang the test.
        assert!(host.on_idle_pull(&mut fs).is_continue());
    }
}
