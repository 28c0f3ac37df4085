//! The scanner runtime
//!
//! Three workers run concurrently on the tokio runtime:
//! - reaper: sweeps the timeout store on a fixed interval
//! - scanner (tail): follows the log file and records matched addresses
//! - handler (signals): waits for SIGINT/SIGTERM
//!
//! Whichever worker exits first triggers the coordinator, which tears the
//! others down. `Scanner::run` returns the first worker error.

pub mod matcher;
pub mod reaper;
pub mod shutdown;
pub mod signals;
pub mod tail;

pub use matcher::PatternSet;
pub use shutdown::{Coordinator, Worker};

use crate::error::{Result, ScannerError};
use crate::events;
use crate::hook::{CommandLine, Hook};
use crate::store::{TimeoutStore, WatchlistStore};
use log::{debug, error, info};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// Everything the core needs, already resolved by the configuration layer
#[derive(Debug, Clone, Serialize)]
pub struct ScannerSettings {
    pub log_file: PathBuf,
    pub address_file: PathBuf,
    pub timeout_dir: PathBuf,
    pub patterns: Vec<String>,
    pub address_timeout: Duration,
    pub tick_interval: Duration,
    pub follow: CommandLine,
    pub add_command: Option<CommandLine>,
    pub delete_command: Option<CommandLine>,
}

/// State shared by the workers
pub(crate) struct Shared {
    pub(crate) settings: ScannerSettings,
    pub(crate) patterns: PatternSet,
    pub(crate) watchlist: WatchlistStore,
    pub(crate) timeouts: TimeoutStore,
    pub(crate) add_hook: Option<Hook>,
    pub(crate) delete_hook: Option<Hook>,
    pub(crate) coordinator: Coordinator,
    pub(crate) tasks: TaskTracker,
}

type WorkerHandle = (Worker, JoinHandle<Result<()>>);

/// Log-driven address table maintainer
///
/// Cloning yields another handle to the same scanner, so one task can `run`
/// while another calls `stop`.
#[derive(Clone)]
pub struct Scanner {
    shared: Arc<Shared>,
    workers: Arc<Mutex<WorkerState>>,
}

#[derive(Default)]
struct WorkerState {
    started: bool,
    handles: Vec<WorkerHandle>,
}

impl Scanner {
    /// Validate settings, prepare both stores, and reconcile them
    ///
    /// Every watched address without a timeout record gets a fresh one. A
    /// malformed watchlist line is fatal.
    pub fn new(settings: ScannerSettings) -> Result<Self> {
        if settings.address_timeout.is_zero() {
            return Err(ScannerError::InvalidDuration {
                name: "timeout",
                reason: "must be greater than zero",
            });
        }
        if settings.tick_interval.is_zero() {
            return Err(ScannerError::InvalidDuration {
                name: "interval",
                reason: "must be greater than zero",
            });
        }

        let patterns = PatternSet::compile(&settings.patterns)?;
        let timeouts = TimeoutStore::open(&settings.timeout_dir, settings.address_timeout)?;
        let watchlist = WatchlistStore::open(&settings.address_file)?;

        for addr in watchlist.read()? {
            if !timeouts.exists(&addr) {
                let expires_at = timeouts.refresh(&addr)?;
                info!(
                    "restored missing timeout for {} (expires {})",
                    addr,
                    crate::store::timeout::format_timestamp(expires_at)
                );
            }
        }

        let add_hook = settings.add_command.clone().map(Hook::add);
        let delete_hook = settings.delete_command.clone().map(Hook::delete);

        if let Ok(json) = serde_json::to_string(&settings) {
            debug!("scanner settings: {}", json);
        }

        Ok(Self {
            shared: Arc::new(Shared {
                settings,
                patterns,
                watchlist,
                timeouts,
                add_hook,
                delete_hook,
                coordinator: Coordinator::new(),
                tasks: TaskTracker::new(),
            }),
            workers: Arc::new(Mutex::new(WorkerState::default())),
        })
    }

    pub fn settings(&self) -> &ScannerSettings {
        &self.shared.settings
    }

    pub fn watchlist(&self) -> &WatchlistStore {
        &self.shared.watchlist
    }

    pub fn timeouts(&self) -> &TimeoutStore {
        &self.shared.timeouts
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.shared.coordinator
    }

    /// Launch the workers one at a time
    ///
    /// Each worker signals once its setup is complete (for the tail worker:
    /// process spawned and readers running) before the next is spawned, so
    /// an early failure always finds the earlier workers registered.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.workers.lock().await;
        if state.started {
            return Ok(());
        }
        state.started = true;

        events::scanner_startup(
            &self.shared.settings.log_file,
            &self.shared.settings.address_file,
            std::process::id(),
        );

        let shared = &self.shared;
        state
            .handles
            .push(self.spawn_worker(Worker::Reaper, |started| reaper::run(shared.clone(), started)).await);
        state
            .handles
            .push(self.spawn_worker(Worker::Tail, |started| tail::run(shared.clone(), started)).await);
        state
            .handles
            .push(self.spawn_worker(Worker::Signals, |started| signals::run(shared.clone(), started)).await);
        Ok(())
    }

    async fn spawn_worker<F, Fut>(&self, worker: Worker, body: F) -> WorkerHandle
    where
        F: FnOnce(oneshot::Sender<()>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let (started_tx, started_rx) = oneshot::channel();
        let shared = self.shared.clone();
        let registered = shared.coordinator.register(worker);
        let fut = body(started_tx);

        let handle = self.shared.tasks.spawn(async move {
            if !registered {
                return Ok(());
            }
            // the body runs in its own task so a panic still reaches shutdown
            let result = match tokio::spawn(fut).await {
                Ok(result) => result,
                Err(e) => Err(ScannerError::WorkerPanicked {
                    worker: worker.name(),
                    detail: e.to_string(),
                }),
            };
            info!("{}: exiting", worker);
            shared.coordinator.deregister(worker);
            shared.coordinator.shutdown(worker.name()).await;
            result
        });

        // a worker that fails during setup drops the sender without signalling
        if started_rx.await.is_err() {
            debug!("{}: exited before completing startup", worker);
        }
        (worker, handle)
    }

    /// Run until every worker has exited; returns the first worker error
    ///
    /// Only the first caller collects worker results. A concurrent caller
    /// waits for the same workers and returns `Ok`; once the workers have
    /// finished, `run` returns immediately.
    pub async fn run(&self) -> Result<()> {
        self.start().await?;

        let handles = std::mem::take(&mut self.workers.lock().await.handles);

        debug!("run: waiting on workers...");
        self.shared.tasks.close();
        self.shared.tasks.wait().await;
        debug!("run: all workers have exited");

        let mut first: Option<ScannerError> = None;
        for (worker, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(ScannerError::WorkerPanicked {
                    worker: worker.name(),
                    detail: e.to_string(),
                }),
            };
            if let Err(err) = result {
                if first.is_none() {
                    first = Some(err);
                } else {
                    error!("{}: {}", worker, err);
                }
            }
        }

        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Request a clean stop from outside the workers
    pub async fn stop(&self) {
        self.shared.coordinator.stop().await;
    }
}
