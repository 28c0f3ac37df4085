//! Shutdown coordination across the scanner workers
//!
//! Any worker exiting, or an external stop request, runs the teardown exactly
//! once: kill the follow process, then cancel the stop token of every worker
//! still registered as active. Tokens may be cancelled any number of times.

use crate::events;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use tokio::process::Child;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// The three long-running workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Worker {
    Reaper,
    Tail,
    Signals,
}

impl Worker {
    pub const ALL: [Worker; 3] = [Worker::Reaper, Worker::Tail, Worker::Signals];

    pub fn name(&self) -> &'static str {
        match self {
            Worker::Reaper => "reaper",
            Worker::Tail => "scanner",
            Worker::Signals => "handler",
        }
    }

    fn index(&self) -> usize {
        match self {
            Worker::Reaper => 0,
            Worker::Tail => 1,
            Worker::Signals => 2,
        }
    }
}

impl fmt::Display for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub struct Coordinator {
    /// Workers currently inside their event loop
    active: StdMutex<HashSet<Worker>>,
    /// Set once teardown begins; later registrations are refused
    closing: AtomicBool,
    /// Guards the teardown body and records its first caller
    first_caller: Mutex<Option<String>>,
    stops: [CancellationToken; 3],
    tail: Mutex<Option<Child>>,
    teardowns: AtomicUsize,
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            active: StdMutex::new(HashSet::new()),
            closing: AtomicBool::new(false),
            first_caller: Mutex::new(None),
            stops: [
                CancellationToken::new(),
                CancellationToken::new(),
                CancellationToken::new(),
            ],
            tail: Mutex::new(None),
            teardowns: AtomicUsize::new(0),
        }
    }

    /// Stop token observed by `worker`
    pub fn stop_token(&self, worker: Worker) -> CancellationToken {
        self.stops[worker.index()].clone()
    }

    /// Mark a worker active; refused once shutdown has begun
    pub fn register(&self, worker: Worker) -> bool {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if self.closing.load(Ordering::SeqCst) {
            debug!("{}: shutdown in progress, not starting", worker);
            return false;
        }
        active.insert(worker);
        true
    }

    pub fn deregister(&self, worker: Worker) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&worker);
    }

    pub fn is_active(&self, worker: Worker) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&worker)
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// Number of times the teardown body has run (at most one)
    pub fn teardowns(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }

    /// Hand the running follow process to the coordinator
    ///
    /// If teardown already ran, the process is killed here instead.
    pub async fn attach_tail(&self, mut child: Child) {
        let mut slot = self.tail.lock().await;
        if self.is_closing() {
            warn!("scanner: shutdown in progress, killing new tail process");
            kill_child(&mut child, "scanner").await;
            return;
        }
        *slot = Some(child);
    }

    /// Take back the follow process after its output closed on its own
    ///
    /// Returns `None` when teardown has already killed it.
    pub async fn detach_tail(&self) -> Option<Child> {
        self.tail.lock().await.take()
    }

    /// Idempotent teardown; only the first caller does any work
    pub async fn shutdown(&self, caller: &str) {
        debug!("shutdown[{}]: awaiting lock", caller);
        let mut first_caller = self.first_caller.lock().await;
        debug!("shutdown[{}]: got lock", caller);

        if let Some(first) = first_caller.as_deref() {
            debug!("shutdown[{}]: already called by {}", caller, first);
            return;
        }
        *first_caller = Some(caller.to_string());
        self.closing.store(true, Ordering::SeqCst);
        self.teardowns.fetch_add(1, Ordering::SeqCst);

        match self.tail.lock().await.take() {
            Some(mut child) => kill_child(&mut child, caller).await,
            None => debug!("shutdown[{}]: tail process inactive", caller),
        }

        let targets: Vec<Worker> = {
            let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            Worker::ALL
                .into_iter()
                .filter(|w| active.contains(w))
                .collect()
        };
        for worker in Worker::ALL {
            if targets.contains(&worker) {
                info!("shutdown[{}]: sending {} stop", caller, worker);
                self.stops[worker.index()].cancel();
            } else {
                debug!("shutdown[{}]: {} already stopped", caller, worker);
            }
        }

        events::scanner_shutdown(caller);
    }

    /// External stop: run the teardown, then cancel every token
    pub async fn stop(&self) {
        self.shutdown("stop").await;
        for token in &self.stops {
            token.cancel();
        }
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

async fn kill_child(child: &mut Child, caller: &str) {
    match child.id() {
        Some(pid) => debug!("shutdown[{}]: killing tail process {}", caller, pid),
        None => debug!("shutdown[{}]: tail process already reaped", caller),
    }
    if let Err(e) = child.start_kill() {
        warn!("shutdown[{}]: tail kill failed: {}", caller, e);
    }
    match child.wait().await {
        Ok(status) => debug!("shutdown[{}]: tail wait returned: {}", caller, status),
        Err(e) => warn!("shutdown[{}]: tail wait failed: {}", caller, e),
    }
}
