//! Sync trigger scheduling: debounce, serialized switches, readiness.
//!
//! Three trigger classes reach the orchestrator: debounced edits (one
//! sync per quiet period, last call wins), immediate events (pause,
//! puzzle switch, day switch), and the one-shot bulk trigger after
//! login, gated on host readiness.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Quiet period before a coalesced edit burst syncs.
pub const DEBOUNCE_DELAY: Duration = Duration::from_secs(5);

/// How long to wait for the host before giving up on the bulk trigger.
pub const READY_CEILING: Duration = Duration::from_secs(5);

/// Coalesces rapid calls into one delayed execution.
///
/// Each `call` supersedes the previous one only while it is still
/// waiting out the quiet period. A job that has started running always
/// finishes: supersession is decided by a generation check after the
/// sleep and never by aborting the task.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Schedule `fut` to run after the quiet period, superseding any
    /// not-yet-fired previous call.
    pub fn call<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            fut.await;
        });
    }

    /// Drop any pending call without running it. Has no effect on a
    /// call that already started.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Single-worker mailbox serializing switch operations.
///
/// Rapid puzzle or day switches must not interleave their
/// persist-then-restore phases; each enqueued job runs to completion
/// before the next starts. There is no cancellation: a job that has
/// begun always finishes.
#[derive(Debug, Clone)]
pub struct SwitchQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl SwitchQueue {
    /// Spawn the worker. Requires a running tokio runtime.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job.await;
            }
        });
        Self { tx }
    }

    /// Queue a job behind everything already enqueued. Returns false if
    /// the worker has shut down.
    pub fn enqueue<F>(&self, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tx.send(Box::pin(fut)).is_ok()
    }
}

impl Default for SwitchQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot readiness signal from the host.
///
/// The host flips it once its puzzle set and game state are loaded;
/// the bulk trigger waits on it up to a wall-clock ceiling instead of
/// polling.
#[derive(Debug, Clone)]
pub struct Readiness {
    tx: Arc<watch::Sender<bool>>,
}

impl Readiness {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(watch::channel(false).0),
        }
    }

    /// Host signals that puzzle data and game state are available.
    pub fn signal_ready(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until ready or the ceiling passes. Returns whether the host
    /// became ready.
    pub async fn wait(&self, ceiling: Duration) -> bool {
        if self.is_ready() {
            return true;
        }
        let mut rx = self.tx.subscribe();
        tokio::time::timeout(ceiling, rx.wait_for(|ready| *ready))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false)
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}
