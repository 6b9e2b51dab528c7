//! Bounded worker queue with deduplicated submission.
//!
//! A fixed set of tokio tasks pulls items from a shared pending list. An
//! item is identified by a dedupe key: while one item with a key is queued
//! or in flight, further submissions with that key are rejected. Every item
//! a worker picks up yields exactly one [`WorkResult`], delivered on an
//! unbounded channel.
//!
//! Processing closures receive the queue's cancellation flag and are
//! expected to poll it at their I/O boundaries. A panic inside one item is
//! caught and recorded as that item's failure.

use std::collections::{HashSet, VecDeque};
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

use crate::error::QueueError;

/// Worker count bounds for [`auto_worker_count`].
pub const MIN_WORKERS: usize = 3;
pub const MAX_WORKERS: usize = 8;

/// Hard limit per item. A process future running longer is dropped and
/// recorded as a failure so one hung item cannot stall its worker forever.
const SAFETY_TIMEOUT: Duration = Duration::from_secs(120);

/// Worker count sized to the machine, clamped to `MIN_WORKERS..=MAX_WORKERS`.
pub fn auto_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_WORKERS)
        .clamp(MIN_WORKERS, MAX_WORKERS)
}

/// Result record for one processed item.
#[derive(Debug)]
pub struct WorkResult<O> {
    pub key: String,
    pub worker: usize,
    pub elapsed: Duration,
    pub outcome: Result<O, String>,
}

impl<O> WorkResult<O> {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Per-worker counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerDetail {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub busy: Duration,
    /// Dedupe key of the item in flight, if any.
    pub current: Option<String>,
}

/// Snapshot of queue progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkStats {
    pub queued: usize,
    pub processing: usize,
    pub completed: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Items dropped unprocessed by a hard stop.
    pub dropped: u64,
    pub workers: Vec<WorkerDetail>,
}

struct State<W> {
    pending: VecDeque<(String, W)>,
    /// Keys queued or in flight.
    active: HashSet<String>,
    accepting: bool,
    /// No more work will arrive; idle workers exit.
    closed: bool,
    stats: WorkStats,
}

struct Shared<W> {
    state: Mutex<State<W>>,
    wake: Notify,
    cancel: Arc<AtomicBool>,
}

impl<W> Shared<W> {
    fn lock(&self) -> std::sync::MutexGuard<'_, State<W>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

type ProcessFn<W, O> = Arc<dyn Fn(W, Arc<AtomicBool>) -> BoxFuture<'static, Result<O, String>> + Send + Sync>;

/// A pool of workers processing deduplicated items.
///
/// ```ignore
/// let mut queue = WorkerQueue::new(4, |job: Job, cancel| async move { run(job, &cancel).await });
/// queue.start()?;
/// queue.submit("job-1", job);
/// queue.stop(true);
/// while let Some(result) = queue.recv().await { /* ... */ }
/// ```
pub struct WorkerQueue<W: Send + 'static, O: Send + 'static> {
    shared: Arc<Shared<W>>,
    process: ProcessFn<W, O>,
    worker_count: usize,
    result_tx: Option<mpsc::UnboundedSender<WorkResult<O>>>,
    result_rx: mpsc::UnboundedReceiver<WorkResult<O>>,
    handles: Vec<JoinHandle<()>>,
}

impl<W: Send + 'static, O: Send + 'static> WorkerQueue<W, O> {
    /// Create a stopped queue with `workers` workers (at least one).
    pub fn new<F, Fut, E>(workers: usize, process_fn: F) -> Self
    where
        F: Fn(W, Arc<AtomicBool>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
        E: Display,
    {
        let workers = workers.max(1);
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let process: ProcessFn<W, O> = Arc::new(move |item, cancel| {
            process_fn(item, cancel)
                .map(|r| r.map_err(|e| e.to_string()))
                .boxed()
        });
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    pending: VecDeque::new(),
                    active: HashSet::new(),
                    accepting: true,
                    closed: false,
                    stats: WorkStats {
                        workers: vec![WorkerDetail::default(); workers],
                        ..WorkStats::default()
                    },
                }),
                wake: Notify::new(),
                cancel: Arc::new(AtomicBool::new(false)),
            }),
            process,
            worker_count: workers,
            result_tx: Some(result_tx),
            result_rx,
            handles: Vec::new(),
        }
    }

    /// Share an external cancellation flag (e.g. the CLI's Ctrl-C flag).
    ///
    /// Only takes effect before [`start`](Self::start); once workers hold
    /// the shared state the queue keeps its own flag and logs a warning.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        match Arc::get_mut(&mut self.shared) {
            Some(shared) => shared.cancel = flag,
            None => log::warn!("Worker queue already running; external cancel flag ignored"),
        }
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shared.cancel)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Spawn the workers. Items submitted before `start` wait in the queue.
    pub fn start(&mut self) -> Result<(), QueueError> {
        if !self.handles.is_empty() {
            return Err(QueueError::AlreadyStarted);
        }
        let Some(result_tx) = self.result_tx.take() else {
            return Err(QueueError::Stopped);
        };
        self.handles = (0..self.worker_count)
            .map(|index| {
                let shared = Arc::clone(&self.shared);
                let process = Arc::clone(&self.process);
                let result_tx = result_tx.clone();
                tokio::spawn(run_worker(index, shared, process, result_tx))
            })
            .collect();
        log::debug!("Worker queue started with {} workers", self.worker_count);
        Ok(())
    }

    /// Queue an item. Returns `false` if an item with the same key is
    /// already queued or in flight, or the queue no longer accepts work.
    pub fn submit(&self, key: impl Into<String>, item: W) -> bool {
        let key = key.into();
        {
            let mut state = self.shared.lock();
            if !state.accepting || !state.active.insert(key.clone()) {
                log::debug!("Rejected duplicate or late submission '{key}'");
                return false;
            }
            state.pending.push_back((key, item));
            state.stats.queued = state.pending.len();
        }
        self.shared.wake.notify_one();
        true
    }

    /// Stop accepting work.
    ///
    /// Graceful: workers finish everything already queued, then exit.
    /// Hard: the pending list is dropped unprocessed and the cancellation
    /// flag is raised for in-flight items.
    pub fn stop(&self, graceful: bool) {
        {
            let mut state = self.shared.lock();
            state.accepting = false;
            state.closed = true;
            if !graceful {
                let drained: Vec<_> = state.pending.drain(..).collect();
                let dropped = drained.len();
                for (key, _) in drained {
                    state.active.remove(&key);
                }
                state.stats.queued = 0;
                state.stats.dropped += dropped as u64;
                if dropped > 0 {
                    log::debug!("Hard stop dropped {dropped} queued items");
                }
            }
        }
        if !graceful {
            self.shared.cancel.store(true, Ordering::SeqCst);
        }
        self.shared.wake.notify_waiters();
    }

    /// Current counters, safe to call while workers run.
    pub fn stats(&self) -> WorkStats {
        self.shared.lock().stats.clone()
    }

    /// Next result. `None` once the queue is stopped and every worker exited.
    pub async fn recv(&mut self) -> Option<WorkResult<O>> {
        self.result_rx.recv().await
    }

    /// Wait for every worker to exit. Call after [`stop`](Self::stop).
    pub async fn join(&mut self) -> Result<(), QueueError> {
        for handle in self.handles.drain(..) {
            handle.await?;
        }
        Ok(())
    }

    /// Stop gracefully and collect every remaining result.
    pub async fn drain(mut self) -> (Vec<WorkResult<O>>, WorkStats) {
        self.stop(true);
        self.result_tx = None;
        let mut results = Vec::new();
        while let Some(r) = self.result_rx.recv().await {
            results.push(r);
        }
        let stats = self.stats();
        (results, stats)
    }
}

async fn run_worker<W: Send + 'static, O: Send + 'static>(
    index: usize,
    shared: Arc<Shared<W>>,
    process: ProcessFn<W, O>,
    result_tx: mpsc::UnboundedSender<WorkResult<O>>,
) {
    loop {
        let next = {
            let mut state = shared.lock();
            match state.pending.pop_front() {
                Some((key, item)) => {
                    state.stats.queued = state.pending.len();
                    state.stats.processing += 1;
                    state.stats.workers[index].current = Some(key.clone());
                    Some((key, item))
                }
                None if state.closed => break,
                None => None,
            }
        };

        let Some((key, item)) = next else {
            // A short poll bounds the window where a stop notification
            // lands between the empty check and the wait.
            let _ = tokio::time::timeout(Duration::from_millis(200), shared.wake.notified()).await;
            continue;
        };

        let started = Instant::now();
        let outcome = if shared.cancel.load(Ordering::SeqCst) {
            Err("cancelled before start".to_string())
        } else {
            let fut = AssertUnwindSafe(process(item, Arc::clone(&shared.cancel))).catch_unwind();
            match tokio::time::timeout(SAFETY_TIMEOUT, fut).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => {
                    log::warn!("Worker {index}: item '{key}' panicked");
                    Err("panicked".to_string())
                }
                Err(_) => {
                    log::warn!(
                        "Worker {index}: item '{key}' timed out after {}s",
                        SAFETY_TIMEOUT.as_secs()
                    );
                    Err("timed out".to_string())
                }
            }
        };
        let elapsed = started.elapsed();

        {
            let mut state = shared.lock();
            state.active.remove(&key);
            state.stats.processing -= 1;
            state.stats.completed += 1;
            let ok = outcome.is_ok();
            if ok {
                state.stats.succeeded += 1;
            } else {
                state.stats.failed += 1;
            }
            let detail = &mut state.stats.workers[index];
            detail.processed += 1;
            detail.busy += elapsed;
            detail.current = None;
            if ok {
                detail.succeeded += 1;
            } else {
                detail.failed += 1;
            }
        }

        let result = WorkResult {
            key,
            worker: index,
            elapsed,
            outcome,
        };
        if result_tx.send(result).is_err() {
            log::debug!("Worker {index}: result receiver dropped");
        }
    }
    log::debug!("Worker {index} exiting");
}

#[cfg(test)]
#[path = "tests/worker_queue_tests.rs"]
mod tests;
