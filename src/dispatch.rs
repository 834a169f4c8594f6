//! Serial dispatch queue for typed callbacks
//!
//! Every [`DispatchQueue`] owns a single consumer loop spawned on tokio.
//! Jobs run one at a time in submission order on tokio's blocking pool, so a
//! callback may block without stalling the runtime. Distinct queues are
//! independent of each other.
//!
//! Handlers never hold a [`DispatchQueue`] directly. They keep a
//! [`WeakDispatcher`], which does not keep the queue open: once every strong
//! handle is dropped the loop drains what is already queued and exits, and
//! later submissions through the weak handle are discarded.

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task;
use tracing::{debug, error, warn};

use crate::observability::Metrics;

/// Unit of work executed on a dispatch queue
pub type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Job(Job),
    /// Answered by the loop once every earlier job has run and been counted
    Barrier(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct DispatchQueue {
    tx: mpsc::UnboundedSender<Message>,
    label: Arc<str>,
    metrics: Arc<Metrics>,
}

impl DispatchQueue {
    /// Spawn a queue on the current tokio runtime
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn(label: impl Into<String>) -> Self {
        Self::spawn_on(&Handle::current(), label)
    }

    /// Spawn a queue on the given runtime handle
    pub fn spawn_on(handle: &Handle, label: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let label: Arc<str> = Arc::from(label.into());
        let metrics = Arc::new(Metrics::new());

        handle.spawn(run_queue(rx, label.clone(), metrics.clone()));
        debug!(queue = %label, "Dispatch queue spawned");

        Self { tx, label, metrics }
    }

    /// Queue a job. Returns `false` if the consumer loop is no longer running.
    pub fn submit<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match self.tx.send(Message::Job(Box::new(job))) {
            Ok(()) => {
                self.metrics.job_submitted();
                true
            }
            Err(_) => {
                self.metrics.job_dropped();
                warn!(queue = %self.label, "Dispatch queue closed, job dropped");
                false
            }
        }
    }

    pub fn downgrade(&self) -> WeakDispatcher {
        WeakDispatcher {
            tx: self.tx.downgrade(),
            label: self.label.clone(),
            metrics: self.metrics.clone(),
        }
    }

    /// Wait until every job submitted before this call has run
    ///
    /// The barrier is not a job: it does not show up in the metrics, and the
    /// counters already include every earlier job when it resolves. Returns
    /// `false` if the queue stopped before reaching the barrier.
    pub async fn barrier(&self) -> bool {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Message::Barrier(done_tx)).is_err() {
            return false;
        }
        done_rx.await.is_ok()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

impl std::fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("label", &self.label)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Non-owning handle to a [`DispatchQueue`]
#[derive(Clone)]
pub struct WeakDispatcher {
    tx: mpsc::WeakUnboundedSender<Message>,
    label: Arc<str>,
    metrics: Arc<Metrics>,
}

impl WeakDispatcher {
    pub fn upgrade(&self) -> Option<DispatchQueue> {
        let tx = self.tx.upgrade()?;
        Some(DispatchQueue {
            tx,
            label: self.label.clone(),
            metrics: self.metrics.clone(),
        })
    }

    /// Queue a job if the queue is still alive; a no-op otherwise
    pub fn submit<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match self.upgrade() {
            Some(queue) => queue.submit(job),
            None => {
                self.metrics.job_dropped();
                warn!(queue = %self.label, "Dispatch queue released, job discarded");
                false
            }
        }
    }
}

impl std::fmt::Debug for WeakDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakDispatcher")
            .field("label", &self.label)
            .finish()
    }
}

async fn run_queue(mut rx: mpsc::UnboundedReceiver<Message>, label: Arc<str>, metrics: Arc<Metrics>) {
    while let Some(message) = rx.recv().await {
        let job = match message {
            Message::Job(job) => job,
            Message::Barrier(done) => {
                let _ = done.send(());
                continue;
            }
        };

        // Awaiting the blocking task keeps jobs strictly one at a time
        match task::spawn_blocking(job).await {
            Ok(()) => metrics.job_executed(),
            Err(e) if e.is_panic() => {
                metrics.job_panicked();
                error!(queue = %label, "Dispatched callback panicked");
            }
            Err(e) => {
                warn!(queue = %label, error = %e, "Dispatched callback cancelled");
            }
        }
    }
    debug!(queue = %label, "Dispatch queue drained and stopped");
}
