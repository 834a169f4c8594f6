//! Observability: tracing setup and dispatch counters

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Installs the global `fmt` subscriber, honouring `RUST_LOG`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Counters for one dispatch queue and the tasks delivering through it
#[derive(Debug, Default)]
pub struct Metrics {
    jobs_submitted: AtomicU64,
    jobs_executed: AtomicU64,
    jobs_dropped: AtomicU64,
    jobs_panicked: AtomicU64,
    decode_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_submitted(&self) {
        self.jobs_submitted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "jobs_submitted", "Metric incremented");
    }

    pub fn job_executed(&self) {
        self.jobs_executed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "jobs_executed", "Metric incremented");
    }

    /// A job could not be queued because the queue was already gone
    pub fn job_dropped(&self) {
        self.jobs_dropped.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_dropped", "Metric incremented");
    }

    pub fn job_panicked(&self) {
        self.jobs_panicked.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_panicked", "Metric incremented");
    }

    pub fn decode_failed(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "decode_failures", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_submitted: self.jobs_submitted.load(Ordering::Relaxed),
            jobs_executed: self.jobs_executed.load(Ordering::Relaxed),
            jobs_dropped: self.jobs_dropped.load(Ordering::Relaxed),
            jobs_panicked: self.jobs_panicked.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub jobs_submitted: u64,
    pub jobs_executed: u64,
    pub jobs_dropped: u64,
    pub jobs_panicked: u64,
    pub decode_failures: u64,
}
