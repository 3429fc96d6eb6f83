use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Shared counters tracking the progress of one analysis run.
///
/// Updated lock-free from the discovery thread, the dispatch loop, and
/// every worker; read by the monitor thread and the final summary.
#[derive(Debug, Default)]
pub struct RunCounters {
    discovered: AtomicUsize,
    dispatched: AtomicUsize,
    completed: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    proc_nanos: AtomicU64,
    proc_samples: AtomicUsize,
}

impl RunCounters {
    pub fn note_discovered(&self) {
        self.discovered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one finished task and its processing time.
    pub fn note_completed(&self, elapsed: Duration) {
        self.proc_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
        self.proc_samples.fetch_add(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn discovered(&self) -> usize {
        self.discovered.load(Ordering::Relaxed)
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Tasks dispatched but not yet completed.
    pub fn in_flight(&self) -> usize {
        self.dispatched().saturating_sub(self.completed())
    }

    /// Mean processing time across all completed tasks.
    pub fn mean_proc_time(&self) -> Duration {
        let samples = self.proc_samples.load(Ordering::Relaxed);
        if samples == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.proc_nanos.load(Ordering::Relaxed) / samples as u64)
    }
}

/// Final report of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub worker_threads: usize,
    /// Pathways emitted by the discovery thread.
    pub discovered: usize,
    /// Tasks handed to the worker pool.
    pub dispatched: usize,
    /// Tasks that ran to completion (scored, skipped, duplicate, or failed).
    pub completed: usize,
    /// Pathways skipped: not featured in the dataset or unfeasible scores.
    pub skipped: usize,
    /// Tasks that errored during scoring.
    pub failed: usize,
    /// Scored pathways in the results map.
    pub results: usize,
    /// Discovery duplicates dropped after the first insertion.
    pub duplicates: usize,
    pub mean_proc_time_ms: f64,
}

impl RunSummary {
    /// Every completed task must be accounted for as a result, a
    /// duplicate, a skip, or a failure.
    pub fn is_consistent(&self) -> bool {
        self.completed == self.results + self.duplicates + self.skipped + self.failed
    }
}
