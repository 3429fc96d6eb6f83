//! Periodic checkpoint logging for a running analysis.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use tracing::info;

use enrich_catalog::PathwayId;

use crate::metrics::RunCounters;
use crate::result::ResultsMap;

/// How often the monitor re-checks the stop flag while sleeping.
const STOP_POLL: Duration = Duration::from_millis(250);

/// Snapshot of the run state at one checkpoint.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    pub query_queue: usize,
    pub in_flight: usize,
    pub completed: usize,
    pub results: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Checkpoint {
    pub fn capture(
        queue: &Receiver<PathwayId>,
        counters: &RunCounters,
        results: &ResultsMap,
    ) -> Self {
        Self {
            query_queue: queue.len(),
            in_flight: counters.in_flight(),
            completed: counters.completed(),
            results: results.len(),
            duplicates: results.duplicates(),
            skipped: counters.skipped(),
            failed: counters.failed(),
        }
    }

    /// Every completed task must be a result, a duplicate, a skip, or a
    /// failure. A false value here means tasks are being lost.
    pub fn is_consistent(&self) -> bool {
        self.completed == self.results + self.duplicates + self.skipped + self.failed
    }
}

/// Spawn the monitor thread logging a checkpoint every `interval`.
///
/// A final checkpoint is logged when the stop flag is raised, so the last
/// line of monitor output always reflects the finished run.
pub fn spawn(
    interval: Duration,
    stop: Arc<AtomicBool>,
    queue: Receiver<PathwayId>,
    counters: Arc<RunCounters>,
    results: Arc<ResultsMap>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("enrich-monitor-thread".to_string())
        .spawn(move || {
            let mut counter = 0usize;
            loop {
                counter += 1;
                log_checkpoint(counter, &queue, &counters, &results);

                let deadline = Instant::now() + interval;
                while Instant::now() < deadline {
                    if stop.load(Ordering::Relaxed) {
                        log_checkpoint(counter + 1, &queue, &counters, &results);
                        return;
                    }
                    thread::sleep(STOP_POLL.min(deadline.saturating_duration_since(Instant::now())));
                }
            }
        })
}

fn log_checkpoint(
    counter: usize,
    queue: &Receiver<PathwayId>,
    counters: &RunCounters,
    results: &ResultsMap,
) {
    let cp = Checkpoint::capture(queue, counters, results);
    info!(
        checkpoint = counter,
        query_queue = cp.query_queue,
        in_flight = cp.in_flight,
        completed = cp.completed,
        results = cp.results,
        duplicates = cp.duplicates,
        skipped = cp.skipped,
        failed = cp.failed,
        sanity = cp.is_consistent(),
        "checkpoint"
    );
}
