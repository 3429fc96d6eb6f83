//! Concurrent analysis scheduler.
//!
//! One discovery thread walks the dataset's protein universe and streams
//! every pathway containing an observed protein into a bounded channel.
//! The dispatch loop drains the channel and hands each pathway to a fixed
//! worker pool for scoring, while a monitor thread logs periodic
//! checkpoints. Dropping the sender ends the stream, so no sentinel value
//! is needed; a closed, empty channel is the termination signal.

pub mod monitor;


use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use thiserror::Error;
use tracing::{error, info, warn};

use enrich_catalog::{PathwayCatalog, PathwayId};
use enrich_core::{AnalysisConfig, Dataset, EnrichError};

use crate::metrics::{RunCounters, RunSummary};
use crate::result::ResultsMap;
use crate::scoring::score_pathway;

/// Seconds granted per in-flight task (scaled by pool size) when waiting
/// for the pool to drain after discovery ends.
const SHUTDOWN_SECS_PER_TASK: u64 = 10;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error(transparent)]
    Config(#[from] EnrichError),

    #[error("Failed to build the worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to spawn the {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },
}

/// Drives one full analysis run: discovery, dispatch, scoring, shutdown.
pub struct AnalysisEngine {
    catalog: Arc<dyn PathwayCatalog>,
    config: AnalysisConfig,
}

impl AnalysisEngine {
    pub fn new(catalog: Arc<dyn PathwayCatalog>, config: AnalysisConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the analysis over a dataset and return the run summary.
    ///
    /// The dataset is finalized here if the caller has not done so
    /// already. Scored pathways land in the returned [`ResultsMap`];
    /// per-pathway scoring failures are logged and counted but do not
    /// abort the run.
    pub fn run(&self, mut dataset: Dataset) -> Result<(Arc<ResultsMap>, RunSummary), SchedulerError> {
        self.config.validate()?;
        let started_at = Utc::now();

        if !dataset.is_finalized() {
            dataset.finalize(&self.config, &mut rand::thread_rng())?;
        }
        let dataset = Arc::new(dataset);

        let pool_size = self.config.resolved_worker_threads();
        info!(
            workers = pool_size,
            queue_capacity = self.config.queue_capacity,
            "analysis engine running"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(pool_size)
            .thread_name(|i| format!("enrich-pool-thread-{}", i + 1))
            .build()?;

        let (tx, rx) = bounded::<PathwayId>(self.config.queue_capacity);
        let counters = Arc::new(RunCounters::default());
        let results = Arc::new(ResultsMap::new());

        let discovery = self.spawn_discovery(tx, Arc::clone(&dataset), Arc::clone(&counters))?;

        let monitor_stop = Arc::new(AtomicBool::new(false));
        let monitor = monitor::spawn(
            Duration::from_secs(self.config.monitor_interval_seconds),
            Arc::clone(&monitor_stop),
            rx.clone(),
            Arc::clone(&counters),
            Arc::clone(&results),
        )
        .map_err(|source| SchedulerError::Spawn { name: "monitor", source })?;

        self.dispatch(&pool, &rx, &dataset, &counters, &results);

        if discovery.join().is_err() {
            error!("discovery thread panicked");
        }
        info!("all pathways queried and queued, draining the worker pool");

        self.await_drain(&counters, pool_size);

        monitor_stop.store(true, Ordering::Relaxed);
        if monitor.join().is_err() {
            error!("monitor thread panicked");
        }

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            worker_threads: pool_size,
            discovered: counters.discovered(),
            dispatched: counters.dispatched(),
            completed: counters.completed(),
            skipped: counters.skipped(),
            failed: counters.failed(),
            results: results.len(),
            duplicates: results.duplicates(),
            mean_proc_time_ms: counters.mean_proc_time().as_secs_f64() * 1000.0,
        };
        info!(
            completed = summary.completed,
            results = summary.results,
            duplicates = summary.duplicates,
            skipped = summary.skipped,
            failed = summary.failed,
            mean_proc_time_ms = summary.mean_proc_time_ms,
            consistent = summary.is_consistent(),
            "analysis run finished"
        );

        Ok((results, summary))
    }

    /// Start the discovery thread streaming pathways into the channel.
    ///
    /// The sender is moved into the thread and dropped on exit, which
    /// closes the channel and lets the dispatch loop terminate.
    fn spawn_discovery(
        &self,
        tx: Sender<PathwayId>,
        dataset: Arc<Dataset>,
        counters: Arc<RunCounters>,
    ) -> Result<thread::JoinHandle<()>, SchedulerError> {
        let catalog = Arc::clone(&self.catalog);
        thread::Builder::new()
            .name("enrich-query-thread".to_string())
            .spawn(move || {
                for acc in dataset.protein_ids() {
                    let paths = match catalog.pathways_containing(acc) {
                        Ok(paths) => paths,
                        Err(e) => {
                            error!(accession = %acc, error = %e, "catalog lookup failed, skipping accession");
                            continue;
                        }
                    };
                    for path in paths {
                        counters.note_discovered();
                        // A send error means the run was torn down early.
                        if tx.send(path).is_err() {
                            return;
                        }
                    }
                }
                info!(total = counters.discovered(), "pathway discovery finished");
            })
            .map_err(|source| SchedulerError::Spawn { name: "discovery", source })
    }

    /// Drain the channel and hand each pathway to the worker pool.
    fn dispatch(
        &self,
        pool: &rayon::ThreadPool,
        rx: &Receiver<PathwayId>,
        dataset: &Arc<Dataset>,
        counters: &Arc<RunCounters>,
        results: &Arc<ResultsMap>,
    ) {
        let poll_timeout = Duration::from_secs(self.config.poll_timeout_seconds);
        loop {
            match rx.recv_timeout(poll_timeout) {
                Ok(pathway) => {
                    counters.note_dispatched();
                    let dataset = Arc::clone(dataset);
                    let catalog = Arc::clone(&self.catalog);
                    let counters = Arc::clone(counters);
                    let results = Arc::clone(results);
                    let config = self.config.clone();
                    pool.spawn(move || {
                        let t0 = Instant::now();
                        run_task(&pathway, &dataset, &*catalog, &config, &results, &counters);
                        counters.note_completed(t0.elapsed());
                    });
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!("timed out while waiting for a pathway");
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// Wait for in-flight tasks, bounded by a deadline proportional to the
    /// number of remaining tasks per worker.
    fn await_drain(&self, counters: &RunCounters, pool_size: usize) {
        let remaining = counters.in_flight();
        if remaining == 0 {
            return;
        }
        let timeout =
            Duration::from_secs((SHUTDOWN_SECS_PER_TASK * remaining as u64 / pool_size as u64).max(1));
        info!(
            remaining,
            timeout_secs = timeout.as_secs(),
            "waiting for the worker pool to drain"
        );

        let deadline = Instant::now() + timeout;
        while counters.in_flight() > 0 {
            if Instant::now() >= deadline {
                warn!(
                    in_flight = counters.in_flight(),
                    "worker pool did not drain before the deadline"
                );
                return;
            }
            thread::sleep(Duration::from_millis(20));
        }
    }
}

/// Score one pathway inside a worker thread.
///
/// Duplicates are dropped before scoring; scoring errors and panics are
/// caught here, logged, and counted, so a single bad pathway cannot take
/// a worker or the run down.
fn run_task(
    pathway: &PathwayId,
    dataset: &Dataset,
    catalog: &dyn PathwayCatalog,
    config: &AnalysisConfig,
    results: &ResultsMap,
    counters: &RunCounters,
) {
    if results.contains(pathway) {
        results.note_duplicate();
        return;
    }

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        score_pathway(pathway, dataset, catalog, config, &mut rand::thread_rng())
    }));
    match outcome {
        Ok(Ok(Some(result))) => {
            results.insert_if_absent(result);
        }
        Ok(Ok(None)) => counters.note_skipped(),
        Ok(Err(e)) => {
            error!(pathway = %pathway, error = %e, "scoring failed");
            counters.note_failed();
        }
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "opaque panic payload".to_string());
            error!(pathway = %pathway, panic = %msg, "scoring panicked");
            counters.note_failed();
        }
    }
}
