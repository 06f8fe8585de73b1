//! Run coordinator - owns the worker pool for one harness run
//!
//! The coordinator is responsible for:
//! - Setting up the work queue and workers
//! - Planning jobs into batches and submitting them
//! - Progress reporting
//! - Waiting for all work (including bisection reruns) to drain
//! - Final statistics and cleanup

use crate::config::HarnessConfig;
use crate::error::{Result, WorkerError};
use crate::harness::queue::{FlagSet, WorkQueue};
use crate::harness::worker::{RunStats, StatsSnapshot, Worker, WorkerContext};
use crate::job::{BatchPlanner, Job};
use crate::oracle::Oracle;
use crate::report::Reporter;
use crate::runner::Runner;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct HarnessResult {
    /// Terminal single-case failures
    pub failures: usize,

    /// Final counters
    pub stats: StatsSnapshot,

    /// Jobs submitted
    pub jobs: usize,

    /// Time from start to drain
    pub duration: Duration,
}

impl HarnessResult {
    /// Did every case pass?
    pub fn passed(&self) -> bool {
        self.failures == 0
    }
}

/// Coordinates the worker pool
pub struct Harness {
    /// Configuration
    config: Arc<HarnessConfig>,

    /// Work queue for batches and bisected singletons
    queue: WorkQueue,

    /// Job planner (one shuffle RNG for the whole run)
    planner: BatchPlanner,

    /// Shared counters
    stats: Arc<RunStats>,

    /// Worker threads
    workers: Vec<Worker>,

    /// Shutdown signal
    shutdown: Arc<AtomicBool>,

    /// Jobs submitted so far
    jobs: usize,

    /// Run start time
    start_time: Instant,
}

impl Harness {
    /// Spawn the worker pool. Workers idle until jobs are kicked off.
    pub fn start(
        config: HarnessConfig,
        runner: Arc<dyn Runner>,
        oracle: Oracle,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let stats = Arc::new(RunStats::default());

        let context = Arc::new(WorkerContext {
            config: Arc::clone(&config),
            runner,
            oracle: Arc::new(oracle),
            reporter,
            stats: Arc::clone(&stats),
        });

        let mut harness = Self {
            planner: BatchPlanner::new(config.worker_count),
            config,
            queue: WorkQueue::new(),
            stats,
            workers: Vec::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            jobs: 0,
            start_time: Instant::now(),
        };

        info!(
            runner = %harness.config.runner.display(),
            workers = harness.config.worker_count,
            gating = harness.config.gating(),
            "Starting harness"
        );

        harness.spawn_workers(context)?;
        Ok(harness)
    }

    /// Spawn worker threads
    fn spawn_workers(&mut self, context: Arc<WorkerContext>) -> Result<()> {
        for id in 0..self.config.worker_count {
            let worker = Worker::spawn(
                id,
                Arc::clone(&context),
                self.queue.receiver(),
                self.queue.sender(),
                Arc::clone(&self.shutdown),
            )?;

            self.workers.push(worker);
        }

        debug!(count = self.workers.len(), "Workers spawned");
        Ok(())
    }

    /// Plan `job` into batches and submit them. Returns the number of batches.
    ///
    /// A job with no sources submits nothing.
    pub fn kickoff(&mut self, job: Job) -> Result<usize> {
        if job.is_empty() {
            debug!(flags = ?job.flags, "Skipping job with no sources");
            return Ok(0);
        }

        let cases = job.sources.len();
        let items = self.planner.plan(job.sources, FlagSet::from(job.flags));
        let batches = items.len();

        self.queue
            .sender()
            .submit_all(items)
            .map_err(|_| WorkerError::QueueClosed)?;
        self.jobs += 1;

        debug!(job = self.jobs, cases, batches, "Job submitted");
        Ok(batches)
    }

    /// Current progress
    pub fn progress(&self) -> HarnessProgress {
        let stats = self.stats.snapshot();
        HarnessProgress {
            pending: self.queue.pending().get(),
            queued: self.queue.len(),
            runs: stats.runs,
            bisections: stats.bisections,
            failures: stats.failures,
            unknown_fingerprints: stats.unknown_fingerprints,
            clean_cases: stats.clean_cases,
            jobs: self.jobs,
            total_workers: self.workers.len(),
            elapsed: self.start_time.elapsed(),
        }
    }

    /// Block until all submitted work has drained, calling `on_tick` with
    /// fresh progress every `tick`
    pub fn wait<F>(&self, tick: Duration, mut on_tick: F)
    where
        F: FnMut(&HarnessProgress),
    {
        let pending = self.queue.pending();
        while !pending.wait_timeout(tick) {
            on_tick(&self.progress());
        }
        on_tick(&self.progress());
    }

    /// Wait for all work to drain, stop the workers and collect the totals
    pub fn finish(mut self) -> Result<HarnessResult> {
        self.queue.pending().wait();

        // Signal shutdown
        self.shutdown.store(true, Ordering::SeqCst);

        // Wait for workers to finish
        self.join_workers();

        let duration = self.start_time.elapsed();
        let stats = self.stats.snapshot();

        info!(
            jobs = self.jobs,
            runs = stats.runs,
            bisections = stats.bisections,
            failures = stats.failures,
            unknown = stats.unknown_fingerprints,
            duration_secs = duration.as_secs(),
            "Run completed"
        );

        Ok(HarnessResult {
            failures: stats.failures,
            stats,
            jobs: self.jobs,
            duration,
        })
    }

    /// Join all worker threads
    fn join_workers(&mut self) {
        let workers = std::mem::take(&mut self.workers);
        for worker in workers {
            let id = worker.id();
            if let Err(e) = worker.join() {
                warn!(worker = id, error = %e, "Worker failed to join cleanly");
            }
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        // Dropped without finish(): stop idle workers instead of leaking them
        if !self.workers.is_empty() {
            self.shutdown.store(true, Ordering::SeqCst);
            self.join_workers();
        }
    }
}

/// Progress information for display
#[derive(Debug, Clone)]
pub struct HarnessProgress {
    /// Items submitted but not finished
    pub pending: usize,

    /// Items waiting in the queue
    pub queued: usize,

    /// Runner invocations so far
    pub runs: u64,

    /// Batches bisected so far
    pub bisections: u64,

    /// Terminal failures so far
    pub failures: usize,

    /// Unknown fingerprints reported so far
    pub unknown_fingerprints: u64,

    /// Cases confirmed clean
    pub clean_cases: u64,

    /// Jobs submitted
    pub jobs: usize,

    /// Total workers
    pub total_workers: usize,

    /// Elapsed time
    pub elapsed: Duration,
}

impl HarnessProgress {
    /// Runner invocations per second
    pub fn runs_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.runs as f64 / secs
        } else {
            0.0
        }
    }
}
