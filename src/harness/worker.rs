//! Worker thread logic
//!
//! Each worker:
//! - Pulls work items from the shared queue
//! - Runs the runner once for the item and waits for it
//! - Classifies clean output against the oracle
//! - Bisects inconclusive batches back into the queue, or reports the
//!   isolated case

use crate::classify::classify;
use crate::config::HarnessConfig;
use crate::error::WorkerError;
use crate::harness::bisect::{judge, Verdict};
use crate::harness::queue::{PendingGuard, Recv, WorkItem, WorkQueueReceiver, WorkQueueSender};
use crate::oracle::Oracle;
use crate::report::{FailureReport, Reporter, UnknownReport};
use crate::runner::{Invocation, Runner};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// How long an idle worker waits before re-checking for shutdown
const RECV_POLL: Duration = Duration::from_millis(100);

/// Run-wide counters shared by all workers
#[derive(Debug, Default)]
pub struct RunStats {
    /// Runner invocations made
    pub runs: AtomicU64,

    /// Batches split into singletons
    pub bisections: AtomicU64,

    /// Terminal single-case failures
    pub failures: AtomicUsize,

    /// Single cases with an unknown fingerprint
    pub unknown_fingerprints: AtomicU64,

    /// Cases confirmed clean (counted per case, not per batch)
    pub clean_cases: AtomicU64,
}

/// Point-in-time copy of `RunStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub runs: u64,
    pub bisections: u64,
    pub failures: usize,
    pub unknown_fingerprints: u64,
    pub clean_cases: u64,
}

impl RunStats {
    fn record_run(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);
    }

    fn record_bisection(&self) {
        self.bisections.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    fn record_unknown(&self) {
        self.unknown_fingerprints.fetch_add(1, Ordering::Relaxed);
    }

    fn record_clean(&self, cases: usize) {
        self.clean_cases.fetch_add(cases as u64, Ordering::Relaxed);
    }

    /// Terminal failures so far
    pub fn failure_count(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            runs: self.runs.load(Ordering::Relaxed),
            bisections: self.bisections.load(Ordering::Relaxed),
            failures: self.failure_count(),
            unknown_fingerprints: self.unknown_fingerprints.load(Ordering::Relaxed),
            clean_cases: self.clean_cases.load(Ordering::Relaxed),
        }
    }
}

/// Everything a worker needs besides its queue handles. Read-only.
pub struct WorkerContext {
    pub config: Arc<HarnessConfig>,
    pub runner: Arc<dyn Runner>,
    pub oracle: Arc<Oracle>,
    pub reporter: Arc<dyn Reporter>,
    pub stats: Arc<RunStats>,
}

/// A worker thread that processes work items
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(
        id: usize,
        context: Arc<WorkerContext>,
        queue_rx: WorkQueueReceiver,
        queue_tx: WorkQueueSender,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, WorkerError> {
        let handle = thread::Builder::new()
            .name(format!("harness-{}", id))
            .spawn(move || worker_loop(id, context, queue_rx, queue_tx, shutdown))
            .map_err(|e| WorkerError::InitFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| WorkerError::Panicked {
                id: self.id,
                message: "Worker thread panicked".into(),
            })
        } else {
            Ok(())
        }
    }
}

/// Main worker loop
fn worker_loop(
    id: usize,
    context: Arc<WorkerContext>,
    queue_rx: WorkQueueReceiver,
    queue_tx: WorkQueueSender,
    shutdown: Arc<AtomicBool>,
) {
    debug!(worker = id, "Worker starting");
    let mut processed = 0u64;

    while !shutdown.load(Ordering::Relaxed) {
        let item = match queue_rx.recv_timeout(RECV_POLL) {
            Recv::Item(item) => item,
            Recv::Timeout => continue,
            Recv::Disconnected => break,
        };

        // Released only after any bisected children are queued
        let _pending = PendingGuard::new(queue_rx.pending());

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            process_item(id, &item, &context, &queue_tx)
        }));

        if let Err(payload) = result {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(
                worker = id,
                sources = ?item.sources(),
                panic = %message,
                "Panic while processing work item; counting it as a failure"
            );
            context.stats.record_failure();
        }

        processed += 1;
    }

    debug!(worker = id, processed, "Worker shutting down");
}

/// Run one item and act on the verdict
pub fn process_item(
    worker_id: usize,
    item: &WorkItem,
    context: &WorkerContext,
    queue_tx: &WorkQueueSender,
) -> Verdict {
    let config = &context.config;
    let invocation = Invocation::batch(&config.runner, &config.resources, item);

    trace!(worker = worker_id, cases = item.len(), command = %invocation, "Running batch");
    let outcome = context.runner.run(&invocation);
    context.stats.record_run();

    let unknown = classify(&outcome, &context.oracle, config.gating());
    let verdict = judge(item, outcome.failure.as_ref(), unknown);

    match &verdict {
        Verdict::Bisect => {
            context.stats.record_bisection();
            debug!(
                worker = worker_id,
                cases = item.len(),
                failed = !outcome.succeeded(),
                "Inconclusive batch, rerunning cases individually"
            );
            if queue_tx.submit_all(item.split()).is_err() {
                error!(worker = worker_id, "Work queue closed during bisection");
            }
        }
        Verdict::Failed(error) => {
            context.stats.record_failure();
            warn!(worker = worker_id, source = %item.sources()[0], error = %error, "Case failed");
            context.reporter.on_failure(&FailureReport {
                command: invocation.to_string(),
                reason: error.to_string(),
                stderr: outcome.stderr_lines(),
            });
        }
        Verdict::Unknown(fingerprint) => {
            context.stats.record_unknown();
            info!(
                worker = worker_id,
                source = %item.sources()[0],
                fingerprint = %fingerprint,
                "Unknown fingerprint"
            );
            context.reporter.on_unknown_fingerprint(&UnknownReport {
                command: invocation.to_string(),
                fingerprint: fingerprint.clone(),
            });
        }
        Verdict::Clean => {
            context.stats.record_clean(item.len());
            trace!(worker = worker_id, cases = item.len(), "Batch clean");
        }
    }

    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpawnError;
    use crate::harness::queue::{FlagSet, WorkQueue};
    use crate::report::StepLog;
    use crate::runner::RunOutcome;

    fn context(runner: Arc<dyn Runner>, bot: bool, log: Arc<StepLog>) -> WorkerContext {
        let mut config = HarnessConfig::local("fm", 2);
        if bot {
            config.bot = Some(
                crate::job::BotName::parse("Test-Debian10-Clang-GCE-CPU-AVX2-x86_64-Debug-All")
                    .unwrap(),
            );
        }
        WorkerContext {
            config: Arc::new(config),
            runner,
            oracle: Arc::new(["deadbeef"].into_iter().collect()),
            reporter: log,
            stats: Arc::new(RunStats::default()),
        }
    }

    fn item(sources: &[&str]) -> WorkItem {
        WorkItem::new(
            sources.iter().map(|s| s.to_string()).collect(),
            FlagSet::from(vec!["--ct".to_string(), "8888".to_string()]),
        )
        .unwrap()
    }

    fn failing() -> Arc<dyn Runner> {
        Arc::new(|_: &Invocation| {
            RunOutcome::failed(SpawnError::Exit { code: 1 }, Vec::new(), b"crash\n".to_vec())
        })
    }

    #[test]
    fn test_run_stats() {
        let stats = RunStats::default();
        stats.record_run();
        stats.record_bisection();
        stats.record_failure();
        stats.record_unknown();
        stats.record_clean(3);

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                runs: 1,
                bisections: 1,
                failures: 1,
                unknown_fingerprints: 1,
                clean_cases: 3,
            }
        );
    }

    #[test]
    fn test_failed_batch_resubmits_singletons() {
        let log = Arc::new(StepLog::new("-"));
        let ctx = context(failing(), false, log.clone());
        let queue = WorkQueue::new();
        let rx = queue.receiver();

        let verdict = process_item(0, &item(&["a", "b", "c"]), &ctx, &queue.sender());
        assert_eq!(verdict, Verdict::Bisect);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pending().get(), 3);

        let mut resubmitted = Vec::new();
        while let Some(single) = rx.try_recv() {
            assert!(single.is_singleton());
            assert_eq!(&single.flags()[..], ["--ct", "8888"]);
            resubmitted.push(single.sources()[0].clone());
        }
        assert_eq!(resubmitted, ["a", "b", "c"]);
        assert_eq!(ctx.stats.failure_count(), 0);
        assert!(log.steps().is_empty());
    }

    #[test]
    fn test_failed_singleton_is_reported() {
        let log = Arc::new(StepLog::new("-"));
        let ctx = context(failing(), false, log.clone());
        let queue = WorkQueue::new();

        let verdict = process_item(0, &item(&["a"]), &ctx, &queue.sender());
        assert!(verdict.is_failure());
        assert!(queue.is_empty());
        assert_eq!(ctx.stats.failure_count(), 1);

        let steps = log.steps();
        assert_eq!(steps.len(), 1);
        match &steps[0] {
            crate::report::StepRecord::Failure { command, stderr, .. } => {
                assert_eq!(command, "fm -i resources --ct 8888 -s a");
                assert_eq!(stderr, &["crash"]);
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_unknown_fingerprint_only_with_gating() {
        let runner: Arc<dyn Runner> = Arc::new(|invocation: &Invocation| {
            let source = invocation.args().last().cloned().unwrap_or_default();
            RunOutcome::success(format!("ok cafebabe {}\n", source).into_bytes(), Vec::new())
        });

        // Local run: no gating, clean
        let log = Arc::new(StepLog::new("-"));
        let ctx = context(Arc::clone(&runner), false, log.clone());
        let queue = WorkQueue::new();
        assert_eq!(process_item(0, &item(&["a", "b"]), &ctx, &queue.sender()), Verdict::Clean);
        assert_eq!(ctx.stats.snapshot().clean_cases, 2);

        // Bot run: batch bisects, singleton reports without failing
        let log = Arc::new(StepLog::new("-"));
        let ctx = context(runner, true, log.clone());
        assert_eq!(process_item(0, &item(&["a", "b"]), &ctx, &queue.sender()), Verdict::Bisect);
        assert_eq!(
            process_item(0, &item(&["a"]), &ctx, &queue.sender()),
            Verdict::Unknown(crate::classify::Fingerprint::new("cafebabe"))
        );
        assert_eq!(ctx.stats.failure_count(), 0);
        assert_eq!(ctx.stats.snapshot().unknown_fingerprints, 1);
        assert_eq!(log.steps().len(), 1);
    }
}
